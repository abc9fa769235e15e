//! Course catalog model
//!
//! Courses own modules, modules own lessons. The whole graph is built in one
//! traversal (or from a hand-authored structure) and handed to an emitter.

pub mod classifier;
pub mod walker;

pub use classifier::{classify, FolderKind, MimeMatchMode, VideoMimeTypes};
pub use walker::{TreeWalker, WalkStats};

use serde::{Deserialize, Serialize};
use uuid::{Builder, Uuid};

/// Stable identifier for an entity of the given kind at the given path
///
/// The same path always yields the same id, so re-importing an unchanged
/// tree produces the same rows.
pub fn entity_id(kind: &str, path: &str) -> Uuid {
    let digest = md5::compute(format!("{}:{}", kind, path));
    Builder::from_md5_bytes(digest.0).into_uuid()
}

/// Strip the trailing extension from a file name (last dot wins)
pub fn strip_extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    }
}

/// A single video lesson
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub size: u64,
    /// Duration in seconds, when the store reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub mime_type: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Lesson {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        size: u64,
        mime_type: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        let path = path.into();
        Self {
            id: entity_id("lesson", &path),
            title: title.into(),
            url: url.into(),
            size,
            duration: None,
            mime_type: mime_type.into(),
            path,
            description: None,
        }
    }

    pub fn with_duration(mut self, seconds: Option<f64>) -> Self {
        self.duration = seconds;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Duration rounded to whole minutes, 0 when unknown
    pub fn duration_minutes(&self) -> u64 {
        self.duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| (d / 60.0).round() as u64)
            .unwrap_or(0)
    }
}

/// A folder of lessons
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: Uuid,
    pub name: String,
    /// Owning course name, denormalized
    pub course_name: String,
    pub path: String,
    pub lessons: Vec<Lesson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Module {
    pub fn new(
        name: impl Into<String>,
        course_name: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        let path = path.into();
        Self {
            id: entity_id("module", &path),
            name: name.into(),
            course_name: course_name.into(),
            path,
            lessons: Vec::new(),
            description: None,
        }
    }

    pub fn total_size(&self) -> u64 {
        self.lessons.iter().map(|l| l.size).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }
}

/// A course with running totals
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    pub name: String,
    pub path: String,
    pub modules: Vec<Module>,
    pub total_lessons: usize,
    pub total_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor: Option<String>,
}

impl Course {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        let name = name.into();
        let path = path.into();
        Self {
            id: entity_id("course", &format!("{}|{}", path, name)),
            name,
            path,
            modules: Vec::new(),
            total_lessons: 0,
            total_size: 0,
            description: None,
            category: None,
            instructor: None,
        }
    }

    /// Re-key the id on the traversal path that produced this course.
    ///
    /// Sibling subtrees can each produce a course with the same name and
    /// path; the origin keeps their ids apart.
    pub fn with_origin(mut self, origin: &str) -> Self {
        self.id = entity_id("course", &format!("{}|{}", origin, self.name));
        self
    }

    /// Attach a module, keeping totals in step. Empty modules are dropped.
    ///
    /// Returns whether the module was kept.
    pub fn add_module(&mut self, module: Module) -> bool {
        if module.is_empty() {
            return false;
        }
        self.total_lessons += module.lessons.len();
        self.total_size += module.total_size();
        self.modules.push(module);
        true
    }

    /// Fold another course's modules into this one
    pub fn absorb(&mut self, other: Course) {
        for module in other.modules {
            self.add_module(module);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Totals match the sums over contained lessons
    pub fn totals_consistent(&self) -> bool {
        let lessons: usize = self.modules.iter().map(|m| m.lessons.len()).sum();
        let size: u64 = self.modules.iter().map(Module::total_size).sum();
        lessons == self.total_lessons && size == self.total_size
    }

    /// Sum of lesson durations in seconds, `None` unless every lesson has one
    pub fn total_duration(&self) -> Option<f64> {
        let mut lessons = self.modules.iter().flat_map(|m| m.lessons.iter()).peekable();
        lessons.peek()?;
        lessons.map(|l| l.duration).sum()
    }
}

/// Aggregate counts over a catalog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogTotals {
    pub total_courses: usize,
    pub total_modules: usize,
    pub total_lessons: usize,
    pub total_size: u64,
}

impl CatalogTotals {
    pub fn of(courses: &[Course]) -> Self {
        Self {
            total_courses: courses.len(),
            total_modules: courses.iter().map(|c| c.modules.len()).sum(),
            total_lessons: courses.iter().map(|c| c.total_lessons).sum(),
            total_size: courses.iter().map(|c| c.total_size).sum(),
        }
    }
}
