//! Hand-authored course structures
//!
//! Lets the SQL batch be generated without touching the remote store. The
//! structure file is TOML or JSON; JSON files may use the camelCase keys of
//! the older import scripts (`courseName`, `videoUrl`, `durationMinutes`).

use crate::catalog::{Course, Lesson, Module};
use crate::error::ManualError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ManualStructure {
    #[serde(default)]
    pub courses: Vec<ManualCourse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManualCourse {
    #[serde(alias = "courseName")]
    pub course_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub instructor: Option<String>,
    #[serde(default)]
    pub modules: Vec<ManualModule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManualModule {
    #[serde(alias = "moduleName")]
    pub module_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub lessons: Vec<ManualLesson>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManualLesson {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(alias = "videoUrl")]
    pub video_url: String,
    #[serde(default, alias = "durationMinutes")]
    pub duration_minutes: Option<u32>,
}

impl ManualStructure {
    /// Parse a structure from TOML or JSON text
    pub fn parse(content: &str, format: &str) -> Result<Self, ManualError> {
        let structure: Self = match format.to_ascii_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            other => return Err(ManualError::UnsupportedFormat(other.to_string())),
        };
        structure.validate()?;
        Ok(structure)
    }

    /// Load a structure file, the format follows the file extension
    pub async fn load(path: &Path) -> Result<Self, ManualError> {
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_string();
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content, &format)
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    pub fn validate(&self) -> Result<(), ManualError> {
        for course in &self.courses {
            if course.course_name.trim().is_empty() {
                return Err(ManualError::Invalid("course without a name".to_string()));
            }
            for module in &course.modules {
                if module.module_name.trim().is_empty() {
                    return Err(ManualError::Invalid(format!(
                        "module without a name in course {}",
                        course.course_name
                    )));
                }
                for lesson in &module.lessons {
                    if lesson.title.trim().is_empty() || lesson.video_url.trim().is_empty() {
                        return Err(ManualError::Invalid(format!(
                            "lesson without title or video URL in {}/{}",
                            course.course_name, module.module_name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Convert into the catalog model used by the emitters
    pub fn to_courses(&self) -> Vec<Course> {
        let mut courses = Vec::with_capacity(self.courses.len());

        for (i, manual_course) in self.courses.iter().enumerate() {
            let name = manual_course.course_name.as_str();
            let origin = format!("manual/{}", i + 1);
            let mut course = Course::new(name, name).with_origin(&origin);
            course.description = manual_course.description.clone();
            course.category = manual_course.category.clone();
            course.instructor = manual_course.instructor.clone();

            for (j, manual_module) in manual_course.modules.iter().enumerate() {
                let module_path =
                    format!("{}/{}/{:02}-{}", origin, name, j + 1, manual_module.module_name);
                let mut module = Module::new(manual_module.module_name.as_str(), name, module_path.as_str());
                module.description = manual_module.description.clone();

                for (k, manual_lesson) in manual_module.lessons.iter().enumerate() {
                    let lesson = Lesson::new(
                        manual_lesson.title.as_str(),
                        manual_lesson.video_url.as_str(),
                        0,
                        "",
                        format!("{}/{:03}-{}", module_path, k + 1, manual_lesson.title),
                    )
                    .with_duration(manual_lesson.duration_minutes.map(|m| f64::from(m) * 60.0))
                    .with_description(manual_lesson.description.clone());
                    module.lessons.push(lesson);
                }

                if !course.add_module(module) {
                    warn!("Module without lessons dropped: {}/{}", name, manual_module.module_name);
                }
            }

            if course.is_empty() {
                warn!("Course without lessons dropped: {}", name);
            } else {
                courses.push(course);
            }
        }

        courses
    }
}
