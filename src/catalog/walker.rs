//! Recursive tree walker
//!
//! Descends the remote tree depth-first, one request at a time, turning
//! lesson-container folders into modules and grouping them under the course
//! named by the first segment of the traversal path.

use super::classifier::{classify, FolderKind, VideoMimeTypes};
use super::{strip_extension, Course, Lesson, Module};
use crate::error::GraphError;
use crate::graph::{DriveItem, RemoteTree};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Counters collected during a walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WalkStats {
    pub folders_listed: usize,
    pub modules_found: usize,
    pub lessons_found: usize,
    pub skipped_root_videos: usize,
    pub errors: usize,
}

pub struct TreeWalker<'r> {
    remote: &'r dyn RemoteTree,
    videos: VideoMimeTypes,
    merge_duplicate_courses: bool,
    stats: WalkStats,
}

type WalkFuture<'s> = Pin<Box<dyn Future<Output = Vec<Course>> + Send + 's>>;

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

fn first_segment(path: &str) -> Option<&str> {
    path.split('/').next().filter(|s| !s.is_empty())
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}

impl<'r> TreeWalker<'r> {
    pub fn new(remote: &'r dyn RemoteTree, videos: VideoMimeTypes) -> Self {
        Self {
            remote,
            videos,
            merge_duplicate_courses: false,
            stats: WalkStats::default(),
        }
    }

    /// Fold same-named courses returned by sibling subtrees into one
    pub fn merge_duplicate_courses(mut self, merge: bool) -> Self {
        self.merge_duplicate_courses = merge;
        self
    }

    pub fn stats(&self) -> WalkStats {
        self.stats
    }

    /// Walk the tree below `folder_id`; `path_prefix` is the path of that folder
    pub async fn walk(&mut self, folder_id: &str, path_prefix: &str) -> Vec<Course> {
        let start_time = Instant::now();
        self.stats = WalkStats::default();

        let mut courses = self
            .walk_folder(folder_id.to_string(), path_prefix.to_string())
            .await;
        courses.retain(|course| !course.is_empty());

        info!(
            "🏁 Walk finished in {:.2}s: {} courses, {} modules, {} lessons, {} errors",
            start_time.elapsed().as_secs_f64(),
            courses.len(),
            self.stats.modules_found,
            self.stats.lessons_found,
            self.stats.errors
        );

        courses
    }

    fn walk_folder<'s>(&'s mut self, folder_id: String, current_path: String) -> WalkFuture<'s> {
        Box::pin(async move {
            let mut courses: Vec<Course> = Vec::new();
            info!("📁 Analyzing: {}", display_path(&current_path));

            let items = match self.remote.list_children(&folder_id).await {
                Ok(items) => items,
                Err(e) => {
                    self.record_error(&current_path, &e);
                    return courses;
                }
            };
            self.stats.folders_listed += 1;

            for item in items {
                let item_path = join_path(&current_path, &item.name);

                if item.is_folder() {
                    let sub_items = match self.remote.list_children(&item.id).await {
                        Ok(sub_items) => sub_items,
                        Err(e) => {
                            // Abandon the rest of this folder, keep what we have
                            self.record_error(&item_path, &e);
                            return courses;
                        }
                    };
                    self.stats.folders_listed += 1;

                    match classify(&sub_items, &self.videos) {
                        FolderKind::LessonContainer => {
                            self.collect_module(&item, &item_path, &current_path, &sub_items, &mut courses);
                        }
                        FolderKind::CourseContainer => {
                            info!("📚 Course folder: {}", item.name);
                            let sub_courses = self.walk_folder(item.id.clone(), item_path).await;
                            self.append_courses(&mut courses, sub_courses);
                        }
                    }
                } else if self.videos.is_video_item(&item) {
                    self.stats.skipped_root_videos += 1;
                    warn!("🎥 Video outside any module, skipped: {}", item_path);
                } else {
                    debug!("Ignoring non-video item: {}", item_path);
                }
            }

            courses
        })
    }

    /// Turn a lesson-container folder into a module and file it under its course
    fn collect_module(
        &mut self,
        folder: &DriveItem,
        folder_path: &str,
        current_path: &str,
        children: &[DriveItem],
        courses: &mut Vec<Course>,
    ) {
        let course_name = first_segment(current_path)
            .unwrap_or(folder.name.as_str())
            .to_string();
        let course_path = first_segment(current_path).unwrap_or(folder_path);

        info!("📦 Module found: {} (course: {})", folder.name, course_name);

        let mut module = Module::new(folder.name.as_str(), course_name.as_str(), folder_path);
        for child in children.iter().filter(|c| self.videos.is_video_item(c)) {
            let lesson = Lesson::new(
                strip_extension(&child.name),
                child.web_url.as_str(),
                child.size,
                child.mime_type(),
                join_path(folder_path, &child.name),
            )
            .with_duration(child.duration());

            debug!("🎬 Lesson: {}", child.name);
            module.lessons.push(lesson);
        }

        let index = match courses.iter().position(|c| c.name == course_name) {
            Some(index) => index,
            None => {
                courses.push(Course::new(course_name.as_str(), course_path).with_origin(current_path));
                courses.len() - 1
            }
        };

        let lesson_count = module.lessons.len();
        if courses[index].add_module(module) {
            self.stats.modules_found += 1;
            self.stats.lessons_found += lesson_count;
        }
    }

    fn append_courses(&self, courses: &mut Vec<Course>, sub_courses: Vec<Course>) {
        if !self.merge_duplicate_courses {
            courses.extend(sub_courses);
            return;
        }

        for sub_course in sub_courses {
            match courses.iter_mut().find(|c| c.name == sub_course.name) {
                Some(existing) => {
                    debug!("Merging duplicate course: {}", sub_course.name);
                    existing.absorb(sub_course);
                }
                None => courses.push(sub_course),
            }
        }
    }

    fn record_error(&mut self, path: &str, e: &GraphError) {
        self.stats.errors += 1;
        error!("❌ Failed to analyze {}: {}", display_path(path), e);
    }
}
