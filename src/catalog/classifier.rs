//! Folder classification
//!
//! A folder holding at least one recognised video file directly is a lesson
//! container (it becomes a module). Anything else, including an empty
//! folder, is a course container and gets descended into.

use crate::graph::DriveItem;
use serde::{Deserialize, Serialize};

/// Classification outcome for a folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FolderKind {
    LessonContainer,
    CourseContainer,
}

/// How MIME types are compared against the allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MimeMatchMode {
    /// Case-insensitive substring match
    #[default]
    Contains,
    /// Exact equality
    Exact,
}

/// Allow-list of video MIME types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMimeTypes {
    types: Vec<String>,
    mode: MimeMatchMode,
}

impl VideoMimeTypes {
    pub fn new(types: Vec<String>, mode: MimeMatchMode) -> Self {
        let types = match mode {
            MimeMatchMode::Contains => types.into_iter().map(|t| t.to_lowercase()).collect(),
            MimeMatchMode::Exact => types,
        };
        Self { types, mode }
    }

    /// The default list of recognised video types
    pub fn default_types() -> Vec<String> {
        [
            "video/mp4",
            "video/webm",
            "video/ogg",
            "video/quicktime",
            "video/x-msvideo",
            "video/x-ms-wmv",
            "video/x-matroska",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    pub fn is_video(&self, mime_type: &str) -> bool {
        if mime_type.is_empty() {
            return false;
        }
        match self.mode {
            MimeMatchMode::Contains => {
                let lower = mime_type.to_lowercase();
                self.types.iter().any(|t| lower.contains(t.as_str()))
            }
            MimeMatchMode::Exact => self.types.iter().any(|t| t == mime_type),
        }
    }

    /// Whether an item is a file with a recognised video type
    pub fn is_video_item(&self, item: &DriveItem) -> bool {
        item.is_file() && self.is_video(item.mime_type())
    }
}

impl Default for VideoMimeTypes {
    fn default() -> Self {
        Self::new(Self::default_types(), MimeMatchMode::default())
    }
}

/// Classify a folder from its direct children
pub fn classify(children: &[DriveItem], videos: &VideoMimeTypes) -> FolderKind {
    if children.iter().any(|child| videos.is_video_item(child)) {
        FolderKind::LessonContainer
    } else {
        FolderKind::CourseContainer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(name: &str, mime: &str) -> DriveItem {
        DriveItem::file(name, name, mime, 1)
    }

    #[test]
    fn test_video_child_makes_lesson_container() {
        let children = vec![
            DriveItem::file("n", "nota.txt", "text/plain", 5),
            video("a.mp4", "video/mp4"),
        ];
        assert_eq!(
            classify(&children, &VideoMimeTypes::default()),
            FolderKind::LessonContainer
        );
    }

    #[test]
    fn test_only_subfolders_is_course_container() {
        let children = vec![DriveItem::folder("m1", "Modulo 1"), DriveItem::folder("m2", "Modulo 2")];
        assert_eq!(
            classify(&children, &VideoMimeTypes::default()),
            FolderKind::CourseContainer
        );
    }

    #[test]
    fn test_empty_folder_is_course_container() {
        assert_eq!(
            classify(&[], &VideoMimeTypes::default()),
            FolderKind::CourseContainer
        );
    }

    #[test]
    fn test_every_default_type_is_recognised() {
        let videos = VideoMimeTypes::default();
        for mime in VideoMimeTypes::default_types() {
            assert_eq!(
                classify(&[video("x", &mime)], &videos),
                FolderKind::LessonContainer,
                "{} should be a video",
                mime
            );
        }
    }

    #[test]
    fn test_non_video_files_are_ignored() {
        let videos = VideoMimeTypes::default();
        for mime in ["audio/mpeg", "application/pdf", "image/png", ""] {
            assert_eq!(classify(&[video("x", mime)], &videos), FolderKind::CourseContainer);
        }
    }

    #[test]
    fn test_contains_mode_is_case_insensitive_and_tolerates_parameters() {
        let videos = VideoMimeTypes::default();
        assert!(videos.is_video("VIDEO/MP4"));
        assert!(videos.is_video("video/mp4; codecs=avc1"));
    }

    #[test]
    fn test_exact_mode() {
        let videos = VideoMimeTypes::new(vec!["video/mp4".to_string()], MimeMatchMode::Exact);
        assert!(videos.is_video("video/mp4"));
        assert!(!videos.is_video("VIDEO/MP4"));
        assert!(!videos.is_video("video/webm"));
    }

    #[test]
    fn test_folder_named_like_video_is_not_video() {
        let videos = VideoMimeTypes::default();
        let folder = DriveItem::folder("f", "aula.mp4");
        assert!(!videos.is_video_item(&folder));
    }
}
