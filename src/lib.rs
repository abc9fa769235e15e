/// Course Catalog Importer
/// 
/// Walks a course tree stored in OneDrive/SharePoint, classifies folders into
/// courses, modules and lessons, and emits a text report, a SQL import batch
/// and a JSON dump. Also grants anonymous view links on the whole tree and
/// renders hand-authored course structures into the same SQL.

pub mod config;
pub mod error;
pub mod share_url;
pub mod graph;
pub mod catalog;
pub mod permissions;
pub mod emit;
pub mod manual;
pub mod commands;

// Re-export main types for easy access
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{GraphError, ManualError, ShareUrlError};
pub use crate::share_url::extract_folder_id;
pub use crate::graph::{DriveItem, GraphClient, MemoryTree, RemoteTree, StaticToken, TokenProvider};
pub use crate::catalog::{classify, Course, FolderKind, Lesson, Module, TreeWalker, VideoMimeTypes};
pub use crate::permissions::{PermissionSetter, PermissionSummary};
pub use crate::emit::{generate_json, generate_report, generate_sql, SqlLinking};
pub use crate::manual::ManualStructure;
