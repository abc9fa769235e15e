//! Remote file store access
//!
//! The tree walker and the permission setter only see the `RemoteTree` trait.
//! `client::GraphClient` talks to Microsoft Graph; `memory::MemoryTree` serves
//! a tree held in memory for tests and offline snapshot runs.

pub mod client;
pub mod memory;

use crate::error::GraphError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use client::GraphClient;
pub use memory::MemoryTree;

/// Folder facet of a drive item
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FolderFacet {
    #[serde(default)]
    pub child_count: u64,
}

/// File facet of a drive item
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileFacet {
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Video facet of a drive item
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VideoFacet {
    /// Duration in milliseconds, as the drive API reports it
    #[serde(default)]
    pub duration: Option<f64>,
}

impl VideoFacet {
    pub fn seconds(&self) -> Option<f64> {
        self.duration.map(|ms| ms / 1000.0)
    }
}

/// A file or folder as returned by the drive API
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub web_url: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<FolderFacet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileFacet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoFacet>,
}

impl DriveItem {
    /// Create a folder item
    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            folder: Some(FolderFacet::default()),
            ..Self::default()
        }
    }

    /// Create a file item with the given MIME type and size
    pub fn file(
        id: impl Into<String>,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        size: u64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            size,
            file: Some(FileFacet {
                mime_type: Some(mime_type.into()),
            }),
            ..Self::default()
        }
    }

    pub fn with_web_url(mut self, url: impl Into<String>) -> Self {
        self.web_url = url.into();
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.video = Some(VideoFacet {
            duration: Some(seconds * 1000.0),
        });
        self
    }

    pub fn is_folder(&self) -> bool {
        self.folder.is_some()
    }

    pub fn is_file(&self) -> bool {
        self.file.is_some()
    }

    /// MIME type of a file item, empty when absent
    pub fn mime_type(&self) -> &str {
        self.file
            .as_ref()
            .and_then(|f| f.mime_type.as_deref())
            .unwrap_or("")
    }

    /// Video duration in seconds
    pub fn duration(&self) -> Option<f64> {
        self.video.as_ref().and_then(VideoFacet::seconds)
    }
}

/// Sharing link request body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkRequest {
    /// Link type, `view` for read-only
    #[serde(rename = "type")]
    pub link_type: String,
    /// Link scope, `anonymous` for anyone holding the link
    pub scope: String,
}

impl LinkRequest {
    pub fn anonymous_view() -> Self {
        Self {
            link_type: "view".to_string(),
            scope: "anonymous".to_string(),
        }
    }
}

impl Default for LinkRequest {
    fn default() -> Self {
        Self::anonymous_view()
    }
}

/// Sharing link returned after a link is created
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SharingLink {
    #[serde(default)]
    pub web_url: String,
    #[serde(default, rename = "type")]
    pub link_type: String,
    #[serde(default)]
    pub scope: String,
}

/// Hierarchical remote file store
#[async_trait]
pub trait RemoteTree: Send + Sync {
    /// List the direct children of an item
    async fn list_children(&self, item_id: &str) -> Result<Vec<DriveItem>, GraphError>;

    /// Fetch the metadata of a single item
    async fn get_item(&self, item_id: &str) -> Result<DriveItem, GraphError>;

    /// Create a sharing link on an item
    async fn create_view_link(
        &self,
        item_id: &str,
        request: &LinkRequest,
    ) -> Result<SharingLink, GraphError>;
}

/// Source of bearer tokens for the remote API
///
/// Token acquisition lives outside this crate; callers hand in whatever
/// provider their environment offers.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, GraphError>;
}

/// Token provider returning a fixed token
#[derive(Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Read the token from `GRAPH_ACCESS_TOKEN`
    pub fn from_env() -> Result<Self, GraphError> {
        std::env::var("GRAPH_ACCESS_TOKEN")
            .map(Self::new)
            .map_err(|_| GraphError::Token("GRAPH_ACCESS_TOKEN is not set".to_string()))
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticToken").field("token", &"<redacted>").finish()
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, GraphError> {
        if self.token.trim().is_empty() {
            return Err(GraphError::Token("empty access token".to_string()));
        }
        Ok(self.token.clone())
    }
}
