//! In-memory remote tree
//!
//! Serves a drive hierarchy held in memory. Snapshots use the nested form
//! `{ "id": ..., "name": ..., "folder": {}, "children": [ ... ] }` with the
//! same field names the Graph API returns.

use super::{DriveItem, FolderFacet, LinkRequest, RemoteTree, SharingLink};
use crate::error::GraphError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Nested snapshot node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotNode {
    #[serde(flatten)]
    pub item: DriveItem,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SnapshotNode>,
}

#[derive(Debug, Default)]
pub struct MemoryTree {
    root_id: String,
    items: HashMap<String, DriveItem>,
    children: HashMap<String, Vec<String>>,
    failing_items: HashSet<String>,
    failing_links: HashSet<String>,
    created_links: Mutex<Vec<String>>,
    listing_calls: AtomicUsize,
}

impl MemoryTree {
    /// Create a tree holding only the given root folder
    pub fn new(root: DriveItem) -> Self {
        let root_id = root.id.clone();
        let mut items = HashMap::new();
        items.insert(root_id.clone(), root);

        Self {
            root_id,
            items,
            ..Self::default()
        }
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    /// Attach an item under an existing parent, preserving insertion order
    pub fn add_child(&mut self, parent_id: &str, item: DriveItem) -> &mut Self {
        self.children
            .entry(parent_id.to_string())
            .or_default()
            .push(item.id.clone());
        self.items.insert(item.id.clone(), item);
        self
    }

    /// Make listing and metadata calls for an item fail
    pub fn fail_item(&mut self, item_id: &str) -> &mut Self {
        self.failing_items.insert(item_id.to_string());
        self
    }

    /// Make link creation for an item fail
    pub fn fail_link(&mut self, item_id: &str) -> &mut Self {
        self.failing_links.insert(item_id.to_string());
        self
    }

    /// Ids that received a sharing link, in call order
    pub fn created_links(&self) -> Vec<String> {
        self.created_links
            .lock()
            .map(|links| links.clone())
            .unwrap_or_default()
    }

    pub fn listing_calls(&self) -> usize {
        self.listing_calls.load(Ordering::Relaxed)
    }

    /// Build a tree from a nested snapshot
    pub fn from_snapshot(root: SnapshotNode) -> Self {
        let mut root_item = root.item;
        if root_item.folder.is_none() {
            root_item.folder = Some(FolderFacet::default());
        }
        let root_id = root_item.id.clone();
        let mut tree = Self::new(root_item);
        tree.insert_nodes(&root_id, root.children);
        tree
    }

    fn insert_nodes(&mut self, parent_id: &str, nodes: Vec<SnapshotNode>) {
        for node in nodes {
            let mut item = node.item;
            if !node.children.is_empty() && item.folder.is_none() {
                item.folder = Some(FolderFacet::default());
            }
            if let Some(folder) = item.folder.as_mut() {
                folder.child_count = node.children.len() as u64;
            }
            let id = item.id.clone();
            self.add_child(parent_id, item);
            self.insert_nodes(&id, node.children);
        }
    }

    /// Load a JSON snapshot from disk
    pub async fn load_snapshot(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        let root: SnapshotNode = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
        Ok(Self::from_snapshot(root))
    }

    fn check_available(&self, item_id: &str) -> Result<&DriveItem, GraphError> {
        if self.failing_items.contains(item_id) {
            return Err(GraphError::Status {
                status: 503,
                body: format!("simulated failure for {}", item_id),
            });
        }
        self.items
            .get(item_id)
            .ok_or_else(|| GraphError::NotFound(item_id.to_string()))
    }
}

#[async_trait]
impl RemoteTree for MemoryTree {
    async fn list_children(&self, item_id: &str) -> Result<Vec<DriveItem>, GraphError> {
        self.listing_calls.fetch_add(1, Ordering::Relaxed);
        self.check_available(item_id)?;

        Ok(self
            .children
            .get(item_id)
            .map(|ids| ids.iter().filter_map(|id| self.items.get(id)).cloned().collect())
            .unwrap_or_default())
    }

    async fn get_item(&self, item_id: &str) -> Result<DriveItem, GraphError> {
        self.check_available(item_id).cloned()
    }

    async fn create_view_link(
        &self,
        item_id: &str,
        request: &LinkRequest,
    ) -> Result<SharingLink, GraphError> {
        if self.failing_links.contains(item_id) {
            return Err(GraphError::Status {
                status: 403,
                body: format!("sharing disabled for {}", item_id),
            });
        }
        let item = self.check_available(item_id)?;

        if let Ok(mut links) = self.created_links.lock() {
            links.push(item_id.to_string());
        }

        Ok(SharingLink {
            web_url: format!("{}?share={}", item.web_url, request.scope),
            link_type: request.link_type.clone(),
            scope: request.scope.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_snapshot_round_trip_listing() {
        let json = r#"{
            "id": "root", "name": "Root",
            "children": [
                { "id": "c1", "name": "CursoA", "children": [
                    { "id": "m1", "name": "Modulo1", "folder": {} }
                ] },
                { "id": "f1", "name": "readme.txt", "size": 3, "file": { "mimeType": "text/plain" } }
            ]
        }"#;
        let root: SnapshotNode = serde_json::from_str(json).unwrap();
        let tree = MemoryTree::from_snapshot(root);

        let children = tree.list_children("root").await.unwrap();
        assert_eq!(children.len(), 2);
        assert!(children[0].is_folder());
        assert_eq!(children[0].folder.as_ref().unwrap().child_count, 1);
        assert!(children[1].is_file());

        let module_children = tree.list_children("m1").await.unwrap();
        assert!(module_children.is_empty());
        assert_eq!(tree.listing_calls(), 2);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let mut tree = MemoryTree::new(DriveItem::folder("root", "Root"));
        tree.add_child("root", DriveItem::folder("x", "Broken"));
        tree.fail_item("x").fail_link("root");

        assert!(tree.list_children("x").await.is_err());
        assert!(tree
            .create_view_link("root", &LinkRequest::anonymous_view())
            .await
            .is_err());
        assert!(matches!(
            tree.get_item("missing").await,
            Err(GraphError::NotFound(_))
        ));
        assert!(tree.created_links().is_empty());
    }
}
