//! Anonymous view link setter
//!
//! Walks the tree depth-first and creates a sharing link on every folder and
//! file. Calls are strictly sequential with a fixed pause after each file.

use crate::config::PermissionConfig;
use crate::graph::{LinkRequest, RemoteTree};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{error, info};

/// Counts reported after a permission run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSummary {
    pub folders_processed: usize,
    pub files_processed: usize,
    pub errors: usize,
}

impl PermissionSummary {
    fn add(&mut self, other: PermissionSummary) {
        self.folders_processed += other.folders_processed;
        self.files_processed += other.files_processed;
        self.errors += other.errors;
    }
}

pub struct PermissionSetter<'r> {
    remote: &'r dyn RemoteTree,
    request: LinkRequest,
    file_delay: Duration,
}

type SummaryFuture<'s> = Pin<Box<dyn Future<Output = PermissionSummary> + Send + 's>>;

impl<'r> PermissionSetter<'r> {
    pub fn new(remote: &'r dyn RemoteTree, request: LinkRequest, file_delay: Duration) -> Self {
        Self {
            remote,
            request,
            file_delay,
        }
    }

    pub fn from_config(remote: &'r dyn RemoteTree, config: &PermissionConfig) -> Self {
        Self::new(
            remote,
            LinkRequest {
                link_type: config.link_type.clone(),
                scope: config.scope.clone(),
            },
            Duration::from_millis(config.delay_ms),
        )
    }

    /// Link `folder_id` and everything below it
    pub async fn apply_public_access(&self, folder_id: &str, path_prefix: &str) -> PermissionSummary {
        let summary = self
            .process_folder(folder_id.to_string(), path_prefix.to_string())
            .await;

        info!(
            "📊 Permissions applied: {} folders, {} files, {} errors",
            summary.folders_processed, summary.files_processed, summary.errors
        );
        summary
    }

    /// Returns whether the link was created
    async fn set_link(&self, item_id: &str, label: &str) -> bool {
        match self.remote.create_view_link(item_id, &self.request).await {
            Ok(_) => {
                info!("✅ Link configured: {}", label);
                true
            }
            Err(e) => {
                error!("❌ Failed to configure {}: {}", label, e);
                false
            }
        }
    }

    fn process_folder<'s>(&'s self, folder_id: String, folder_path: String) -> SummaryFuture<'s> {
        Box::pin(async move {
            let mut summary = PermissionSummary::default();
            let label = if folder_path.is_empty() { "<root>" } else { folder_path.as_str() };
            info!("📁 Processing folder: {}", label);

            let folder = match self.remote.get_item(&folder_id).await {
                Ok(folder) => folder,
                Err(e) => {
                    error!("❌ Failed to process folder {}: {}", label, e);
                    summary.errors += 1;
                    return summary;
                }
            };

            if !self.set_link(&folder_id, &folder.name).await {
                summary.errors += 1;
            }

            let items = match self.remote.list_children(&folder_id).await {
                Ok(items) => items,
                Err(e) => {
                    error!("❌ Failed to process folder {}: {}", label, e);
                    summary.errors += 1;
                    return summary;
                }
            };

            for item in items {
                let item_path = format!("{}/{}", folder_path, item.name);

                if item.is_folder() {
                    summary.folders_processed += 1;
                    let nested = self.process_folder(item.id.clone(), item_path).await;
                    summary.add(nested);
                } else if item.is_file() {
                    summary.files_processed += 1;
                    if !self.set_link(&item.id, &item_path).await {
                        summary.errors += 1;
                    }
                    if !self.file_delay.is_zero() {
                        tokio::time::sleep(self.file_delay).await;
                    }
                }
            }

            summary
        })
    }
}
