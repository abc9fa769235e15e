//! Share link parsing
//!
//! SharePoint personal share links carry the folder id as the path segment
//! that follows the owner segment:
//! `https://<tenant>.sharepoint.com/:f:/g/personal/<owner>/<FOLDER_ID>?e=...`

use crate::error::ShareUrlError;
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

fn folder_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"/personal/[^/]+/([^?/]+)").expect("folder id pattern is valid")
    })
}

/// Extract the folder id from a SharePoint/OneDrive share link
pub fn extract_folder_id(share_url: &str) -> Result<String, ShareUrlError> {
    let parsed = Url::parse(share_url.trim())
        .map_err(|_| ShareUrlError::InvalidUrl(share_url.to_string()))?;

    folder_id_pattern()
        .captures(parsed.path())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ShareUrlError::MissingFolderId(share_url.to_string()))
}
