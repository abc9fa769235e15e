//! Structured JSON dump of the catalog

use crate::catalog::{CatalogTotals, Course};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMetadata<'a> {
    pub generated_at: DateTime<Utc>,
    pub source: &'a str,
    #[serde(flatten)]
    pub totals: CatalogTotals,
}

#[derive(Debug, Serialize)]
pub struct CatalogDocument<'a> {
    pub metadata: CatalogMetadata<'a>,
    pub courses: &'a [Course],
}

impl<'a> CatalogDocument<'a> {
    pub fn new(courses: &'a [Course], source: &'a str, generated_at: DateTime<Utc>) -> Self {
        Self {
            metadata: CatalogMetadata {
                generated_at,
                source,
                totals: CatalogTotals::of(courses),
            },
            courses,
        }
    }
}

/// Pretty-printed document with a metadata header
pub fn generate_json(
    courses: &[Course],
    source: &str,
    generated_at: DateTime<Utc>,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&CatalogDocument::new(courses, source, generated_at))
}
