//! Catalog emitters
//!
//! Pure transforms from the course model into a text report, a SQL import
//! batch and a JSON document.

pub mod format;
pub mod json;
pub mod report;
pub mod sql;

pub use format::{escape_sql, format_bytes, format_duration};
pub use json::generate_json;
pub use report::generate_report;
pub use sql::{generate_sql, SqlGenerator, SqlLinking};
