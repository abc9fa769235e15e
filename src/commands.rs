//! Command orchestration
//!
//! Wires configuration, the remote tree and the emitters together for the
//! CLI entry points. Each command takes an explicit `RemoteTree` variant so
//! it can run against the live API or an offline snapshot.

use crate::catalog::{CatalogTotals, Course, TreeWalker, WalkStats};
use crate::config::{Config, SqlConfig};
use crate::emit::{format_bytes, generate_json, generate_report, generate_sql};
use crate::graph::{GraphClient, MemoryTree, RemoteTree, StaticToken};
use crate::manual::ManualStructure;
use crate::permissions::{PermissionSetter, PermissionSummary};
use crate::share_url::extract_folder_id;
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Remote tree plus the id of the folder to start from
pub struct Source {
    pub remote: Box<dyn RemoteTree>,
    pub root_id: String,
}

impl Source {
    /// Offline source backed by a JSON snapshot, rooted at the snapshot root
    pub async fn snapshot(path: &Path) -> Result<Self> {
        let tree = MemoryTree::load_snapshot(path).await?;
        let root_id = tree.root_id().to_string();
        info!("🗂️  Using snapshot {} (root {})", path.display(), root_id);
        Ok(Self {
            remote: Box::new(tree),
            root_id,
        })
    }

    /// Live source backed by the Graph API
    pub fn remote(config: &Config) -> Result<Self> {
        let root_id = resolve_folder_id(config)?;
        let token = match &config.graph.access_token {
            Some(token) => StaticToken::new(token.clone()),
            None => StaticToken::from_env()?,
        };
        let client = GraphClient::new(config.graph.clone(), Arc::new(token))
            .context("Failed to build Graph client")?;
        info!("🌐 Using Graph API at {}", config.graph.base_url);
        Ok(Self {
            remote: Box::new(client),
            root_id,
        })
    }

    /// Snapshot when a path is given, otherwise the live API
    pub async fn open(config: &Config, snapshot: Option<&Path>) -> Result<Self> {
        match snapshot {
            Some(path) => Self::snapshot(path).await,
            None => Self::remote(config),
        }
    }
}

/// Root folder id from `source.folder_id` or the share link
pub fn resolve_folder_id(config: &Config) -> Result<String> {
    if let Some(id) = config.source.folder_id.as_deref().filter(|id| !id.trim().is_empty()) {
        return Ok(id.to_string());
    }

    let share_url = config
        .source
        .share_url
        .as_deref()
        .ok_or_else(|| anyhow!("No source folder: set source.share_url, source.folder_id or --share-url"))?;

    let folder_id = extract_folder_id(share_url)
        .with_context(|| format!("Cannot use share link {}", share_url))?;
    info!("🔗 Folder id extracted from share link: {}", folder_id);
    Ok(folder_id)
}

/// Files written by an analysis run
#[derive(Debug, Clone)]
pub struct AnalyzeOutcome {
    pub courses: Vec<Course>,
    pub stats: WalkStats,
    pub totals: CatalogTotals,
    pub report_path: PathBuf,
    pub sql_path: PathBuf,
    pub json_path: PathBuf,
}

/// Walk the tree and write the report, SQL batch and JSON dump
pub async fn analyze(config: &Config, source: &Source) -> Result<AnalyzeOutcome> {
    analyze_at(config, source, Utc::now()).await
}

/// `analyze` with an injected timestamp for the JSON metadata
pub async fn analyze_at(
    config: &Config,
    source: &Source,
    generated_at: DateTime<Utc>,
) -> Result<AnalyzeOutcome> {
    let start_time = Instant::now();
    info!("🚀 Analyzing course tree from {}", source.root_id);

    let mut walker = TreeWalker::new(source.remote.as_ref(), config.classification.video_types())
        .merge_duplicate_courses(config.walker.merge_duplicate_courses);
    let courses = walker.walk(&source.root_id, "").await;
    let stats = walker.stats();
    let totals = CatalogTotals::of(&courses);

    for course in courses.iter().filter(|c| !c.totals_consistent()) {
        warn!("Course totals out of sync: {}", course.name);
    }

    let output_dir = &config.output.base_dir;
    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let report_path = output_dir.join(&config.output.report_file);
    write_output(&report_path, &generate_report(&courses)).await?;

    let sql_path = output_dir.join(&config.output.sql_file);
    write_output(&sql_path, &generate_sql(&courses, &config.sql)).await?;

    let json = generate_json(&courses, &config.output.source_label, generated_at)
        .context("Failed to serialize course catalog")?;
    let json_path = output_dir.join(&config.output.json_file);
    write_output(&json_path, &json).await?;

    info!("🎉 Analysis completed in {:.2}s", start_time.elapsed().as_secs_f64());
    info!("📚 Courses: {}", totals.total_courses);
    info!("📖 Modules: {}", totals.total_modules);
    info!("🎬 Lessons: {}", totals.total_lessons);
    info!("💾 Total size: {}", format_bytes(totals.total_size));
    if stats.errors > 0 {
        warn!("⚠️  {} folders could not be read, output may be partial", stats.errors);
    }

    Ok(AnalyzeOutcome {
        courses,
        stats,
        totals,
        report_path,
        sql_path,
        json_path,
    })
}

/// Create anonymous view links on the whole tree
pub async fn apply_permissions(config: &Config, source: &Source) -> PermissionSummary {
    let start_time = Instant::now();
    info!("🔓 Applying public access from {}", source.root_id);

    let setter = PermissionSetter::from_config(source.remote.as_ref(), &config.permissions);
    let summary = setter.apply_public_access(&source.root_id, "").await;

    info!("🎉 Permissions completed in {:.2}s", start_time.elapsed().as_secs_f64());
    info!("📁 Folders processed: {}", summary.folders_processed);
    info!("🎬 Files processed: {}", summary.files_processed);
    info!("❌ Errors: {}", summary.errors);
    summary
}

/// Result of a combined permissions and analysis run
#[derive(Debug, Clone)]
pub struct SetupOutcome {
    pub permissions: PermissionSummary,
    pub analysis: AnalyzeOutcome,
}

/// Link the whole tree, then analyze it and write the outputs
pub async fn setup(config: &Config, source: &Source) -> Result<SetupOutcome> {
    setup_at(config, source, Utc::now()).await
}

/// `setup` with an injected timestamp for the JSON metadata
pub async fn setup_at(
    config: &Config,
    source: &Source,
    generated_at: DateTime<Utc>,
) -> Result<SetupOutcome> {
    info!("🛠️  Complete setup from {}", source.root_id);
    let permissions = apply_permissions(config, source).await;
    let analysis = analyze_at(config, source, generated_at).await?;
    Ok(SetupOutcome {
        permissions,
        analysis,
    })
}

/// Render a manual structure file into SQL
///
/// Returns `None` without writing anything when the structure holds no
/// courses.
pub async fn manual_sql(
    config: &Config,
    structure_path: &Path,
    output: Option<&Path>,
) -> Result<Option<PathBuf>> {
    let structure = ManualStructure::load(structure_path)
        .await
        .with_context(|| format!("Failed to load structure {}", structure_path.display()))?;

    if structure.is_empty() {
        warn!("⚠️  No courses in {}, nothing to generate", structure_path.display());
        return Ok(None);
    }

    let courses = structure.to_courses();
    if courses.is_empty() {
        warn!("⚠️  No lessons in {}, nothing to generate", structure_path.display());
        return Ok(None);
    }

    let sql_config = manual_sql_config(config, structure_path);
    let output_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.manual.output_file.clone());
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    write_output(&output_path, &generate_sql(&courses, &sql_config)).await?;

    let totals = CatalogTotals::of(&courses);
    info!("📊 Manual import summary:");
    info!("📚 Courses: {}", totals.total_courses);
    info!("📖 Modules: {}", totals.total_modules);
    info!("🎬 Lessons: {}", totals.total_lessons);
    info!("💾 SQL written to: {}", output_path.display());

    Ok(Some(output_path))
}

/// SQL settings for manual structures: own conflict guard, blank default descriptions
fn manual_sql_config(config: &Config, structure_path: &Path) -> SqlConfig {
    SqlConfig {
        conflict_guard: config.manual.conflict_guard,
        header: format!("Course catalog import from {}", structure_path.display()),
        course_description: String::new(),
        module_description: String::new(),
        lesson_description: String::new(),
        ..config.sql.clone()
    }
}

/// Write the default configuration, refusing to overwrite an existing file
pub fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("Refusing to overwrite existing file {}", path.display());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Config::default().save(path)
}

async fn write_output(path: &Path, content: &str) -> Result<()> {
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("💾 Written: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;

    #[test]
    fn test_folder_id_prefers_explicit_id() {
        let config = ConfigBuilder::new()
            .with_folder_id("EXPLICIT")
            .with_share_url("https://x-my.sharepoint.com/personal/owner/SHARED?e=1")
            .build();
        assert_eq!(resolve_folder_id(&config).unwrap(), "EXPLICIT");
    }

    #[test]
    fn test_folder_id_from_share_link() {
        let config = ConfigBuilder::new()
            .with_share_url("https://x-my.sharepoint.com/personal/owner/SHARED?e=1")
            .build();
        assert_eq!(resolve_folder_id(&config).unwrap(), "SHARED");
    }

    #[test]
    fn test_folder_id_errors() {
        assert!(resolve_folder_id(&Config::default()).is_err());

        let config = ConfigBuilder::new()
            .with_share_url("https://x-my.sharepoint.com/sites/team/doc")
            .build();
        assert!(resolve_folder_id(&config).is_err());
    }

    #[test]
    fn test_manual_sql_config_blanks_descriptions() {
        let config = Config::default();
        let sql_config = manual_sql_config(&config, Path::new("structure.toml"));

        assert!(!sql_config.conflict_guard);
        assert!(sql_config.course_description.is_empty());
        assert!(sql_config.module_description.is_empty());
        assert!(sql_config.lesson_description.is_empty());
        assert_eq!(sql_config.default_category, config.sql.default_category);
        assert_eq!(sql_config.linking, config.sql.linking);
    }

    #[test]
    fn test_init_config_does_not_overwrite() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("course-importer.toml");

        init_config(&path).unwrap();
        let reloaded = Config::from_file(&path).unwrap();
        assert_eq!(reloaded.permissions.delay_ms, 500);

        assert!(init_config(&path).is_err());
    }
}
