use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::catalog::{MimeMatchMode, VideoMimeTypes};
use crate::emit::SqlLinking;

/// Configuration for the course catalog importer
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Where the course tree lives
    pub source: SourceConfig,

    /// Remote API settings
    pub graph: GraphConfig,

    /// Video detection settings
    pub classification: ClassificationConfig,

    /// Tree walk settings
    pub walker: WalkerConfig,

    /// Sharing link settings
    pub permissions: PermissionConfig,

    /// SQL generation settings
    pub sql: SqlConfig,

    /// Manual structure settings
    pub manual: ManualConfig,

    /// Output file settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SourceConfig {
    /// Share link of the root course folder
    pub share_url: Option<String>,

    /// Root folder id, takes precedence over the share link
    pub folder_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// API base URL
    pub base_url: String,

    /// Drive path below the base URL
    pub drive_path: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Bearer token (falls back to GRAPH_ACCESS_TOKEN)
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// MIME types recognised as lesson videos
    pub video_mime_types: Vec<String>,

    /// How MIME types are compared
    pub match_mode: MimeMatchMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WalkerConfig {
    /// Fold same-named courses from sibling subtrees into one
    pub merge_duplicate_courses: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionConfig {
    /// Pause after each file link, in milliseconds
    pub delay_ms: u64,

    /// Sharing link type
    pub link_type: String,

    /// Sharing link scope
    pub scope: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlConfig {
    /// Schema holding the destination tables (empty for none)
    pub schema: String,

    /// How child rows reference their parents
    pub linking: SqlLinking,

    /// Guard inserts with ON CONFLICT DO NOTHING
    pub conflict_guard: bool,

    /// Double backslashes inside literals
    pub escape_backslashes: bool,

    /// Header comment line
    pub header: String,

    /// Category for courses without one
    pub default_category: String,

    /// Instructor for courses without one
    pub default_instructor: String,

    /// Course description template
    pub course_description: String,

    /// Module description template
    pub module_description: String,

    /// Lesson description template
    pub lesson_description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualConfig {
    /// Guard manual inserts with ON CONFLICT DO NOTHING
    pub conflict_guard: bool,

    /// Default output file for the manual SQL
    pub output_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Base output directory
    pub base_dir: PathBuf,

    /// Text report file name
    pub report_file: String,

    /// SQL file name
    pub sql_file: String,

    /// JSON file name
    pub json_file: String,

    /// Source label written into the JSON metadata
    pub source_label: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: "https://graph.microsoft.com/v1.0".to_string(),
            drive_path: "sites/root/drive".to_string(),
            timeout_seconds: 30,
            access_token: None,
        }
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            video_mime_types: VideoMimeTypes::default_types(),
            match_mode: MimeMatchMode::Contains,
        }
    }
}

impl ClassificationConfig {
    pub fn video_types(&self) -> VideoMimeTypes {
        VideoMimeTypes::new(self.video_mime_types.clone(), self.match_mode)
    }
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            delay_ms: 500,
            link_type: "view".to_string(),
            scope: "anonymous".to_string(),
        }
    }
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            linking: SqlLinking::Identifiers,
            conflict_guard: true,
            escape_backslashes: false,
            header: "Course catalog import generated from the OneDrive analysis".to_string(),
            default_category: "plataforma".to_string(),
            default_instructor: "Instituto dos Sonhos".to_string(),
            course_description: "Curso completo importado do OneDrive - {lessons} aulas".to_string(),
            module_description: "Módulo com {lessons} aulas".to_string(),
            lesson_description: "Aula do curso {course}".to_string(),
        }
    }
}

impl Default for ManualConfig {
    fn default() -> Self {
        Self {
            conflict_guard: false,
            output_file: PathBuf::from("import-courses-onedrive.sql"),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./output"),
            report_file: "relatorio-completo-aulas.txt".to_string(),
            sql_file: "import-todas-aulas.sql".to_string(),
            json_file: "estrutura-completa.json".to_string(),
            source_label: "OneDrive/SharePoint Analysis".to_string(),
        }
    }
}

impl Config {
    const SEARCH_PATHS: [&'static str; 2] = ["course-importer.toml", "config/course-importer.toml"];

    /// Load configuration from an explicit file, the default locations, or defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => Self::search().unwrap_or_else(|| {
                tracing::debug!("No configuration file found, using defaults");
                Self::default()
            }),
        };

        config.apply_env();
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    fn search() -> Option<Self> {
        for path in &Self::SEARCH_PATHS {
            let path = Path::new(path);
            if !path.exists() {
                continue;
            }
            match Self::from_file(path) {
                Ok(config) => return Some(config),
                Err(e) => tracing::warn!("Skipping config file {}: {:#}", path.display(), e),
            }
        }
        None
    }

    /// Override settings from environment variables
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("COURSE_IMPORTER_SHARE_URL") {
            self.source.share_url = Some(url);
        }

        if let Ok(dir) = std::env::var("COURSE_IMPORTER_OUTPUT_DIR") {
            self.output.base_dir = PathBuf::from(dir);
        }

        if let Ok(delay) = std::env::var("COURSE_IMPORTER_PERMISSION_DELAY_MS") {
            match delay.parse() {
                Ok(ms) => self.permissions.delay_ms = ms,
                Err(_) => tracing::warn!("Ignoring invalid COURSE_IMPORTER_PERMISSION_DELAY_MS: {}", delay),
            }
        }

        if let Ok(token) = std::env::var("GRAPH_ACCESS_TOKEN") {
            self.graph.access_token = Some(token);
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.classification.video_mime_types.is_empty() {
            return Err(anyhow!("classification.video_mime_types must not be empty"));
        }

        if self.graph.timeout_seconds == 0 {
            return Err(anyhow!("graph.timeout_seconds must be greater than 0"));
        }

        if self.graph.base_url.trim().is_empty() {
            return Err(anyhow!("graph.base_url must not be empty"));
        }

        if self.permissions.link_type.trim().is_empty() || self.permissions.scope.trim().is_empty() {
            return Err(anyhow!("permissions.link_type and permissions.scope must be set"));
        }

        if !self
            .sql
            .schema
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(anyhow!("sql.schema must be a plain identifier: {}", self.sql.schema));
        }

        for name in [&self.output.report_file, &self.output.sql_file, &self.output.json_file] {
            if name.trim().is_empty() {
                return Err(anyhow!("output file names must not be empty"));
            }
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Course Importer Configuration:\n\
            - Source: {}\n\
            - Graph endpoint: {}/{}\n\
            - Video types: {} ({:?})\n\
            - Merge duplicate courses: {}\n\
            - Permission delay: {}ms\n\
            - SQL linking: {:?} (conflict guard: {})\n\
            - Output directory: {}",
            self.source
                .folder_id
                .as_deref()
                .or(self.source.share_url.as_deref())
                .unwrap_or("<not set>"),
            self.graph.base_url,
            self.graph.drive_path,
            self.classification.video_mime_types.join(", "),
            self.classification.match_mode,
            self.walker.merge_duplicate_courses,
            self.permissions.delay_ms,
            self.sql.linking,
            self.sql.conflict_guard,
            self.output.base_dir.display()
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_share_url(mut self, url: impl Into<String>) -> Self {
        self.config.source.share_url = Some(url.into());
        self
    }

    pub fn with_folder_id(mut self, id: impl Into<String>) -> Self {
        self.config.source.folder_id = Some(id.into());
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.base_dir = dir;
        self
    }

    pub fn with_permission_delay_ms(mut self, delay_ms: u64) -> Self {
        self.config.permissions.delay_ms = delay_ms;
        self
    }

    pub fn with_sql_linking(mut self, linking: SqlLinking) -> Self {
        self.config.sql.linking = linking;
        self
    }

    pub fn merge_duplicate_courses(mut self, merge: bool) -> Self {
        self.config.walker.merge_duplicate_courses = merge;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.permissions.delay_ms, 500);
        assert_eq!(config.sql.linking, SqlLinking::Identifiers);
        assert!(config.sql.conflict_guard);
        assert!(!config.manual.conflict_guard);
        assert!(!config.walker.merge_duplicate_courses);
        assert!(config
            .classification
            .video_mime_types
            .contains(&"video/x-matroska".to_string()));
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_folder_id("ABC")
            .with_permission_delay_ms(0)
            .with_sql_linking(SqlLinking::TitleLookup)
            .merge_duplicate_courses(true)
            .build();

        assert_eq!(config.source.folder_id.as_deref(), Some("ABC"));
        assert_eq!(config.permissions.delay_ms, 0);
        assert_eq!(config.sql.linking, SqlLinking::TitleLookup);
        assert!(config.walker.merge_duplicate_courses);
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.classification.video_mime_types.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sql.schema = "public; DROP".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [source]
            folder_id = "XYZ"

            [sql]
            linking = "title_lookup"
            escape_backslashes = true

            [classification]
            match_mode = "exact"
            "#,
        )
        .unwrap();

        assert_eq!(config.source.folder_id.as_deref(), Some("XYZ"));
        assert_eq!(config.sql.linking, SqlLinking::TitleLookup);
        assert!(config.sql.escape_backslashes);
        assert_eq!(config.sql.schema, "public");
        assert_eq!(config.classification.match_mode, MimeMatchMode::Exact);
        assert_eq!(config.permissions.delay_ms, 500);
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("course-importer.toml");

        let config = ConfigBuilder::new().with_share_url("https://x/personal/o/ID").build();
        config.save(&path).unwrap();

        let reloaded = Config::from_file(&path).unwrap();
        assert_eq!(reloaded.source.share_url.as_deref(), Some("https://x/personal/o/ID"));
        assert_eq!(reloaded.output.sql_file, config.output.sql_file);
    }
}
