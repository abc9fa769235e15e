use anyhow::Result;
use clap::{Parser, Subcommand};
use course_catalog_importer::commands::{self, Source};
use course_catalog_importer::config::Config;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "course-importer")]
#[command(version, about = "Import OneDrive/SharePoint course trees into a course catalog")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to course-importer.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the course tree and write report, SQL and JSON
    Analyze {
        /// Share link of the root course folder
        #[arg(long)]
        share_url: Option<String>,
        /// Read the tree from a JSON snapshot instead of the API
        #[arg(long)]
        snapshot: Option<PathBuf>,
        /// Output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Create anonymous view links on every folder and file
    Permissions {
        /// Share link of the root course folder
        #[arg(long)]
        share_url: Option<String>,
        /// Read the tree from a JSON snapshot instead of the API
        #[arg(long)]
        snapshot: Option<PathBuf>,
        /// Pause after each file, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Create links, then analyze the tree in one run
    Setup {
        /// Share link of the root course folder
        #[arg(long)]
        share_url: Option<String>,
        /// Read the tree from a JSON snapshot instead of the API
        #[arg(long)]
        snapshot: Option<PathBuf>,
        /// Output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Pause after each file, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Generate SQL from a hand-authored course structure
    ManualSql {
        /// Structure file (.toml or .json)
        #[arg(long)]
        structure: PathBuf,
        /// SQL output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write the default configuration file
    InitConfig {
        /// Destination path
        #[arg(long, default_value = "course-importer.toml")]
        path: PathBuf,
    },
}

/// Log filter used when RUST_LOG is unset, covering the library and this binary
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "course_catalog_importer=debug,course_importer=debug,info"
    } else {
        "course_catalog_importer=info,course_importer=info,warn"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(cli.verbose))),
        )
        .init();

    if let Commands::InitConfig { path } = &cli.command {
        return commands::init_config(path);
    }

    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            share_url,
            snapshot,
            output_dir,
        } => {
            if let Some(url) = share_url {
                config.source.share_url = Some(url);
            }
            if let Some(dir) = output_dir {
                config.output.base_dir = dir;
            }
            config.validate()?;
            debug!("{}", config.summary());

            let source = Source::open(&config, snapshot.as_deref()).await?;
            let outcome = commands::analyze(&config, &source).await?;
            info!("📂 Output directory: {}", config.output.base_dir.display());
            debug!("Walk statistics: {:?}", outcome.stats);
        }
        Commands::Permissions {
            share_url,
            snapshot,
            delay_ms,
        } => {
            if let Some(url) = share_url {
                config.source.share_url = Some(url);
            }
            if let Some(ms) = delay_ms {
                config.permissions.delay_ms = ms;
            }
            config.validate()?;
            debug!("{}", config.summary());

            let source = Source::open(&config, snapshot.as_deref()).await?;
            commands::apply_permissions(&config, &source).await;
        }
        Commands::Setup {
            share_url,
            snapshot,
            output_dir,
            delay_ms,
        } => {
            if let Some(url) = share_url {
                config.source.share_url = Some(url);
            }
            if let Some(dir) = output_dir {
                config.output.base_dir = dir;
            }
            if let Some(ms) = delay_ms {
                config.permissions.delay_ms = ms;
            }
            config.validate()?;
            debug!("{}", config.summary());

            let source = Source::open(&config, snapshot.as_deref()).await?;
            let outcome = commands::setup(&config, &source).await?;
            info!(
                "📂 Output directory: {} ({} link errors)",
                config.output.base_dir.display(),
                outcome.permissions.errors
            );
        }
        Commands::ManualSql { structure, output } => {
            config.validate()?;
            commands::manual_sql(&config, &structure, output.as_deref()).await?;
        }
        Commands::InitConfig { .. } => {}
    }

    Ok(())
}
