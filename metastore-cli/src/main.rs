mod commands;
mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use metastore_storage::{RecordStorage, StorageController};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::GetOutput;
use config::{AppConfig, LogFormat, LoggingConfig};

#[derive(Parser, Debug)]
#[command(name = "metastore")]
#[command(about = "Metastore CLI - metadata record retrieval")]
#[command(version)]
struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, env = "METASTORE_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch records and print their derived fields
    Get {
        /// Record ids
        #[arg(required = true)]
        ids: Vec<String>,

        /// Print the stored content instead
        #[arg(long, conflicts_with = "json")]
        raw: bool,

        /// Print one JSON object per record
        #[arg(long)]
        json: bool,
    },

    /// List record ids across the configured storage
    List,

    /// Show supported storage types
    Types,

    /// Extract the text at an element path from an XML file
    Extract {
        /// Slash separated element path, e.g. XIP/Metadata/Content
        #[arg(short, long)]
        path: String,

        /// XML file to scan
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = cli.config.as_deref().map(AppConfig::load).transpose()?;
    init_tracing(config.as_ref().map(|c| &c.logging).unwrap_or(&LoggingConfig::default()));

    match cli.command {
        Commands::Get { ids, raw, json } => {
            let output = match (raw, json) {
                (true, _) => GetOutput::Raw,
                (_, true) => GetOutput::Json,
                _ => GetOutput::Fields,
            };
            let storage = build_storage(config.as_ref())?;
            commands::run_get(storage, ids, output).await?;
        }
        Commands::List => {
            let storage = build_storage(config.as_ref())?;
            commands::run_list(storage.as_ref())?;
        }
        Commands::Types => {
            for kind in StorageController::default().supported_storage_ids() {
                println!("{}", kind);
            }
        }
        Commands::Extract { path, file } => {
            commands::run_extract(&path, &file)?;
        }
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| logging.level.clone()));
    let registry = tracing_subscriber::registry().with(filter);

    match logging.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn build_storage(config: Option<&AppConfig>) -> Result<Arc<dyn RecordStorage>> {
    let config = config.context("No configuration given; pass --config or set METASTORE_CONFIG")?;
    let storage = StorageController::default()
        .from_section(&config.storage)
        .context("Failed to build storage")?;
    tracing::debug!("Using storage '{}' ({})", storage.instance_id(), storage.backend_name());
    Ok(storage)
}
