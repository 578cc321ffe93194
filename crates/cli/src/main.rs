//! portdq CLI - port data-quality inspections.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use portdq_core::InspectionId;
use portdq_quality::config::StorageConfig;
use portdq_quality::{
    AppConfig, Catalog, HistoryRequest, HttpRowSource, InspectionRunRequest, InspectionRunner,
    InspectionService, JsonFileRowSource, PeriodKind, RowSource, StorageBackend,
};
use portdq_storage::{HistoryStore, JsonStorage, MemoryStorage};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "portdq")]
#[command(about = "Port data-quality inspections", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (JSON)
    #[arg(long, global = true, env = "PORTDQ_CONFIG")]
    config: Option<PathBuf>,

    /// History store location, overriding the configuration
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    /// History store backend, overriding the configuration
    #[arg(long, global = true, value_enum)]
    backend: Option<Backend>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog data types
    Catalog {
        /// Group entries by category
        #[arg(long)]
        grouped: bool,
    },
    /// Run an inspection and store its result
    Run {
        /// Data type id
        data_type: String,
        /// Read rows from a JSON file instead of the upstream API
        #[arg(long)]
        rows: Option<PathBuf>,
        /// Parameter overrides (JSON object)
        #[arg(long)]
        params: Option<String>,
        /// Rule overrides (JSON object keyed by check type)
        #[arg(long)]
        rules: Option<String>,
    },
    /// Show bucketed inspection history
    History {
        /// Data type id
        data_type: String,
        /// Bucket period
        #[arg(long, value_enum, default_value = "daily")]
        period: Period,
        /// First day of a custom range
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last day of a custom range
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Keep only the most recent buckets
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show the latest inspection summary
    Summary {
        /// Data type id
        data_type: String,
    },
    /// Show field statistics and severity distribution
    Analyze {
        /// Data type id
        data_type: String,
        /// Inspection id (defaults to the latest)
        #[arg(long)]
        inspection: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Period {
    Daily,
    Weekly,
    Monthly,
    Custom,
}

impl From<Period> for PeriodKind {
    fn from(p: Period) -> Self {
        match p {
            Period::Daily => PeriodKind::Daily,
            Period::Weekly => PeriodKind::Weekly,
            Period::Monthly => PeriodKind::Monthly,
            Period::Custom => PeriodKind::Custom,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Json,
    Memory,
    Sqlite,
}

impl From<Backend> for StorageBackend {
    fn from(b: Backend) -> Self {
        match b {
            Backend::Json => StorageBackend::Json,
            Backend::Memory => StorageBackend::Memory,
            Backend::Sqlite => StorageBackend::Sqlite,
        }
    }
}

fn init_logging(verbose: bool) {
    // stdout carries JSON output only
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = AppConfig::load(cli.config.as_deref()).await?;
    if let Some(path) = cli.storage {
        config.storage.path = path;
    }
    if let Some(backend) = cli.backend {
        config.storage.backend = backend.into();
    }

    let catalog = Arc::new(match &config.catalog_path {
        Some(path) => Catalog::from_path(path)
            .await
            .with_context(|| format!("Failed to load catalog {}", path.display()))?,
        None => Catalog::builtin()?,
    });

    match cli.command {
        Commands::Catalog { grouped } => {
            if grouped {
                print_json(&catalog.list_by_category())?;
            } else {
                print_json(catalog.list())?;
            }
        }
        Commands::Run { data_type, rows, params, rules } => {
            let source: Arc<dyn RowSource> = match rows {
                Some(path) => Arc::new(JsonFileRowSource::new(path)),
                None => upstream_source(&config)?,
            };
            let service = open_service(&config, catalog, source).await?;

            let request = InspectionRunRequest::from_json(serde_json::json!({
                "data_type": data_type,
                "api_params": parse_json_arg("--params", params)?,
                "quality_meta": parse_json_arg("--rules", rules)?,
            }))?;
            let response = service.run(&request).await;
            print_json(&response)?;
            if !response.success {
                anyhow::bail!(response.message);
            }
            info!("{}", response.message);
        }
        Commands::History { data_type, period, start, end, limit } => {
            let service = open_service(&config, catalog, upstream_source(&config)?).await?;
            let request = HistoryRequest {
                period: period.into(),
                start_date: start,
                end_date: end,
                limit,
            };
            print_json(&service.history(&data_type, &request).await?)?;
        }
        Commands::Summary { data_type } => {
            let service = open_service(&config, catalog, upstream_source(&config)?).await?;
            print_json(&service.summary(&data_type).await?)?;
        }
        Commands::Analyze { data_type, inspection } => {
            let inspection_id = inspection
                .map(|id| id.parse::<InspectionId>())
                .transpose()
                .map_err(|e| anyhow::anyhow!("Invalid inspection ID: {e}"))?;
            let service = open_service(&config, catalog, upstream_source(&config)?).await?;
            print_json(&service.field_analysis(&data_type, inspection_id).await?)?;
        }
    }

    Ok(())
}

fn upstream_source(config: &AppConfig) -> Result<Arc<dyn RowSource>> {
    let upstream = &config.upstream;
    let source = HttpRowSource::new(
        upstream.base_url.clone(),
        Duration::from_secs(upstream.fetch_timeout_secs),
    )?;
    let source: Arc<dyn RowSource> = match &upstream.bearer_token {
        Some(token) => Arc::new(source.with_bearer_token(token.clone())),
        None => Arc::new(source),
    };
    Ok(source)
}

async fn open_service(
    config: &AppConfig,
    catalog: Arc<Catalog>,
    source: Arc<dyn RowSource>,
) -> Result<InspectionService<dyn HistoryStore>> {
    let store = open_store(&config.storage).await?;
    let runner = InspectionRunner::new(catalog, source).with_config(config.runner_config());
    Ok(InspectionService::new(runner, store).with_history_config(config.history_config()?))
}

async fn open_store(storage: &StorageConfig) -> Result<Arc<dyn HistoryStore>> {
    debug!(backend = ?storage.backend, path = %storage.path.display(), "Opening history store");
    let store: Arc<dyn HistoryStore> = match storage.backend {
        StorageBackend::Json => Arc::new(JsonStorage::new(&storage.path).await?),
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),
        #[cfg(feature = "sqlite")]
        StorageBackend::Sqlite => {
            tokio::fs::create_dir_all(&storage.path).await?;
            let db = storage.path.join("history.db");
            Arc::new(portdq_storage::SqliteStorage::new_from_path(&db).await?)
        }
        #[cfg(not(feature = "sqlite"))]
        StorageBackend::Sqlite => anyhow::bail!("portdq was built without the `sqlite` feature"),
    };
    Ok(store)
}

fn parse_json_arg(flag: &str, arg: Option<String>) -> Result<Value> {
    match arg {
        Some(text) => serde_json::from_str(&text).with_context(|| format!("{flag} is not valid JSON")),
        None => Ok(Value::Object(Default::default())),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_flag_overrides_storage_backend() {
        let cli = Cli::parse_from(["portdq", "--backend", "memory", "summary", "tc_work_info"]);
        assert!(matches!(cli.backend.map(StorageBackend::from), Some(StorageBackend::Memory)));

        let cli = Cli::parse_from(["portdq", "summary", "tc_work_info"]);
        assert!(cli.backend.is_none());
    }
}
