//! telemetry-etl - batch telemetry transformation
//!
//! # Usage
//!
//! ```bash
//! # Load records into the local record store
//! telemetry-etl import --file records.jsonl
//!
//! # Run one batch (buckets to PostgreSQL, table to blob storage)
//! telemetry-etl run --batch-id 2decd2dc-e720-4cb7-9d4c-73dbe81785fe
//!
//! # Run without writing anywhere
//! telemetry-etl run --batch-id 2decd2dc-e720-4cb7-9d4c-73dbe81785fe --dry-run
//!
//! # Read back a published table
//! telemetry-etl fetch-table --name sensors_2decd2dc-e720-4cb7-9d4c-73dbe81785fe_1700000000000.csv
//! ```
//!
//! # Environment Variables
//!
//! - `ETL_CONFIG`: path to the TOML config (default: ./etl_config.toml)
//! - `ETL_BATCH_ID`: batch to run when `--batch-id` is not given
//! - `DATABASE_URL`: overrides `database.url`
//! - `BLOB_TOKEN`: bearer token for the HTTP object store
//! - `RUST_LOG`: logging level (default: info)
//! - `ETL_LOG_JSON`: `true` for JSON-lines logs (same as `--log-json`)

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use telemetry_etl::config::EtlConfig;
use telemetry_etl::pipeline::{BatchController, EtlService};
use telemetry_etl::sink::{
    table_sink_from_config, AggregateSink, MemoryBucketSink, MemoryTableSink, PostgresBucketSink,
    TableSink,
};
use telemetry_etl::source::SledRecordStore;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "telemetry-etl")]
#[command(about = "Hourly location buckets and resampled sensor tables from telemetry batches")]
#[command(version)]
struct CliArgs {
    /// Path to the TOML config file (else $ETL_CONFIG, else ./etl_config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines instead of plain text
    #[arg(long, global = true, env = "ETL_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Transform one batch and hand the results to the configured sinks
    Run {
        /// Batch identifier
        #[arg(long, env = "ETL_BATCH_ID")]
        batch_id: String,
        /// Use in-memory sinks; nothing is written
        #[arg(long)]
        dry_run: bool,
    },

    /// Import JSON-lines records into the record store
    Import {
        /// One record per line
        #[arg(long)]
        file: PathBuf,
    },

    /// Download a published table and print it decompressed
    FetchTable {
        /// Table name as produced by `run`
        #[arg(long)]
        name: String,
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

// ============================================================================
// Configuration
// ============================================================================

fn load_config(path: Option<&PathBuf>) -> Result<EtlConfig> {
    let mut config = match path {
        Some(path) => EtlConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EtlConfig::load(),
    };
    config.apply_env_overrides();
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

// ============================================================================
// Commands
// ============================================================================

async fn run_batch(config: &EtlConfig, batch_id: &str, dry_run: bool) -> Result<()> {
    let store = SledRecordStore::open(&config.source.db_path, config.source.page_size)
        .context("Failed to open record store")?;

    let bucket_sink: Arc<dyn AggregateSink>;
    let table_sink: Arc<dyn TableSink>;
    if dry_run {
        info!("Dry run: results are kept in memory and discarded");
        let delimiter = config
            .export
            .delimiter_char()
            .map_err(anyhow::Error::msg)?;
        bucket_sink = Arc::new(MemoryBucketSink::new());
        table_sink = Arc::new(MemoryTableSink::new(delimiter, config.export.compression_level));
    } else {
        bucket_sink = Arc::new(
            PostgresBucketSink::connect(&config.database)
                .await
                .context("Failed to connect to PostgreSQL")?,
        );
        table_sink = table_sink_from_config(&config.blob, &config.export)
            .context("Failed to set up table sink")?;
    }

    let service = EtlService::new(Arc::new(store), bucket_sink, table_sink)
        .with_file_prefix(config.export.file_prefix.clone())
        .with_parallel_stages(config.pipeline.parallel_stages);
    let controller = BatchController::new(service, config.pipeline.deadline());

    let summary = controller.handle(batch_id).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_import(config: &EtlConfig, file: &PathBuf) -> Result<()> {
    let store = SledRecordStore::open(&config.source.db_path, config.source.page_size)
        .context("Failed to open record store")?;
    let reader = std::fs::File::open(file)
        .with_context(|| format!("Failed to open {}", file.display()))?;

    let report = store.import_json_lines(BufReader::new(reader))?;
    store.flush()?;
    info!(
        file = %file.display(),
        imported = report.imported,
        rejected = report.rejected,
        "Import complete"
    );
    Ok(())
}

async fn run_fetch_table(config: &EtlConfig, name: &str, output: Option<&PathBuf>) -> Result<()> {
    let sink = table_sink_from_config(&config.blob, &config.export)
        .context("Failed to set up table sink")?;
    let text = sink
        .fetch(name)
        .await
        .with_context(|| format!("Failed to fetch table {name}"))?;

    match output {
        Some(path) => {
            std::fs::write(path, &text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), bytes = text.len(), "Table saved");
        }
        None => std::io::stdout().write_all(text.as_bytes())?,
    }
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Logs go to stderr so table text on stdout stays clean.
fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = CliArgs::parse();
    init_logging(args.log_json);

    let config = load_config(args.config.as_ref())?;

    match args.command {
        SubCommand::Run { batch_id, dry_run } => run_batch(&config, &batch_id, dry_run).await,
        SubCommand::Import { file } => run_import(&config, &file),
        SubCommand::FetchTable { name, output } => {
            run_fetch_table(&config, &name, output.as_ref()).await
        }
    }
}
