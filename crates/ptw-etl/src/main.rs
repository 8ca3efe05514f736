//! PTW ETL - project-tracking warehouse loader

use anyhow::Result;
use clap::Parser;
use ptw_common::logging::{init_logging, LogConfig, LogLevel};
use ptw_common::types::TargetTable;
use ptw_etl::{identity, loader, transform, EtlConfig, EtlPipeline, SourceReader, WarehouseLoader};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ptw-etl")]
#[command(author, version, about = "Project-tracking warehouse ETL")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Run the full pipeline: read, transform, load
    Run {
        /// Path to the source spreadsheet export (CSV)
        #[arg(short, long)]
        source: PathBuf,

        /// Maximum number of source rows to process
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Read and transform only, reporting rejections without loading
    Check {
        /// Path to the source spreadsheet export (CSV)
        #[arg(short, long)]
        source: PathBuf,

        /// Maximum number of source rows to process
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbose flag
    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .file_prefix("ptw-etl".to_string())
        .build();

    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    match cli.command {
        Command::Run { source, limit } => {
            let config = EtlConfig::load()?;
            let db = loader::connect(&config.database).await?;
            let warehouse = WarehouseLoader::new(db, &config.load);

            let pipeline = EtlPipeline::new(config, warehouse).with_row_limit(limit);
            let report = pipeline.run(&source).await?;

            for entry in &report.tables {
                info!(table = %entry.table, outcome = ?entry.outcome, "Table outcome");
            }
            println!("{}", serde_json::to_string_pretty(&report)?);

            if !report.succeeded() {
                anyhow::bail!(
                    "run completed with failures: {:?}",
                    report
                        .failed_tables()
                        .iter()
                        .map(TargetTable::as_str)
                        .collect::<Vec<_>>()
                );
            }
        },
        Command::Check { source, limit } => {
            // Transform-only pass: the supported way to stop before any load
            let reader = match limit {
                Some(n) => SourceReader::with_limit(n),
                None => SourceReader::new(),
            };
            let rows = reader.read(&source)?;
            let keyed = identity::assign_project_ids(rows);
            let transformed = transform::transform_all(&keyed);

            info!(
                projects = transformed.projects.len(),
                budgets = transformed.budgets.len(),
                risks = transformed.risks.len(),
                milestones = transformed.milestones.len(),
                delays = transformed.delays.len(),
                rejected = transformed.rejections.total(),
                "Transform check complete"
            );
            println!(
                "{}",
                serde_json::to_string_pretty(&transformed.rejections)?
            );
        },
    }

    Ok(())
}
