//! sidb-enrich - Space industry database enrichment
//!
//! Pulls company financials, patents, repository activity and spectrum
//! licenses from public APIs and upserts them into the SQLite content store.
//! Sources run concurrently; entities within a source run sequentially at
//! the pace that source tolerates.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use sidb_common::config::TomlConfig;
use sidb_enrich::adapters::http::build_client;
use sidb_enrich::adapters::SourceKind;
use sidb_enrich::config::{resolve_source, select_sources};
use sidb_enrich::db::{self, runs, SqliteContentStore};
use sidb_enrich::logging::{init_logging, load_config_logged};
use sidb_enrich::runner::{run_source, SourceOutcome};
use sidb_enrich::{BatchOrchestrator, EnrichmentContext};
use tracing::{error, info, warn};

/// Command-line arguments for sidb-enrich
#[derive(Parser, Debug)]
#[command(name = "sidb-enrich")]
#[command(about = "Enrich the space industry database from public APIs")]
#[command(version)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true, env = "SIDB_CONFIG")]
    config: Option<PathBuf>,

    /// Content store database path
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run enrichment batches
    Run {
        /// Source to run (repeatable); all enabled sources when omitted
        #[arg(long = "source", value_name = "SOURCE")]
        sources: Vec<SourceKind>,
    },
    /// Show recent batch runs
    Runs {
        #[arg(long, default_value = "20")]
        limit: u32,
    },
    /// Show effective per-source configuration
    Sources,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config_logged(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.logging)?;

    info!("Starting sidb-enrich v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Run { sources } => run(&config, cli.database, &sources).await,
        Command::Runs { limit } => show_runs(&config, cli.database, limit).await,
        Command::Sources => {
            show_sources(&config);
            Ok(())
        }
    }
}

async fn run(config: &TomlConfig, database: Option<PathBuf>, requested: &[SourceKind]) -> Result<()> {
    let sources = select_sources(requested, config);
    if sources.is_empty() {
        warn!("No sources enabled, nothing to do");
        return Ok(());
    }

    let db_path = config.resolve_database_path(database.as_deref());
    info!("Database: {}", db_path.display());
    let pool = db::init_database_pool(&db_path).await?;
    let store = SqliteContentStore::new(pool.clone());

    let client = build_client(&config.user_agent())?;
    let orchestrator = BatchOrchestrator::new(EnrichmentContext::shared());

    let outcomes = join_all(
        sources
            .iter()
            .map(|source| run_source(&orchestrator, source, &client, &store)),
    )
    .await;

    let mut store_failures = 0;
    for outcome in &outcomes {
        if let Some(summary) = outcome.summary() {
            // History is best-effort; a failed insert must not hide the results
            if let Err(e) = runs::save_run(&pool, summary).await {
                warn!(source = %summary.source, error = %e, "Failed to record batch run");
            }
        }

        match outcome {
            SourceOutcome::Completed(summary) => print_summary(summary),
            SourceOutcome::StoreFailed(err) => {
                store_failures += 1;
                error!("{}", err);
                print_summary(err.summary());
            }
            SourceOutcome::NotConfigured { source, reason } => {
                println!("{:<14} not configured: {}", source, reason);
            }
        }
    }

    for snapshot in orchestrator.context().breakers.snapshots().await {
        info!(
            breaker = %snapshot.name,
            state = %snapshot.state,
            consecutive_failures = snapshot.consecutive_failures,
            "Breaker state after run"
        );
    }

    if store_failures > 0 {
        bail!("{} source(s) failed to persist results", store_failures);
    }
    Ok(())
}

fn print_summary(summary: &sidb_enrich::BatchSummary) {
    println!(
        "{:<14} total={} fetched={} stored={} skipped={} errors={}{} ({} ms)",
        summary.source,
        summary.total,
        summary.fetched,
        summary.stored,
        summary.skipped,
        summary.errors.len(),
        if summary.aborted {
            format!(" aborted, {} unattempted", summary.unattempted())
        } else {
            String::new()
        },
        summary.elapsed_ms()
    );
    for err in &summary.errors {
        println!("    {}", err);
    }
}

async fn show_runs(config: &TomlConfig, database: Option<PathBuf>, limit: u32) -> Result<()> {
    let db_path = config.resolve_database_path(database.as_deref());
    let pool = db::init_database_pool(&db_path).await?;

    let recent = runs::list_recent_runs(&pool, limit).await?;
    if recent.is_empty() {
        println!("No batch runs recorded in {}", db_path.display());
        return Ok(());
    }

    for summary in &recent {
        println!(
            "{}  {:<14} fetched={}/{} stored={} skipped={} errors={}{}",
            summary.started_at.format("%Y-%m-%d %H:%M:%S"),
            summary.source,
            summary.fetched,
            summary.total,
            summary.stored,
            summary.skipped,
            summary.errors.len(),
            if summary.aborted { " aborted" } else { "" }
        );
    }
    Ok(())
}

fn show_sources(config: &TomlConfig) {
    for kind in SourceKind::ALL {
        let source = resolve_source(kind, config);
        println!(
            "{:<14} {:<8} collection={} delay={}ms ttl={}ms timeout={}ms threshold={} reset={}ms abort_on_rate_limit={} entities={}",
            kind.name(),
            if source.enabled { "enabled" } else { "disabled" },
            kind.collection(),
            source.settings.delay.as_millis(),
            source.settings.cache_ttl.as_millis(),
            source.settings.request_timeout.as_millis(),
            source.settings.breaker.failure_threshold,
            source.settings.breaker.reset_timeout.as_millis(),
            source.settings.abort_on_rate_limit,
            source.entities.len()
        );
    }
}
