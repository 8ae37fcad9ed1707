//! Tracing setup
//!
//! The logging config lives in the TOML file, so the file has to be loaded
//! before the real subscriber exists. A scoped stderr subscriber covers that
//! window so config fallback warnings are still reported.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use sidb_common::config::{load_config, LoggingConfig, TomlConfig};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used while loading config: RUST_LOG, else `info`
pub fn bootstrap_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Load config with its log events sent to stderr
pub fn load_config_logged(cli_path: Option<&Path>) -> sidb_common::Result<TomlConfig> {
    load_config_with_writer(cli_path, bootstrap_filter(), std::io::stderr)
}

/// Load config under a temporary subscriber writing to `make_writer`
pub fn load_config_with_writer<W>(
    cli_path: Option<&Path>,
    filter: EnvFilter,
    make_writer: W,
) -> sidb_common::Result<TomlConfig>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer));
    tracing::subscriber::with_default(subscriber, || load_config(cli_path))
}

/// Install the global subscriber; RUST_LOG takes priority over the configured level
pub fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };
    let stderr_layer = file_layer
        .is_none()
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}
