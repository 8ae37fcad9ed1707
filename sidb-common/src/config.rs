//! Bootstrap configuration loading and path resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables (`SIDB_*`)
//! 3. TOML config file
//! 4. Compiled defaults (fallback)
//!
//! A missing TOML file is never fatal: a warning is logged and defaults are
//! used. A file that exists but does not parse is a configuration error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const ENV_CONFIG: &str = "SIDB_CONFIG";
/// Environment variable overriding the content store database path
pub const ENV_DATABASE_PATH: &str = "SIDB_DATABASE_PATH";
/// Environment variable overriding the log level
pub const ENV_LOG_LEVEL: &str = "SIDB_LOG_LEVEL";
/// Environment variable carrying the GitHub API token
pub const ENV_GITHUB_TOKEN: &str = "SIDB_GITHUB_TOKEN";
/// Environment variable carrying the PatentsView API key
pub const ENV_PATENTSVIEW_API_KEY: &str = "SIDB_PATENTSVIEW_API_KEY";
/// Environment variable overriding the HTTP user agent
pub const ENV_USER_AGENT: &str = "SIDB_USER_AGENT";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Path to the SQLite content store
    ///
    /// Default: `<local data dir>/sidb/sidb.db`
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// User agent sent to every external API
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Per-source overrides
    #[serde(default)]
    pub sources: SourcesConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Overrides for the four enrichment sources
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub sec_edgar: SourceConfig,
    #[serde(default)]
    pub patents: SourceConfig,
    #[serde(default)]
    pub github: SourceConfig,
    #[serde(default)]
    pub fcc_spectrum: SourceConfig,
}

impl SourcesConfig {
    /// Look up a source section by its source name
    pub fn get(&self, source: &str) -> Option<&SourceConfig> {
        match source {
            "sec_edgar" => Some(&self.sec_edgar),
            "patents" => Some(&self.patents),
            "github" => Some(&self.github),
            "fcc_spectrum" => Some(&self.fcc_spectrum),
            _ => None,
        }
    }
}

/// Per-source settings
///
/// Every tuning field is optional; `None` means "use the adapter's compiled
/// default".
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub delay_ms: Option<u64>,
    #[serde(default)]
    pub cache_ttl_ms: Option<u64>,
    #[serde(default)]
    pub failure_threshold: Option<u32>,
    #[serde(default)]
    pub reset_timeout_ms: Option<u64>,
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    #[serde(default)]
    pub abort_on_rate_limit: Option<bool>,
    /// Replaces the adapter's static entity list
    #[serde(default)]
    pub entities: Option<Vec<String>>,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            delay_ms: None,
            cache_ttl_ms: None,
            failure_threshold: None,
            reset_timeout_ms: None,
            request_timeout_ms: None,
            abort_on_rate_limit: None,
            entities: None,
            api_key: None,
        }
    }
}

fn default_enabled() -> bool {
    true
}

impl TomlConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Apply `SIDB_*` environment overrides on top of file values
    pub fn apply_env_overrides(&mut self) {
        if let Some(path) = non_empty_env(ENV_DATABASE_PATH) {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(level) = non_empty_env(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        if let Some(agent) = non_empty_env(ENV_USER_AGENT) {
            self.user_agent = Some(agent);
        }
        if let Some(token) = non_empty_env(ENV_GITHUB_TOKEN) {
            self.sources.github.api_key = Some(token);
        }
        if let Some(key) = non_empty_env(ENV_PATENTSVIEW_API_KEY) {
            self.sources.patents.api_key = Some(key);
        }
    }

    /// Resolve the content store path: CLI > ENV/TOML > compiled default
    pub fn resolve_database_path(&self, cli_arg: Option<&Path>) -> PathBuf {
        if let Some(path) = cli_arg {
            return path.to_path_buf();
        }
        self.database_path
            .clone()
            .unwrap_or_else(default_database_path)
    }

    /// User agent for outbound HTTP requests
    pub fn user_agent(&self) -> String {
        self.user_agent.clone().unwrap_or_else(get_user_agent)
    }
}

/// Load configuration from the resolved config file, then apply env overrides
///
/// `cli_path` takes priority over `SIDB_CONFIG` and the platform locations.
pub fn load_config(cli_path: Option<&Path>) -> Result<TomlConfig> {
    let mut config = match resolve_config_path(cli_path) {
        Some(path) => load_toml_config(&path)?,
        None => {
            warn!("No config file found, using compiled defaults");
            TomlConfig::default()
        }
    };
    config.apply_env_overrides();
    Ok(config)
}

/// Load a TOML config file
///
/// A missing file yields defaults; an unreadable or malformed one is an error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!("Config file not found: {}, using compiled defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    let config = TomlConfig::from_toml_str(&content)?;
    info!("Loaded config: {}", path.display());
    Ok(config)
}

/// Find the config file to load, if any
///
/// An explicit path (CLI or `SIDB_CONFIG`) is returned even when it does not
/// exist so the caller can report it; platform locations are only returned
/// when present.
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Some(path) = non_empty_env(ENV_CONFIG) {
        return Some(PathBuf::from(path));
    }

    // Priority 3: user config, then system config
    let user_config = dirs::config_dir().map(|d| d.join("sidb").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/sidb/config.toml");
    if cfg!(unix) && system_config.exists() {
        return Some(system_config);
    }

    None
}

/// OS-dependent default content store path
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("sidb"))
        .unwrap_or_else(|| PathBuf::from("./sidb_data"))
        .join("sidb.db")
}

/// Standard user agent for outbound API requests
///
/// SEC EDGAR rejects requests without a descriptive agent.
pub fn get_user_agent() -> String {
    format!(
        "sidb-enrich/{} (+https://github.com/sidb/sidb)",
        env!("CARGO_PKG_VERSION")
    )
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
