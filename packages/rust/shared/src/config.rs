//! Application configuration for the enricher.
//!
//! User config lives at `~/.enricher/enricher.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EnricherError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "enricher.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".enricher";

/// Largest sub-batch the scheduler will ever run.
pub const MAX_BATCH_SIZE: usize = 500;

/// Default in-flight ceiling within one sub-batch.
pub const DEFAULT_TARGET_BATCH_SIZE: usize = 50;

/// Accepted range for the per-request total timeout, in seconds.
pub const TIMEOUT_SECS_RANGE: std::ops::RangeInclusive<u64> = 5..=10;

// ---------------------------------------------------------------------------
// Config structs (matching enricher.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Homepage fetch settings.
    #[serde(default)]
    pub fetch: FetchSection,

    /// Batch sizing.
    #[serde(default)]
    pub batch: BatchSection,

    /// Persistence store location.
    #[serde(default)]
    pub storage: StorageSection,
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSection {
    /// Total per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum redirects followed per request.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Skip TLS certificate validation. Many small company sites serve
    /// broken chains; set to `false` for a hardened deployment.
    #[serde(default = "default_true")]
    pub accept_invalid_certs: bool,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
            accept_invalid_certs: true,
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}
fn default_max_redirects() -> usize {
    10
}
fn default_true() -> bool {
    true
}
fn default_user_agent() -> String {
    concat!("Enricher/", env!("CARGO_PKG_VERSION")).into()
}

/// `[batch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSection {
    /// Concurrent fetches allowed within one sub-batch.
    #[serde(default = "default_target_size")]
    pub target_size: usize,

    /// Largest sub-batch size.
    #[serde(default = "default_max_size")]
    pub max_size: usize,
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            target_size: default_target_size(),
            max_size: default_max_size(),
        }
    }
}

fn default_target_size() -> usize {
    DEFAULT_TARGET_BATCH_SIZE
}
fn default_max_size() -> usize {
    MAX_BATCH_SIZE
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSection {
    /// Path to the company database. A leading `~/` expands to the home directory.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "~/.enricher/companies.db".into()
}

impl StorageSection {
    /// Resolve `db_path`, expanding a leading `~/`.
    pub fn resolved_db_path(&self) -> Result<PathBuf> {
        match self.db_path.strip_prefix("~/") {
            Some(rest) => {
                let home = dirs::home_dir()
                    .ok_or_else(|| EnricherError::config("could not determine home directory"))?;
                Ok(home.join(rest))
            }
            None => Ok(PathBuf::from(&self.db_path)),
        }
    }
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime fetch configuration.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// URL scheme used for homepage requests.
    pub scheme: String,
    pub timeout: Duration,
    pub max_redirects: usize,
    pub accept_invalid_certs: bool,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            scheme: "https".into(),
            timeout: Duration::from_secs(config.fetch.timeout_secs),
            max_redirects: config.fetch.max_redirects,
            accept_invalid_certs: config.fetch.accept_invalid_certs,
            user_agent: config.fetch.user_agent.clone(),
        }
    }
}

/// Runtime batch configuration.
#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    pub target_size: usize,
    pub max_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for BatchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            target_size: config.batch.target_size,
            max_size: config.batch.max_size,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.enricher/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| EnricherError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.enricher/enricher.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| EnricherError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| EnricherError::config(format!("failed to parse {}: {e}", path.display())))?;
    validate_config(&config)?;
    Ok(config)
}

/// Reject values the scheduler cannot work with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.batch.target_size == 0 {
        return Err(EnricherError::config("batch.target_size must be at least 1"));
    }
    if !(1..=MAX_BATCH_SIZE).contains(&config.batch.max_size) {
        return Err(EnricherError::config(format!(
            "batch.max_size must be between 1 and {MAX_BATCH_SIZE}, got {}",
            config.batch.max_size
        )));
    }
    if !TIMEOUT_SECS_RANGE.contains(&config.fetch.timeout_secs) {
        return Err(EnricherError::config(format!(
            "fetch.timeout_secs must be between {} and {}, got {}",
            TIMEOUT_SECS_RANGE.start(),
            TIMEOUT_SECS_RANGE.end(),
            config.fetch.timeout_secs
        )));
    }
    Ok(())
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| EnricherError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| EnricherError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| EnricherError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("timeout_secs"));
        assert!(toml_str.contains("target_size"));
        assert!(toml_str.contains("db_path"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.fetch.timeout_secs, 10);
        assert_eq!(parsed.batch.max_size, MAX_BATCH_SIZE);
        assert!(parsed.fetch.accept_invalid_certs);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let toml_str = r#"
[fetch]
timeout_secs = 5
accept_invalid_certs = false

[storage]
db_path = "/tmp/companies.db"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.fetch.timeout_secs, 5);
        assert!(!config.fetch.accept_invalid_certs);
        assert_eq!(config.fetch.max_redirects, 10);
        assert_eq!(config.batch.target_size, DEFAULT_TARGET_BATCH_SIZE);
        assert_eq!(
            config.storage.resolved_db_path().unwrap(),
            PathBuf::from("/tmp/companies.db")
        );
    }

    #[test]
    fn runtime_configs_from_app_config() {
        let app = AppConfig::default();
        let fetch = FetchConfig::from(&app);
        assert_eq!(fetch.scheme, "https");
        assert_eq!(fetch.timeout, Duration::from_secs(10));
        assert!(fetch.user_agent.starts_with("Enricher/"));

        let batch = BatchConfig::from(&app);
        assert_eq!(batch.target_size, 50);
        assert_eq!(batch.max_size, 500);
    }

    #[test]
    fn zero_sizes_are_rejected() {
        let mut config = AppConfig::default();
        config.batch.target_size = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("target_size"));

        let dir = std::env::temp_dir().join(format!("enricher-cfg-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("enricher.toml");
        std::fs::write(&path, "[batch]\nmax_size = 0\n").unwrap();
        assert!(load_config_from(&path).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn oversized_batches_are_rejected() {
        let mut config = AppConfig::default();
        config.batch.max_size = MAX_BATCH_SIZE;
        assert!(validate_config(&config).is_ok());

        config.batch.max_size = MAX_BATCH_SIZE + 1;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("max_size"));
    }

    #[test]
    fn timeout_outside_range_is_rejected() {
        let mut config = AppConfig::default();
        for secs in [5, 10] {
            config.fetch.timeout_secs = secs;
            assert!(validate_config(&config).is_ok(), "timeout {secs}");
        }
        for secs in [0, 4, 11, 3600] {
            config.fetch.timeout_secs = secs;
            let err = validate_config(&config).unwrap_err();
            assert!(err.to_string().contains("timeout_secs"), "timeout {secs}");
        }
    }

    #[test]
    fn out_of_range_config_file_fails_to_load() {
        let dir = std::env::temp_dir().join(format!("enricher-cfg-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();

        let path = dir.join("enricher.toml");
        std::fs::write(&path, "[batch]\nmax_size = 1000\n").unwrap();
        assert!(load_config_from(&path).is_err());

        std::fs::write(&path, "[fetch]\ntimeout_secs = 3600\n").unwrap();
        assert!(load_config_from(&path).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
