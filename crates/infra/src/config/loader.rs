//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `BRIGADE_API_BASE_URL`: Backend API base URL (required)
//! - `BRIGADE_API_TOKEN`: Initial bearer token (optional)
//! - `BRIGADE_API_CONNECT_TIMEOUT_SECS`: TCP connect timeout
//! - `BRIGADE_API_REQUEST_TIMEOUT_SECS`: Overall request timeout
//! - `BRIGADE_SYNC_INTERVAL_SECS`: Periodic sync interval (required)
//! - `BRIGADE_SYNC_ENABLED`: Whether background sync runs (true/false)
//! - `BRIGADE_RETRY_CEILING`: Transient failures tolerated per job
//! - `BRIGADE_RETRY_BACKOFF_MS`: Base retry backoff in milliseconds
//! - `BRIGADE_FLUSH_BATCH_SIZE`: Pending operations flushed per request
//! - `BRIGADE_PROBE_INTERVAL_SECS`: Connectivity probe interval (required)
//! - `BRIGADE_PROBE_TIMEOUT_SECS`: Connectivity probe timeout
//! - `BRIGADE_HEALTH_PATH`: Health endpoint probed for connectivity
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./brigade.json` or `./brigade.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use brigade_domain::constants::{
    CONNECT_TIMEOUT_SECS, FLUSH_BATCH_SIZE, HEALTH_PATH, PROBE_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS,
    RETRY_BACKOFF_BASE_MS, RETRY_CEILING,
};
use brigade_domain::{
    ApiConfig, BrigadeError, Config, ConnectivityConfig, Result, SyncConfig,
};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `BrigadeError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing
pub fn load() -> Result<Config> {
    // Try loading from environment first
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            // Fall back to file
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// The base URL and both intervals must be present; everything else falls
/// back to the compiled defaults.
///
/// # Errors
/// Returns `BrigadeError::Config` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<Config> {
    let base_url = env_var("BRIGADE_API_BASE_URL")?;
    let bearer_token = std::env::var("BRIGADE_API_TOKEN").ok().filter(|t| !t.is_empty());
    let connect_timeout_secs = env_parse("BRIGADE_API_CONNECT_TIMEOUT_SECS", CONNECT_TIMEOUT_SECS)?;
    let request_timeout_secs = env_parse("BRIGADE_API_REQUEST_TIMEOUT_SECS", REQUEST_TIMEOUT_SECS)?;

    let periodic_interval_secs = env_var("BRIGADE_SYNC_INTERVAL_SECS").and_then(|s| {
        s.parse::<u64>()
            .map_err(|e| BrigadeError::Config(format!("Invalid sync interval: {}", e)))
    })?;
    let sync_enabled = env_bool("BRIGADE_SYNC_ENABLED", true);
    let retry_ceiling = env_parse("BRIGADE_RETRY_CEILING", RETRY_CEILING)?;
    let retry_backoff_base_ms = env_parse("BRIGADE_RETRY_BACKOFF_MS", RETRY_BACKOFF_BASE_MS)?;
    let flush_batch_size = env_parse("BRIGADE_FLUSH_BATCH_SIZE", FLUSH_BATCH_SIZE)?;

    let probe_interval_secs = env_var("BRIGADE_PROBE_INTERVAL_SECS").and_then(|s| {
        s.parse::<u64>()
            .map_err(|e| BrigadeError::Config(format!("Invalid probe interval: {}", e)))
    })?;
    let probe_timeout_secs = env_parse("BRIGADE_PROBE_TIMEOUT_SECS", PROBE_TIMEOUT_SECS)?;
    let health_path =
        std::env::var("BRIGADE_HEALTH_PATH").unwrap_or_else(|_| HEALTH_PATH.to_string());

    Ok(Config {
        api: ApiConfig {
            base_url,
            connect_timeout_secs,
            request_timeout_secs,
            bearer_token,
        },
        sync: SyncConfig {
            periodic_interval_secs,
            retry_ceiling,
            retry_backoff_base_ms,
            flush_batch_size,
            enabled: sync_enabled,
        },
        connectivity: ConnectivityConfig {
            probe_interval_secs,
            probe_timeout_secs,
            health_path,
        },
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns `BrigadeError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(BrigadeError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            BrigadeError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| BrigadeError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| BrigadeError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| BrigadeError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(BrigadeError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory, up to two parent directories,
/// and the executable's directory for `config.{json,toml}` or
/// `brigade.{json,toml}`.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    // Try current working directory
    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(vec![
            cwd.join("config.json"),
            cwd.join("config.toml"),
            cwd.join("brigade.json"),
            cwd.join("brigade.toml"),
            cwd.join("../config.json"),
            cwd.join("../config.toml"),
            cwd.join("../../config.json"),
            cwd.join("../../config.toml"),
        ]);
    }

    // Try relative to executable
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(vec![
                exe_dir.join("config.json"),
                exe_dir.join("config.toml"),
                exe_dir.join("brigade.json"),
                exe_dir.join("brigade.toml"),
                exe_dir.join("../config.json"),
                exe_dir.join("../config.toml"),
                exe_dir.join("../../config.json"),
                exe_dir.join("../../config.toml"),
            ]);
        }
    }

    // Return first existing candidate
    candidates.into_iter().find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `BrigadeError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        BrigadeError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Parse an optional environment variable, falling back to a default
///
/// # Errors
/// Returns `BrigadeError::Config` if the variable is set but unparseable.
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| BrigadeError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
///
/// # Arguments
/// * `key` - Environment variable name
/// * `default` - Default value if variable is not set
///
/// # Returns
/// The parsed boolean value, or `default` if not set.
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
