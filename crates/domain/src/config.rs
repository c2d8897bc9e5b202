//! Configuration management

use serde::{Deserialize, Serialize};

use crate::constants::{
    CONNECT_TIMEOUT_SECS, FLUSH_BATCH_SIZE, HEALTH_PATH, PERIODIC_SYNC_INTERVAL_SECS,
    PROBE_INTERVAL_SECS, PROBE_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS, RETRY_BACKOFF_BASE_MS,
    RETRY_CEILING,
};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub sync: SyncConfig,
    pub connectivity: ConnectivityConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Initial bearer token. Session refresh replaces it at runtime.
    #[serde(skip_serializing)]
    pub bearer_token: Option<String>,
}

/// Sync scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub periodic_interval_secs: u64,
    pub retry_ceiling: u32,
    pub retry_backoff_base_ms: u64,
    pub flush_batch_size: usize,
    pub enabled: bool,
}

/// Connectivity monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    pub probe_interval_secs: u64,
    pub probe_timeout_secs: u64,
    pub health_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "https://api.brigadepos.com/v1".to_string(),
                connect_timeout_secs: CONNECT_TIMEOUT_SECS,
                request_timeout_secs: REQUEST_TIMEOUT_SECS,
                bearer_token: None,
            },
            sync: SyncConfig {
                periodic_interval_secs: PERIODIC_SYNC_INTERVAL_SECS,
                retry_ceiling: RETRY_CEILING,
                retry_backoff_base_ms: RETRY_BACKOFF_BASE_MS,
                flush_batch_size: FLUSH_BATCH_SIZE,
                enabled: true,
            },
            connectivity: ConnectivityConfig {
                probe_interval_secs: PROBE_INTERVAL_SECS,
                probe_timeout_secs: PROBE_TIMEOUT_SECS,
                health_path: HEALTH_PATH.to_string(),
            },
        }
    }
}
