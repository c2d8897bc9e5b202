//! Connectivity sources
//!
//! Reachability is judged by whether the backend answers at all: any HTTP
//! response counts as `Available`, including error statuses. Only a
//! transport-level failure or a probe timeout means `Unavailable`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use brigade_core::ConnectivitySource;
use brigade_domain::constants::PROBE_TIMEOUT_SECS;
use brigade_domain::ConnectivityState;
use parking_lot::Mutex;
use tracing::debug;

use crate::http::HttpClient;

/// Probes the backend health endpoint over the sync HTTP client.
pub struct HttpProbeSource {
    client: Arc<HttpClient>,
    path: String,
    timeout: Duration,
}

impl HttpProbeSource {
    #[must_use]
    pub fn new(client: Arc<HttpClient>, path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            path: path.into(),
            timeout,
        }
    }

    /// Probe with the default health path and timeout.
    #[must_use]
    pub fn with_defaults(client: Arc<HttpClient>) -> Self {
        Self::new(
            client,
            brigade_domain::constants::HEALTH_PATH,
            Duration::from_secs(PROBE_TIMEOUT_SECS),
        )
    }
}

#[async_trait]
impl ConnectivitySource for HttpProbeSource {
    async fn check(&self) -> ConnectivityState {
        match self.client.health_check(&self.path, self.timeout).await {
            // A response of any status proves the network path works.
            Ok(_) => ConnectivityState::Available,
            Err(err) => {
                debug!(error = %err, "Connectivity probe failed");
                ConnectivityState::Unavailable
            }
        }
    }
}

/// Manually driven source for platform callbacks and tests.
pub struct ManualSource {
    state: Mutex<ConnectivityState>,
}

impl ManualSource {
    #[must_use]
    pub fn new(initial: ConnectivityState) -> Self {
        Self {
            state: Mutex::new(initial),
        }
    }

    pub fn set(&self, state: ConnectivityState) {
        *self.state.lock() = state;
    }
}

#[async_trait]
impl ConnectivitySource for ManualSource {
    async fn check(&self) -> ConnectivityState {
        *self.state.lock()
    }
}
