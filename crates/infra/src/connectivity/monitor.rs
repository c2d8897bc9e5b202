//! Connectivity monitor publishing de-duplicated state transitions
//!
//! The monitor owns a watch channel seeded `Unavailable` and corrects it
//! from the first poll. `send_if_modified` guarantees subscribers only
//! ever wake on a genuine transition: two consecutive `Available`
//! observations produce one notification, never two. Platform layers with
//! native reachability callbacks can bypass polling entirely and push
//! observations through [`ConnectivityMonitor::report`]; the same
//! de-duplication applies.

use std::sync::Arc;
use std::time::Duration;

use brigade_core::ConnectivitySource;
use brigade_domain::constants::PROBE_INTERVAL_SECS;
use brigade_domain::ConnectivityState;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors from monitor lifecycle management
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Monitor is already running")]
    AlreadyRunning,

    #[error("Monitor is not running")]
    NotRunning,

    #[error("Monitor did not stop within {seconds}s")]
    StopTimeout { seconds: u64 },

    #[error("Monitor task failed to join: {0}")]
    TaskJoinFailed(String),
}

impl From<MonitorError> for brigade_domain::BrigadeError {
    fn from(err: MonitorError) -> Self {
        match err {
            MonitorError::AlreadyRunning | MonitorError::NotRunning => {
                Self::InvalidInput(err.to_string())
            }
            MonitorError::StopTimeout { .. } | MonitorError::TaskJoinFailed(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Configuration for the connectivity monitor
#[derive(Debug, Clone)]
pub struct ConnectivityMonitorConfig {
    /// How often the source is polled.
    pub poll_interval: Duration,
    /// How long `stop` waits for the poll task to finish.
    pub join_timeout: Duration,
}

impl Default for ConnectivityMonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(PROBE_INTERVAL_SECS),
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// Background connectivity monitor with explicit lifecycle management
pub struct ConnectivityMonitor {
    source: Arc<dyn ConnectivitySource>,
    config: ConnectivityMonitorConfig,
    state_tx: watch::Sender<ConnectivityState>,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl ConnectivityMonitor {
    /// Create a monitor; it does not poll until started.
    #[must_use]
    pub fn new(source: Arc<dyn ConnectivitySource>, config: ConnectivityMonitorConfig) -> Self {
        // Boot pessimistic; the first poll corrects the state and that
        // correction is a real transition for subscribers.
        let (state_tx, _) = watch::channel(ConnectivityState::Unavailable);
        Self {
            source,
            config,
            state_tx,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Subscribe to state transitions.
    ///
    /// The receiver immediately holds the current state; `changed()` then
    /// resolves once per transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.state_tx.subscribe()
    }

    /// Current state without subscribing.
    #[must_use]
    pub fn current(&self) -> ConnectivityState {
        *self.state_tx.borrow()
    }

    /// Push an observation from outside the poll loop.
    ///
    /// Consecutive identical observations are suppressed here exactly as
    /// they are for polled ones.
    pub fn report(&self, observed: ConnectivityState) {
        publish(&self.state_tx, observed);
    }

    /// Start the poll loop.
    pub async fn start(&mut self) -> Result<(), MonitorError> {
        if self.is_running() {
            return Err(MonitorError::AlreadyRunning);
        }

        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            "Starting connectivity monitor"
        );

        // Fresh token so the monitor can be restarted after stop.
        self.cancellation_token = CancellationToken::new();

        let source = Arc::clone(&self.source);
        let config = self.config.clone();
        let state_tx = self.state_tx.clone();
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            poll_loop(source, &config, &state_tx, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);
        Ok(())
    }

    /// Stop the poll loop and wait for it to finish.
    pub async fn stop(&mut self) -> Result<(), MonitorError> {
        let handle = self
            .task_handle
            .lock()
            .await
            .take()
            .ok_or(MonitorError::NotRunning)?;

        info!("Stopping connectivity monitor");
        self.cancellation_token.cancel();

        tokio::time::timeout(self.config.join_timeout, handle)
            .await
            .map_err(|_| MonitorError::StopTimeout {
                seconds: self.config.join_timeout.as_secs(),
            })?
            .map_err(|err| MonitorError::TaskJoinFailed(err.to_string()))?;

        info!("Connectivity monitor stopped");
        Ok(())
    }

    /// Whether the poll task is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .map(|guard| {
                guard
                    .as_ref()
                    .map(|handle| !handle.is_finished())
                    .unwrap_or(false)
            })
            .unwrap_or(false)
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("ConnectivityMonitor dropped while running; cancelling poll task");
            self.cancellation_token.cancel();
        }
    }
}

async fn poll_loop(
    source: Arc<dyn ConnectivitySource>,
    config: &ConnectivityMonitorConfig,
    state_tx: &watch::Sender<ConnectivityState>,
    cancel: CancellationToken,
) {
    // Correct the pessimistic boot state right away instead of waiting a
    // full interval.
    publish(state_tx, source.check().await);

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!("Connectivity poll loop cancelled");
                break;
            }
            () = tokio::time::sleep(config.poll_interval) => {
                publish(state_tx, source.check().await);
            }
        }
    }
}

fn publish(state_tx: &watch::Sender<ConnectivityState>, observed: ConnectivityState) {
    let changed = state_tx.send_if_modified(|state| {
        if *state == observed {
            false
        } else {
            *state = observed;
            true
        }
    });
    if changed {
        info!(state = observed.as_str(), "Connectivity changed");
    }
}
