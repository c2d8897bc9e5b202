//! Application context - dependency injection container

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use brigade_domain::{BrigadeError, Config, ConnectivityState, Result, SchedulerStatus};
use brigade_infra::connectivity::{ConnectivityMonitor, ConnectivityMonitorConfig, HttpProbeSource};
use brigade_infra::http::HttpClient;
use brigade_infra::scheduling::{SyncScheduler, SyncSchedulerConfig};
use brigade_infra::sync::{
    MemoryCacheStore, MemoryPendingQueue, PosSyncJob, SessionTokens, SyncJobConfig,
};
use tracing::info;

/// Application context - holds all services and dependencies
///
/// Owns the connectivity monitor and sync scheduler directly so that
/// [`AppContext::shutdown`] can stop them in order: scheduler first (no new
/// executions), then the monitor.
pub struct AppContext {
    pub config: Config,
    pub session: Arc<SessionTokens>,
    pub queue: Arc<MemoryPendingQueue>,
    pub cache: Arc<MemoryCacheStore>,
    monitor: ConnectivityMonitor,
    scheduler: SyncScheduler,
}

impl AppContext {
    /// Wire and start the sync subsystem (fail-fast).
    ///
    /// The monitor always starts; the scheduler only starts when sync is
    /// enabled in the configuration. Components that fail or hang during
    /// startup abort initialization instead of leaving the app half-wired.
    pub async fn init(config: Config) -> Result<Self> {
        let session = Arc::new(SessionTokens::new(config.api.bearer_token.clone()));
        let client = Arc::new(
            HttpClient::builder()
                .base_url(&config.api.base_url)
                .connect_timeout(Duration::from_secs(config.api.connect_timeout_secs))
                .request_timeout(Duration::from_secs(config.api.request_timeout_secs))
                .token_provider(session.clone())
                .build()?,
        );

        let queue = Arc::new(MemoryPendingQueue::new());
        let cache = Arc::new(MemoryCacheStore::new());
        let job = Arc::new(PosSyncJob::new(
            Arc::clone(&client),
            queue.clone(),
            cache.clone(),
            SyncJobConfig {
                flush_batch_size: config.sync.flush_batch_size,
                retry_ceiling: config.sync.retry_ceiling,
                ..Default::default()
            },
        ));

        let probe = Arc::new(HttpProbeSource::new(
            client,
            config.connectivity.health_path.clone(),
            Duration::from_secs(config.connectivity.probe_timeout_secs),
        ));
        let mut monitor = ConnectivityMonitor::new(
            probe,
            ConnectivityMonitorConfig {
                poll_interval: Duration::from_secs(config.connectivity.probe_interval_secs.max(1)),
                ..Default::default()
            },
        );

        let mut scheduler = SyncScheduler::new(
            job,
            monitor.subscribe(),
            SyncSchedulerConfig {
                periodic_interval: Duration::from_secs(config.sync.periodic_interval_secs.max(1)),
                retry_ceiling: config.sync.retry_ceiling,
                retry_backoff_base: Duration::from_millis(config.sync.retry_backoff_base_ms),
                ..Default::default()
            },
        );

        start_component("connectivity monitor", monitor.start()).await?;
        if config.sync.enabled {
            start_component("sync scheduler", scheduler.start()).await?;
        } else {
            info!("Background sync disabled by configuration");
        }

        Ok(Self {
            config,
            session,
            queue,
            cache,
            monitor,
            scheduler,
        })
    }

    /// Trigger a sync outside the connectivity signal.
    pub async fn sync_now(&self) -> Result<()> {
        Ok(self.scheduler.sync_now().await?)
    }

    /// Drop all outstanding sync work.
    pub async fn cancel_sync(&self) -> Result<()> {
        Ok(self.scheduler.cancel_all().await?)
    }

    /// Snapshot of both sync job keys.
    pub async fn sync_status(&self) -> SchedulerStatus {
        self.scheduler.status().await
    }

    /// Push a connectivity observation from a platform callback.
    pub fn report_connectivity(&self, state: ConnectivityState) {
        self.monitor.report(state);
    }

    /// Current connectivity as last observed.
    pub fn connectivity(&self) -> ConnectivityState {
        self.monitor.current()
    }

    /// Install a fresh session token; takes effect on the next request.
    pub fn set_session_token(&self, token: impl Into<String>) {
        self.session.set_token(token);
    }

    /// Drop the session token; subsequent requests go out anonymous.
    pub fn clear_session_token(&self) {
        self.session.clear_token();
    }

    /// Stop the scheduler and monitor gracefully.
    pub async fn shutdown(&mut self) -> Result<()> {
        info!("Shutting down application context");
        if self.scheduler.is_running() {
            self.scheduler.stop().await?;
        }
        if self.monitor.is_running() {
            self.monitor.stop().await?;
        }
        info!("Application context shut down");
        Ok(())
    }
}

/// Start a component with a hard deadline so a wedged start cannot hang
/// initialization.
async fn start_component<E>(
    name: &str,
    start: impl Future<Output = std::result::Result<(), E>>,
) -> Result<()>
where
    E: std::fmt::Display,
{
    let start_timeout = Duration::from_secs(10);
    tokio::time::timeout(start_timeout, start)
        .await
        .map_err(|_| {
            tracing::error!(component = name, timeout_secs = 10, "Component start timed out");
            BrigadeError::Internal(format!("{} start timed out after 10s", name))
        })?
        .map_err(|err| {
            tracing::error!(component = name, error = %err, "Component failed to start");
            BrigadeError::Internal(format!("failed to start {}: {}", name, err))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use brigade_domain::JobPhase;

    /// A closed local port makes every request fail instantly, so the boot
    /// probe resolves to `Unavailable` without touching a real network.
    fn local_config() -> Config {
        let mut config = Config::default();
        config.api.base_url = "http://127.0.0.1:9".to_string();
        config.api.connect_timeout_secs = 1;
        config.api.request_timeout_secs = 1;
        config.connectivity.probe_interval_secs = 60;
        config.connectivity.probe_timeout_secs = 1;
        config
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_context_initializes_and_shuts_down() {
        let mut ctx = AppContext::init(local_config()).await.unwrap();

        // Offline boot: both keys idle, nothing scheduled.
        let status = ctx.sync_status().await;
        assert_eq!(status.one_shot.phase, JobPhase::Idle);
        assert_eq!(status.periodic.phase, JobPhase::Idle);
        assert_eq!(ctx.connectivity(), ConnectivityState::Unavailable);

        ctx.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_disabled_sync_never_starts_the_scheduler() {
        let mut config = local_config();
        config.sync.enabled = false;

        let mut ctx = AppContext::init(config).await.unwrap();
        assert!(ctx.sync_now().await.is_err());
        ctx.shutdown().await.unwrap();
    }
}
