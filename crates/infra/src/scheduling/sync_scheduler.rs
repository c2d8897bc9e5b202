//! Connectivity-aware sync scheduler.
//!
//! Owns the two sync job keys and drives them from one event loop:
//! connectivity transitions, the periodic timer, retry backoffs, manual
//! commands and execution completions all land here, so every scheduling
//! decision is serialized and the per-key state machine needs no locks.
//!
//! Policy lives in [`brigade_core::KeySlot`]; this module supplies the
//! runtime around it: the loop task, the recurring timer, backoff sleeps,
//! execution dispatch, and lifecycle management (start/stop with join
//! handles and cancellation).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use brigade_core::SyncJob;
//! use brigade_domain::ConnectivityState;
//! use brigade_infra::scheduling::{SyncScheduler, SyncSchedulerConfig};
//! use tokio::sync::watch;
//!
//! # async fn example(job: Arc<dyn SyncJob>) -> Result<(), Box<dyn std::error::Error>> {
//! let (state_tx, state_rx) = watch::channel(ConnectivityState::Unavailable);
//! let mut scheduler = SyncScheduler::new(job, state_rx, SyncSchedulerConfig::default());
//!
//! scheduler.start().await?;
//! // ... application runs; state_tx publishes connectivity transitions ...
//! scheduler.stop().await?;
//! # drop(state_tx);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use brigade_core::sync::machine::{
    CancelAction, CompletionAction, Generation, KeySlot, TriggerAction,
};
use brigade_core::SyncJob;
use brigade_domain::constants::{PERIODIC_SYNC_INTERVAL_SECS, RETRY_BACKOFF_BASE_MS, RETRY_CEILING};
use brigade_domain::{ConnectivityState, JobKey, KeySnapshot, SchedulerStatus, SyncOutcome};
use chrono::{DateTime, Utc};
use parking_lot::Mutex as SyncMutex;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;
type SharedStatus = Arc<RwLock<SchedulerStatus>>;

/// Configuration for the sync scheduler
#[derive(Debug, Clone)]
pub struct SyncSchedulerConfig {
    /// Periodic trigger interval.
    pub periodic_interval: Duration,
    /// Transient failures tolerated per job lifetime.
    pub retry_ceiling: u32,
    /// Backoff before the first retry; doubles per subsequent retry.
    pub retry_backoff_base: Duration,
    /// How long `stop` waits for the loop task to finish.
    pub join_timeout: Duration,
}

impl Default for SyncSchedulerConfig {
    fn default() -> Self {
        Self {
            periodic_interval: Duration::from_secs(PERIODIC_SYNC_INTERVAL_SECS), // 15 minutes
            retry_ceiling: RETRY_CEILING,
            retry_backoff_base: Duration::from_millis(RETRY_BACKOFF_BASE_MS),
            join_timeout: Duration::from_secs(5),
        }
    }
}

impl SyncSchedulerConfig {
    /// Exponential backoff for the given retry number, capped at 2^8.
    fn backoff_delay(&self, retry_number: u32) -> Duration {
        let shift = retry_number.saturating_sub(1).min(8);
        self.retry_backoff_base.saturating_mul(1_u32 << shift)
    }
}

/// Commands accepted by the running scheduler loop.
#[derive(Debug)]
enum SchedulerCommand {
    /// Trigger the one-shot key as if connectivity had just returned.
    SyncNow,
    /// Drop all outstanding work and return both keys to idle.
    CancelAll,
}

/// Report sent back by a finished execution task.
#[derive(Debug)]
struct Completion {
    key: JobKey,
    generation: Generation,
    outcome: SyncOutcome,
}

/// Connectivity-aware scheduler with explicit lifecycle management.
pub struct SyncScheduler {
    job: Arc<dyn SyncJob>,
    connectivity: watch::Receiver<ConnectivityState>,
    config: SyncSchedulerConfig,
    command_tx: SyncMutex<Option<mpsc::Sender<SchedulerCommand>>>,
    status: SharedStatus,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl SyncScheduler {
    /// Create a scheduler; it does nothing until started.
    #[must_use]
    pub fn new(
        job: Arc<dyn SyncJob>,
        connectivity: watch::Receiver<ConnectivityState>,
        config: SyncSchedulerConfig,
    ) -> Self {
        Self {
            job,
            connectivity,
            config,
            command_tx: SyncMutex::new(None),
            status: Arc::new(RwLock::new(SchedulerStatus::new())),
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the scheduler loop.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(
            periodic_interval_secs = self.config.periodic_interval.as_secs(),
            retry_ceiling = self.config.retry_ceiling,
            "Starting sync scheduler"
        );

        // Fresh token and channels so the scheduler can be restarted.
        self.cancellation_token = CancellationToken::new();
        let (command_tx, command_rx) = mpsc::channel(16);
        let (completion_tx, completion_rx) = mpsc::channel(16);
        *self.command_tx.lock() = Some(command_tx);
        *self.status.write().await = SchedulerStatus::new();

        let worker = SchedulerLoop {
            job: Arc::clone(&self.job),
            connectivity: self.connectivity.clone(),
            config: self.config.clone(),
            command_rx,
            completion_tx,
            completion_rx,
            table: SlotTable::new(self.config.retry_ceiling),
            status: Arc::clone(&self.status),
        };
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            worker.run(cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);
        Ok(())
    }

    /// Stop the scheduler loop and wait for it to finish.
    ///
    /// In-flight executions are not aborted; their completions are dropped
    /// with the loop.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        let handle = self
            .task_handle
            .lock()
            .await
            .take()
            .ok_or(SchedulerError::NotRunning)?;

        info!("Stopping sync scheduler");
        *self.command_tx.lock() = None;
        self.cancellation_token.cancel();

        tokio::time::timeout(self.config.join_timeout, handle)
            .await
            .map_err(|_| SchedulerError::Timeout {
                seconds: self.config.join_timeout.as_secs(),
            })?
            .map_err(|err| SchedulerError::TaskJoinFailed(err.to_string()))?;

        info!("Sync scheduler stopped");
        Ok(())
    }

    /// Whether the scheduler loop is currently running.
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

    /// Trigger the one-shot key outside the connectivity signal.
    pub async fn sync_now(&self) -> SchedulerResult<()> {
        self.send_command(SchedulerCommand::SyncNow).await
    }

    /// Drop all outstanding work and return both keys to idle.
    pub async fn cancel_all(&self) -> SchedulerResult<()> {
        self.send_command(SchedulerCommand::CancelAll).await
    }

    /// Current snapshot of both job keys.
    pub async fn status(&self) -> SchedulerStatus {
        self.status.read().await.clone()
    }

    async fn send_command(&self, command: SchedulerCommand) -> SchedulerResult<()> {
        let tx = self
            .command_tx
            .lock()
            .clone()
            .ok_or(SchedulerError::NotRunning)?;
        tx.send(command)
            .await
            .map_err(|_| SchedulerError::NotRunning)
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("SyncScheduler dropped while running; cancelling scheduler loop");
            self.cancellation_token.cancel();
        }
    }
}

/// Per-key runtime bookkeeping around the pure slot.
struct LoopEntry {
    slot: KeySlot,
    retry_at: Option<Instant>,
    last_outcome: Option<SyncOutcome>,
    last_success_at: Option<DateTime<Utc>>,
}

impl LoopEntry {
    fn new(ceiling: u32) -> Self {
        Self {
            slot: KeySlot::new(ceiling),
            retry_at: None,
            last_outcome: None,
            last_success_at: None,
        }
    }

    fn snapshot(&self, key: JobKey) -> KeySnapshot {
        KeySnapshot {
            key,
            phase: self.slot.phase(),
            attempts: self.slot.attempts(),
            last_outcome: self.last_outcome.clone(),
            last_success_at: self.last_success_at,
        }
    }
}

struct SlotTable {
    one_shot: LoopEntry,
    periodic: LoopEntry,
}

impl SlotTable {
    fn new(ceiling: u32) -> Self {
        Self {
            one_shot: LoopEntry::new(ceiling),
            periodic: LoopEntry::new(ceiling),
        }
    }

    fn entry(&self, key: JobKey) -> &LoopEntry {
        match key {
            JobKey::OneShot => &self.one_shot,
            JobKey::Periodic => &self.periodic,
        }
    }

    fn entry_mut(&mut self, key: JobKey) -> &mut LoopEntry {
        match key {
            JobKey::OneShot => &mut self.one_shot,
            JobKey::Periodic => &mut self.periodic,
        }
    }

    fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            one_shot: self.one_shot.snapshot(JobKey::OneShot),
            periodic: self.periodic.snapshot(JobKey::Periodic),
        }
    }
}

/// State owned by the scheduler loop task.
struct SchedulerLoop {
    job: Arc<dyn SyncJob>,
    connectivity: watch::Receiver<ConnectivityState>,
    config: SyncSchedulerConfig,
    command_rx: mpsc::Receiver<SchedulerCommand>,
    completion_tx: mpsc::Sender<Completion>,
    completion_rx: mpsc::Receiver<Completion>,
    table: SlotTable,
    status: SharedStatus,
}

impl SchedulerLoop {
    async fn run(mut self, cancel: CancellationToken) {
        let mut periodic = interval_at(
            Instant::now() + self.config.periodic_interval,
            self.config.periodic_interval,
        );
        periodic.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // A device that boots online syncs promptly instead of waiting for
        // the first transition or periodic tick.
        if self.connectivity.borrow_and_update().is_available() {
            self.trigger(JobKey::OneShot, "startup");
        }
        self.publish_status().await;

        loop {
            let retry_due = self.next_retry_due();
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("Sync loop cancelled");
                    break;
                }
                changed = self.connectivity.changed() => {
                    match changed {
                        Ok(()) => {
                            let state = *self.connectivity.borrow();
                            self.on_connectivity(state);
                        }
                        Err(_) => {
                            warn!("Connectivity monitor gone; stopping sync loop");
                            break;
                        }
                    }
                }
                _ = periodic.tick() => {
                    self.trigger(JobKey::Periodic, "interval");
                }
                Some(done) = self.completion_rx.recv() => {
                    self.on_completion(done);
                }
                command = self.command_rx.recv() => {
                    match command {
                        Some(command) => self.on_command(command),
                        None => debug!("Command channel closed"),
                    }
                }
                () = sleep_until(retry_due.unwrap_or_else(Instant::now)), if retry_due.is_some() => {
                    self.on_retry_due();
                }
            }
            self.publish_status().await;
        }
    }

    fn on_connectivity(&mut self, state: ConnectivityState) {
        info!(state = state.as_str(), "Connectivity transition");
        match state {
            ConnectivityState::Available => self.trigger(JobKey::OneShot, "connectivity"),
            ConnectivityState::Unavailable => self.on_unavailable(),
        }
    }

    fn on_unavailable(&mut self) {
        for key in JobKey::ALL {
            let entry = self.table.entry_mut(key);
            match entry.slot.on_unavailable() {
                CancelAction::CancelledPending => {
                    entry.retry_at = None;
                    info!(key = key.name(), "Cancelled job awaiting start");
                }
                CancelAction::DroppedReplacement => {
                    debug!(key = key.name(), "Dropped queued replacement");
                }
                CancelAction::RunningUntouched => {
                    debug!(key = key.name(), "Execution in flight; letting it finish");
                }
                CancelAction::Noop | CancelAction::DetachedRunning => {}
            }
        }
    }

    fn on_command(&mut self, command: SchedulerCommand) {
        match command {
            SchedulerCommand::SyncNow => {
                info!("Manual sync requested");
                self.trigger(JobKey::OneShot, "manual");
            }
            SchedulerCommand::CancelAll => {
                info!("Cancelling all sync jobs");
                for key in JobKey::ALL {
                    let entry = self.table.entry_mut(key);
                    entry.retry_at = None;
                    match entry.slot.on_cancel() {
                        CancelAction::CancelledPending => {
                            debug!(key = key.name(), "Cancelled pending job");
                        }
                        CancelAction::DetachedRunning => {
                            debug!(
                                key = key.name(),
                                "In-flight execution detached; its outcome will arrive stale"
                            );
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    fn trigger(&mut self, key: JobKey, reason: &str) {
        let connectivity = *self.connectivity.borrow();
        let action = self.table.entry_mut(key).slot.on_trigger(key.policy(), connectivity);
        match action {
            TriggerAction::Start { generation } => {
                debug!(key = key.name(), reason, "Trigger accepted");
                self.dispatch(key, generation);
            }
            TriggerAction::QueueReplacement => {
                debug!(
                    key = key.name(),
                    reason, "Execution in flight; replacement queued"
                );
            }
            TriggerAction::Keep => {
                debug!(key = key.name(), reason, "Job already outstanding; trigger absorbed");
            }
            TriggerAction::Suppressed => {
                debug!(
                    key = key.name(),
                    reason, "Connectivity unavailable; trigger dropped"
                );
            }
        }
    }

    fn dispatch(&mut self, key: JobKey, generation: Generation) {
        let attempt = {
            let entry = self.table.entry_mut(key);
            entry.retry_at = None;
            let attempt = entry.slot.next_attempt();
            entry.slot.mark_running();
            attempt
        };
        debug!(key = key.name(), generation, attempt, "Dispatching sync execution");

        let job = Arc::clone(&self.job);
        let completion_tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let outcome = job.execute(attempt).await;
            let done = Completion {
                key,
                generation,
                outcome,
            };
            if completion_tx.send(done).await.is_err() {
                debug!(key = key.name(), "Scheduler loop gone; dropping completion");
            }
        });
    }

    fn on_completion(&mut self, done: Completion) {
        let Completion {
            key,
            generation,
            outcome,
        } = done;
        let connectivity = *self.connectivity.borrow();
        let action = self
            .table
            .entry_mut(key)
            .slot
            .on_completion(generation, &outcome, connectivity);

        if action == CompletionAction::Stale {
            // Honor the execution by logging its result, but the slot has
            // moved on; no transition and no status update.
            debug!(
                key = key.name(),
                outcome = outcome.label(),
                "Outcome from superseded execution; ignored"
            );
            return;
        }

        {
            let entry = self.table.entry_mut(key);
            entry.last_outcome = Some(outcome.clone());
            if matches!(outcome, SyncOutcome::Success) {
                entry.last_success_at = Some(Utc::now());
            }
        }

        match action {
            CompletionAction::Settled => match &outcome {
                SyncOutcome::Success => info!(key = key.name(), "Sync completed"),
                SyncOutcome::Failure { reason } => {
                    warn!(key = key.name(), reason = %reason, "Sync failed");
                }
                SyncOutcome::Retry { attempt } => {
                    debug!(key = key.name(), attempt, "Retry abandoned while offline");
                }
            },
            CompletionAction::ScheduleRetry { attempt } => {
                let delay = self.config.backoff_delay(attempt);
                self.table.entry_mut(key).retry_at = Some(Instant::now() + delay);
                warn!(key = key.name(), attempt, ?delay, "Transient sync failure; retry scheduled");
            }
            CompletionAction::Exhausted => {
                let entry = self.table.entry_mut(key);
                let reason = format!("retry ceiling of {} reached", entry.slot.ceiling());
                warn!(
                    key = key.name(),
                    attempts = entry.slot.attempts(),
                    "Retry ceiling reached; sync failed"
                );
                entry.last_outcome = Some(SyncOutcome::Failure { reason });
            }
            CompletionAction::StartReplacement { generation } => {
                info!(key = key.name(), "Queued replacement takes over");
                self.dispatch(key, generation);
            }
            CompletionAction::Stale => {}
        }
    }

    fn on_retry_due(&mut self) {
        let now = Instant::now();
        for key in JobKey::ALL {
            let due = self
                .table
                .entry(key)
                .retry_at
                .map(|at| at <= now)
                .unwrap_or(false);
            if !due {
                continue;
            }
            let generation = {
                let entry = self.table.entry_mut(key);
                entry.retry_at = None;
                entry.slot.begin_retry()
            };
            if let Some(generation) = generation {
                debug!(key = key.name(), "Retry backoff elapsed");
                self.dispatch(key, generation);
            }
        }
    }

    fn next_retry_due(&self) -> Option<Instant> {
        JobKey::ALL
            .iter()
            .filter_map(|key| self.table.entry(*key).retry_at)
            .min()
    }

    async fn publish_status(&self) {
        *self.status.write().await = self.table.status();
    }
}
