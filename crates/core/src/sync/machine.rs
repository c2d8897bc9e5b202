//! Per-key scheduling state machine
//!
//! Each job key owns one [`KeySlot`] tracking the phases
//! `Idle -> Scheduled -> Running -> {Idle | RetryPending | Failed}`. The
//! slot is a pure value: transitions take the observed inputs (trigger,
//! completion, connectivity change, cancel) and return the action the
//! runtime must carry out. All slot mutation happens on the scheduler's
//! event loop, so the machine itself needs no synchronization.
//!
//! Executions are tracked by a monotonically increasing generation.
//! A completion that reports an older generation belongs to a superseded
//! execution: it is surfaced to the caller as [`CompletionAction::Stale`]
//! and changes nothing.

use brigade_domain::{ConnectivityState, JobPhase, SchedulePolicy, SyncOutcome};

/// Identifier distinguishing executions dispatched from one slot.
pub type Generation = u64;

/// Action the runtime must take after a trigger was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerAction {
    /// Dispatch a fresh execution under the returned generation.
    Start { generation: Generation },
    /// An execution is in flight; start the replacement when it completes.
    QueueReplacement,
    /// The outstanding job absorbs the trigger; nothing to do.
    Keep,
    /// Connectivity is unavailable; the trigger is dropped.
    Suppressed,
}

/// Action the runtime must take after a completion was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionAction {
    /// The outcome was recorded and the slot is at rest.
    Settled,
    /// Transient failure within the ceiling; dispatch again after backoff.
    ScheduleRetry { attempt: u32 },
    /// The retry ceiling was reached; the slot is now `Failed`.
    Exhausted,
    /// A queued replacement takes over; dispatch it now.
    StartReplacement { generation: Generation },
    /// The outcome belongs to a superseded execution; nothing changes.
    Stale,
}

/// Action the runtime must take after a cancellation was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelAction {
    /// A job that had not started yet was dropped.
    CancelledPending,
    /// A queued replacement was dropped; the running execution continues.
    DroppedReplacement,
    /// An execution is in flight; it is never aborted.
    RunningUntouched,
    /// The in-flight execution keeps running but its outcome will arrive
    /// under an old generation and be treated as stale.
    DetachedRunning,
    /// Nothing was outstanding.
    Noop,
}

/// Scheduling state for one job key.
#[derive(Debug, Clone)]
pub struct KeySlot {
    phase: JobPhase,
    attempts: u32,
    generation: Generation,
    queued_replacement: bool,
    ceiling: u32,
}

impl KeySlot {
    /// New idle slot tolerating `ceiling` transient failures per lifetime.
    #[must_use]
    pub const fn new(ceiling: u32) -> Self {
        Self {
            phase: JobPhase::Idle,
            attempts: 0,
            generation: 0,
            queued_replacement: false,
            ceiling,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> JobPhase {
        self.phase
    }

    /// Transient failures recorded in the current job lifetime.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.generation
    }

    #[must_use]
    pub const fn ceiling(&self) -> u32 {
        self.ceiling
    }

    /// 1-based attempt number for the next dispatched execution.
    #[must_use]
    pub const fn next_attempt(&self) -> u32 {
        self.attempts + 1
    }

    #[must_use]
    pub const fn has_queued_replacement(&self) -> bool {
        self.queued_replacement
    }

    /// Apply a trigger under the key's conflict policy.
    ///
    /// Triggers while connectivity is unavailable are dropped, not queued;
    /// the next `Available` transition is itself a trigger.
    pub fn on_trigger(
        &mut self,
        policy: SchedulePolicy,
        connectivity: ConnectivityState,
    ) -> TriggerAction {
        if !connectivity.is_available() {
            return TriggerAction::Suppressed;
        }
        match (self.phase, policy) {
            (JobPhase::Running, SchedulePolicy::Replace) => {
                self.queued_replacement = true;
                TriggerAction::QueueReplacement
            }
            (JobPhase::Running | JobPhase::Scheduled | JobPhase::RetryPending, SchedulePolicy::KeepExisting) => {
                TriggerAction::Keep
            }
            // Replace drops a job that has not started; the fresh trigger
            // begins a new lifetime with a reset attempt counter.
            (JobPhase::Scheduled | JobPhase::RetryPending, SchedulePolicy::Replace)
            | (JobPhase::Idle | JobPhase::Failed, _) => self.start_fresh(),
        }
    }

    /// Mark the scheduled execution as in flight.
    pub fn mark_running(&mut self) {
        self.phase = JobPhase::Running;
    }

    /// A retry backoff elapsed; move the slot back to `Scheduled`.
    ///
    /// Returns the generation to dispatch under, or `None` if the slot is
    /// no longer waiting (the retry was cancelled or replaced meanwhile).
    pub fn begin_retry(&mut self) -> Option<Generation> {
        if self.phase == JobPhase::RetryPending {
            self.phase = JobPhase::Scheduled;
            Some(self.generation)
        } else {
            None
        }
    }

    /// Apply the outcome of a finished execution.
    ///
    /// `connectivity` decides what happens to a `Retry` outcome: pending
    /// work does not survive connectivity loss, so a retry that completes
    /// while offline settles back to `Idle` instead of waiting out its
    /// backoff.
    pub fn on_completion(
        &mut self,
        generation: Generation,
        outcome: &SyncOutcome,
        connectivity: ConnectivityState,
    ) -> CompletionAction {
        if generation != self.generation {
            return CompletionAction::Stale;
        }
        if self.queued_replacement {
            self.queued_replacement = false;
            self.generation += 1;
            self.attempts = 0;
            self.phase = JobPhase::Scheduled;
            return CompletionAction::StartReplacement {
                generation: self.generation,
            };
        }
        match outcome {
            SyncOutcome::Success => {
                self.reset_idle();
                CompletionAction::Settled
            }
            SyncOutcome::Failure { .. } => {
                self.phase = JobPhase::Failed;
                CompletionAction::Settled
            }
            SyncOutcome::Retry { attempt } => {
                self.attempts = *attempt;
                if !connectivity.is_available() {
                    self.reset_idle();
                    CompletionAction::Settled
                } else if self.attempts >= self.ceiling {
                    self.phase = JobPhase::Failed;
                    CompletionAction::Exhausted
                } else {
                    self.phase = JobPhase::RetryPending;
                    CompletionAction::ScheduleRetry {
                        attempt: self.attempts,
                    }
                }
            }
        }
    }

    /// Connectivity became unavailable.
    ///
    /// Jobs that have not started are cancelled. A running execution is
    /// never aborted; it finishes and its outcome is still recorded.
    pub fn on_unavailable(&mut self) -> CancelAction {
        match self.phase {
            JobPhase::Scheduled | JobPhase::RetryPending => {
                self.reset_idle();
                CancelAction::CancelledPending
            }
            JobPhase::Running => {
                if self.queued_replacement {
                    self.queued_replacement = false;
                    CancelAction::DroppedReplacement
                } else {
                    CancelAction::RunningUntouched
                }
            }
            JobPhase::Idle | JobPhase::Failed => CancelAction::Noop,
        }
    }

    /// External cancellation; the slot returns to `Idle` unconditionally.
    ///
    /// An in-flight execution is not aborted. Its generation is retired so
    /// the eventual completion arrives stale.
    pub fn on_cancel(&mut self) -> CancelAction {
        let action = match self.phase {
            JobPhase::Idle | JobPhase::Failed => CancelAction::Noop,
            JobPhase::Scheduled | JobPhase::RetryPending => CancelAction::CancelledPending,
            JobPhase::Running => {
                self.generation += 1;
                CancelAction::DetachedRunning
            }
        };
        self.reset_idle();
        action
    }

    fn start_fresh(&mut self) -> TriggerAction {
        self.generation += 1;
        self.attempts = 0;
        self.queued_replacement = false;
        self.phase = JobPhase::Scheduled;
        TriggerAction::Start {
            generation: self.generation,
        }
    }

    fn reset_idle(&mut self) {
        self.phase = JobPhase::Idle;
        self.attempts = 0;
        self.queued_replacement = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brigade_domain::ConnectivityState::{Available, Unavailable};

    const CEILING: u32 = 3;

    fn running_slot() -> (KeySlot, Generation) {
        let mut slot = KeySlot::new(CEILING);
        let action = slot.on_trigger(SchedulePolicy::Replace, Available);
        let TriggerAction::Start { generation } = action else {
            panic!("expected a fresh start, got {action:?}");
        };
        slot.mark_running();
        (slot, generation)
    }

    #[test]
    fn trigger_from_idle_starts_execution() {
        let mut slot = KeySlot::new(CEILING);
        let action = slot.on_trigger(SchedulePolicy::Replace, Available);
        assert_eq!(action, TriggerAction::Start { generation: 1 });
        assert_eq!(slot.phase(), JobPhase::Scheduled);
        assert_eq!(slot.next_attempt(), 1);
    }

    #[test]
    fn trigger_while_offline_is_suppressed() {
        let mut slot = KeySlot::new(CEILING);
        let action = slot.on_trigger(SchedulePolicy::Replace, Unavailable);
        assert_eq!(action, TriggerAction::Suppressed);
        assert_eq!(slot.phase(), JobPhase::Idle);
    }

    #[test]
    fn keep_existing_absorbs_trigger_while_running() {
        let (mut slot, _) = running_slot();
        let action = slot.on_trigger(SchedulePolicy::KeepExisting, Available);
        assert_eq!(action, TriggerAction::Keep);
        assert_eq!(slot.phase(), JobPhase::Running);
        assert!(!slot.has_queued_replacement());
    }

    #[test]
    fn replace_while_running_queues_replacement() {
        let (mut slot, generation) = running_slot();
        let action = slot.on_trigger(SchedulePolicy::Replace, Available);
        assert_eq!(action, TriggerAction::QueueReplacement);
        assert_eq!(slot.phase(), JobPhase::Running);
        assert_eq!(slot.generation(), generation);
        assert!(slot.has_queued_replacement());
    }

    #[test]
    fn replace_while_retry_pending_starts_new_lifetime() {
        let (mut slot, generation) = running_slot();
        slot.on_completion(generation, &SyncOutcome::Retry { attempt: 1 }, Available);
        assert_eq!(slot.phase(), JobPhase::RetryPending);

        let action = slot.on_trigger(SchedulePolicy::Replace, Available);
        assert_eq!(
            action,
            TriggerAction::Start {
                generation: generation + 1
            }
        );
        // Fresh lifetime: the attempt counter starts over.
        assert_eq!(slot.next_attempt(), 1);
    }

    #[test]
    fn success_settles_back_to_idle() {
        let (mut slot, generation) = running_slot();
        let action = slot.on_completion(generation, &SyncOutcome::Success, Available);
        assert_eq!(action, CompletionAction::Settled);
        assert_eq!(slot.phase(), JobPhase::Idle);
        assert_eq!(slot.attempts(), 0);
    }

    #[test]
    fn permanent_failure_settles_to_failed() {
        let (mut slot, generation) = running_slot();
        let outcome = SyncOutcome::Failure {
            reason: "bad request".to_string(),
        };
        let action = slot.on_completion(generation, &outcome, Available);
        assert_eq!(action, CompletionAction::Settled);
        assert_eq!(slot.phase(), JobPhase::Failed);
    }

    #[test]
    fn failed_slot_accepts_a_new_trigger() {
        let (mut slot, generation) = running_slot();
        let outcome = SyncOutcome::Failure {
            reason: "bad request".to_string(),
        };
        slot.on_completion(generation, &outcome, Available);

        let action = slot.on_trigger(SchedulePolicy::Replace, Available);
        assert!(matches!(action, TriggerAction::Start { .. }));
        assert_eq!(slot.next_attempt(), 1);
    }

    #[test]
    fn retries_below_ceiling_are_rescheduled() {
        let (mut slot, generation) = running_slot();
        for attempt in 1..CEILING {
            let action =
                slot.on_completion(generation, &SyncOutcome::Retry { attempt }, Available);
            assert_eq!(action, CompletionAction::ScheduleRetry { attempt });
            assert_eq!(slot.phase(), JobPhase::RetryPending);
            assert_eq!(slot.next_attempt(), attempt + 1);
            assert_eq!(slot.begin_retry(), Some(generation));
            slot.mark_running();
        }
    }

    #[test]
    fn retry_at_ceiling_exhausts_the_slot() {
        let (mut slot, generation) = running_slot();
        let action = slot.on_completion(
            generation,
            &SyncOutcome::Retry { attempt: CEILING },
            Available,
        );
        assert_eq!(action, CompletionAction::Exhausted);
        assert_eq!(slot.phase(), JobPhase::Failed);
    }

    #[test]
    fn retry_one_below_ceiling_is_not_exhausted() {
        let (mut slot, generation) = running_slot();
        let action = slot.on_completion(
            generation,
            &SyncOutcome::Retry {
                attempt: CEILING - 1,
            },
            Available,
        );
        assert_eq!(
            action,
            CompletionAction::ScheduleRetry {
                attempt: CEILING - 1
            }
        );
    }

    #[test]
    fn unavailable_cancels_a_scheduled_job() {
        let mut slot = KeySlot::new(CEILING);
        slot.on_trigger(SchedulePolicy::Replace, Available);
        assert_eq!(slot.phase(), JobPhase::Scheduled);

        let action = slot.on_unavailable();
        assert_eq!(action, CancelAction::CancelledPending);
        assert_eq!(slot.phase(), JobPhase::Idle);
        // Dropped before it started, so no retry may fire later.
        assert_eq!(slot.begin_retry(), None);
    }

    #[test]
    fn unavailable_cancels_a_pending_retry() {
        let (mut slot, generation) = running_slot();
        slot.on_completion(generation, &SyncOutcome::Retry { attempt: 1 }, Available);
        assert_eq!(slot.phase(), JobPhase::RetryPending);

        let action = slot.on_unavailable();
        assert_eq!(action, CancelAction::CancelledPending);
        assert_eq!(slot.phase(), JobPhase::Idle);
        assert_eq!(slot.attempts(), 0);
    }

    #[test]
    fn unavailable_leaves_a_running_execution_alone() {
        let (mut slot, generation) = running_slot();
        let action = slot.on_unavailable();
        assert_eq!(action, CancelAction::RunningUntouched);
        assert_eq!(slot.phase(), JobPhase::Running);

        // The execution finishes offline; its outcome still lands.
        let completed = slot.on_completion(generation, &SyncOutcome::Success, Unavailable);
        assert_eq!(completed, CompletionAction::Settled);
        assert_eq!(slot.phase(), JobPhase::Idle);
    }

    #[test]
    fn retry_completing_offline_settles_to_idle() {
        let (mut slot, generation) = running_slot();
        let action =
            slot.on_completion(generation, &SyncOutcome::Retry { attempt: 1 }, Unavailable);
        assert_eq!(action, CompletionAction::Settled);
        assert_eq!(slot.phase(), JobPhase::Idle);
        assert_eq!(slot.attempts(), 0);
    }

    #[test]
    fn unavailable_drops_a_queued_replacement() {
        let (mut slot, _) = running_slot();
        slot.on_trigger(SchedulePolicy::Replace, Available);
        assert!(slot.has_queued_replacement());

        let action = slot.on_unavailable();
        assert_eq!(action, CancelAction::DroppedReplacement);
        assert_eq!(slot.phase(), JobPhase::Running);
        assert!(!slot.has_queued_replacement());
    }

    #[test]
    fn queued_replacement_starts_after_completion() {
        let (mut slot, generation) = running_slot();
        slot.on_trigger(SchedulePolicy::Replace, Available);

        let action = slot.on_completion(generation, &SyncOutcome::Success, Available);
        assert_eq!(
            action,
            CompletionAction::StartReplacement {
                generation: generation + 1
            }
        );
        assert_eq!(slot.phase(), JobPhase::Scheduled);
        assert_eq!(slot.next_attempt(), 1);
    }

    #[test]
    fn stale_completion_changes_nothing() {
        let (mut slot, generation) = running_slot();
        slot.on_trigger(SchedulePolicy::Replace, Available);
        slot.on_completion(generation, &SyncOutcome::Success, Available);
        slot.mark_running();
        let current = slot.generation();

        // The superseded execution reports in late.
        let action = slot.on_completion(
            generation,
            &SyncOutcome::Failure {
                reason: "stale".to_string(),
            },
            Available,
        );
        assert_eq!(action, CompletionAction::Stale);
        assert_eq!(slot.phase(), JobPhase::Running);
        assert_eq!(slot.generation(), current);
    }

    #[test]
    fn cancel_detaches_a_running_execution() {
        let (mut slot, generation) = running_slot();
        let action = slot.on_cancel();
        assert_eq!(action, CancelAction::DetachedRunning);
        assert_eq!(slot.phase(), JobPhase::Idle);

        // The detached execution's completion is stale.
        let completed = slot.on_completion(generation, &SyncOutcome::Success, Available);
        assert_eq!(completed, CompletionAction::Stale);
        assert_eq!(slot.phase(), JobPhase::Idle);
    }

    #[test]
    fn cancel_resets_a_failed_slot() {
        let (mut slot, generation) = running_slot();
        let outcome = SyncOutcome::Failure {
            reason: "gone".to_string(),
        };
        slot.on_completion(generation, &outcome, Available);
        assert_eq!(slot.phase(), JobPhase::Failed);

        let action = slot.on_cancel();
        assert_eq!(action, CancelAction::Noop);
        assert_eq!(slot.phase(), JobPhase::Idle);
    }

    #[test]
    fn cancel_drops_a_pending_retry() {
        let (mut slot, generation) = running_slot();
        slot.on_completion(generation, &SyncOutcome::Retry { attempt: 2 }, Available);
        let action = slot.on_cancel();
        assert_eq!(action, CancelAction::CancelledPending);
        assert_eq!(slot.phase(), JobPhase::Idle);
        assert_eq!(slot.attempts(), 0);
    }
}
