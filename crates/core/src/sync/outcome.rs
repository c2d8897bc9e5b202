//! Outcome classification for failed executions

use brigade_domain::{ErrorClass, SyncOutcome};

/// Classify one failed execution into its outcome.
///
/// `attempt` is the 1-based number of the execution that just failed and
/// `ceiling` is the maximum number of transient failures tolerated per job
/// lifetime. A transient failure within the ceiling yields
/// [`SyncOutcome::Retry`]; beyond it, or on any permanent failure, the
/// outcome is [`SyncOutcome::Failure`]. Total over all inputs, so callers
/// that drive executions directly get a defined answer even past the
/// ceiling.
#[must_use]
pub fn classify_failure(
    class: ErrorClass,
    attempt: u32,
    ceiling: u32,
    reason: impl Into<String>,
) -> SyncOutcome {
    match class {
        ErrorClass::Permanent => SyncOutcome::Failure {
            reason: reason.into(),
        },
        ErrorClass::Transient if attempt > ceiling => SyncOutcome::Failure {
            reason: format!(
                "retry ceiling of {ceiling} exhausted on attempt {attempt}: {}",
                reason.into()
            ),
        },
        ErrorClass::Transient => SyncOutcome::Retry { attempt },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_failure_within_ceiling_retries() {
        let outcome = classify_failure(ErrorClass::Transient, 1, 3, "connection reset");
        assert_eq!(outcome, SyncOutcome::Retry { attempt: 1 });
    }

    #[test]
    fn transient_failure_at_ceiling_still_retries() {
        // Exactly `ceiling` failures are tolerated; the scheduler turns the
        // last recorded retry into a terminal failure.
        let outcome = classify_failure(ErrorClass::Transient, 3, 3, "timeout");
        assert_eq!(outcome, SyncOutcome::Retry { attempt: 3 });
    }

    #[test]
    fn transient_failure_past_ceiling_fails() {
        let outcome = classify_failure(ErrorClass::Transient, 4, 3, "timeout");
        assert!(matches!(outcome, SyncOutcome::Failure { .. }));
    }

    #[test]
    fn permanent_failure_never_retries() {
        let outcome = classify_failure(ErrorClass::Permanent, 1, 3, "404 not found");
        assert_eq!(
            outcome,
            SyncOutcome::Failure {
                reason: "404 not found".to_string()
            }
        );
    }
}
