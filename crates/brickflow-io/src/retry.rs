//! Nested retry policy for external volume-service calls.
//!
//! Two independent retry loops are nested: an inner loop retries any
//! failure a fixed number of times with a short pause, and an outer loop
//! only re-enters the inner loop when the final failure was transient,
//! pausing much longer first. A non-transient failure from the inner
//! loop propagates immediately without waiting for the outer pause.

use brickflow_core::{Error, Result};
use std::time::Duration;

/// Retry policy controlling the nested inner/outer retry loops.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub inner_attempts: u32,
    pub inner_pause: Duration,
    pub outer_attempts: u32,
    pub outer_pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            inner_attempts: 3,
            inner_pause: Duration::from_secs(60),
            outer_attempts: 2,
            outer_pause: Duration::from_secs(5 * 60),
        }
    }
}

/// Run `op`, retrying per `policy`. `op` is re-invoked from scratch on
/// every attempt — it must be idempotent.
///
/// # Errors
/// The last error encountered, or [`Error::RetriesExhausted`] if every
/// attempt across both loops failed transiently.
pub fn with_retry<T>(policy: &RetryPolicy, mut op: impl FnMut() -> Result<T>) -> Result<T> {
    let mut last_err: Option<Error> = None;
    let mut total_attempts = 0u32;

    for outer_attempt in 1..=policy.outer_attempts.max(1) {
        match run_inner(policy, &mut op, &mut total_attempts) {
            Ok(v) => return Ok(v),
            Err(e) => {
                let transient = e.is_transient();
                last_err = Some(e);
                if !transient {
                    return Err(last_err.expect("just set"));
                }
                if outer_attempt < policy.outer_attempts {
                    tracing::warn!(
                        outer_attempt,
                        pause_secs = policy.outer_pause.as_secs(),
                        "inner retries exhausted on a transient error, pausing before outer retry"
                    );
                    std::thread::sleep(policy.outer_pause);
                }
            }
        }
    }

    Err(Error::RetriesExhausted {
        attempts: total_attempts,
        source: last_err.map_or_else(|| "no attempts executed".to_string(), |e| e.to_string()),
    })
}

fn run_inner<T>(
    policy: &RetryPolicy,
    op: &mut impl FnMut() -> Result<T>,
    total_attempts: &mut u32,
) -> Result<T> {
    let mut last_err: Option<Error> = None;
    for attempt in 1..=policy.inner_attempts.max(1) {
        *total_attempts += 1;
        match op() {
            Ok(v) => return Ok(v),
            Err(e) => {
                if attempt < policy.inner_attempts {
                    tracing::warn!(attempt, error = %e, "retrying after failure");
                    std::thread::sleep(policy.inner_pause);
                }
                last_err = Some(e);
            }
        }
    }
    Err(last_err.expect("inner_attempts is at least 1"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Duration as StdDuration;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            inner_attempts: 3,
            inner_pause: StdDuration::from_millis(1),
            outer_attempts: 2,
            outer_pause: StdDuration::from_millis(1),
        }
    }

    #[test]
    fn succeeds_immediately_without_retrying() {
        let calls = Cell::new(0);
        let result = with_retry(&fast_policy(), || {
            calls.set(calls.get() + 1);
            Ok::<_, Error>(42)
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn non_transient_error_is_not_retried_across_outer_loop() {
        let calls = Cell::new(0);
        let result = with_retry::<()>(&fast_policy(), || {
            calls.set(calls.get() + 1);
            Err(Error::ContractViolation("bad input".into()))
        });
        assert!(result.is_err());
        // one full inner loop (3 attempts), then immediate propagation.
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn transient_error_exhausts_both_loops_then_escalates() {
        let calls = Cell::new(0);
        let result = with_retry::<()>(&fast_policy(), || {
            calls.set(calls.get() + 1);
            Err(Error::Transient("503".into()))
        });
        match result {
            Err(Error::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 6),
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
        assert_eq!(calls.get(), 6);
    }

    #[test]
    fn recovers_on_a_later_outer_attempt() {
        let calls = Cell::new(0);
        let result = with_retry(&fast_policy(), || {
            let n = calls.get() + 1;
            calls.set(n);
            if n <= 3 {
                Err(Error::Transient("503".into()))
            } else {
                Ok(99)
            }
        });
        assert_eq!(result.unwrap(), 99);
        assert_eq!(calls.get(), 4);
    }
}
