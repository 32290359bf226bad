use std::time::{Duration, Instant};

use rand::Rng;
use tokio::time::sleep;
use tracing::debug;

use crate::domain::{Error, ExecutorError, StoreConnection, StoreTransaction};

/// Tuning knobs for `run`. The defaults mirror a cautious interactive
/// client: three attempts, 100ms base backoff, no overall deadline.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Overall wall-clock budget across all attempts and backoffs. Bounds
    /// what `max_attempts` alone cannot once the backoff grows large.
    pub deadline: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            deadline: None,
        }
    }
}

/// Backoff before retrying after the given attempt (1-indexed):
/// `(2^attempt) * base_delay * jitter`. Pure so it can be tested without
/// timers; callers sample the jitter factor from [0.5, 1.5).
pub fn backoff_delay(attempt: u32, base_delay: Duration, jitter: f64) -> Duration {
    // Cap the exponent: past this the deadline is what bounds the loop.
    let growth = (1u64 << attempt.min(16)) as f64;
    base_delay.mul_f64(growth * jitter)
}

/// Runs `work` inside a transaction on `conn`, retrying serialization
/// conflicts with exponential backoff up to `config.max_attempts`.
///
/// Each attempt begins a fresh transaction, so the work unit re-reads
/// current state and must not carry values across attempts. Validation and
/// store failures are never retried; rollback is guaranteed before any
/// error propagates. An expired `deadline` aborts the loop even mid-backoff.
pub async fn run<C, F>(conn: &mut C, mut work: F, config: &RetryConfig) -> Result<(), ExecutorError>
where
    C: StoreConnection,
    F: FnMut(&mut C::Tx) -> Result<(), Error>,
{
    let started = Instant::now();
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let outcome = match conn.begin() {
            Ok(mut tx) => match work(&mut tx) {
                Ok(()) => tx.commit(),
                Err(e) => {
                    tx.rollback();
                    Err(e)
                }
            },
            Err(e) => Err(e),
        };
        match outcome {
            Ok(()) => return Ok(()),
            Err(Error::Conflict) => {} // retry below
            Err(Error::Validation(reason)) => return Err(ExecutorError::ValidationFailed(reason)),
            Err(Error::Store(cause)) => return Err(ExecutorError::StoreError(cause)),
        }
        if attempt >= config.max_attempts {
            return Err(ExecutorError::ConflictExhausted { attempts: attempt });
        }
        let jitter = rand::thread_rng().gen_range(0.5..1.5);
        let delay = backoff_delay(attempt, config.base_delay, jitter);
        if let Some(deadline) = config.deadline {
            let remaining = deadline.saturating_sub(started.elapsed());
            if delay >= remaining {
                // Sleeping the full backoff would cross the deadline; wait
                // out the remaining budget and give up instead of retrying.
                sleep(remaining).await;
                return Err(ExecutorError::DeadlineExceeded { attempts: attempt });
            }
        }
        debug!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "serialization conflict, backing off"
        );
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::backoff_delay;
    use std::time::Duration;

    #[test]
    fn backoff_doubles_per_attempt() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff_delay(1, base, 1.0), Duration::from_millis(200));
        assert_eq!(backoff_delay(2, base, 1.0), Duration::from_millis(400));
        assert_eq!(backoff_delay(3, base, 1.0), Duration::from_millis(800));
    }

    #[test]
    fn jitter_scales_the_delay() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff_delay(1, base, 0.5), Duration::from_millis(100));
        assert_eq!(backoff_delay(1, base, 1.5), Duration::from_millis(300));
    }

    #[test]
    fn growth_is_capped_for_large_attempt_numbers() {
        let base = Duration::from_millis(1);
        assert_eq!(backoff_delay(16, base, 1.0), backoff_delay(40, base, 1.0));
    }
}
