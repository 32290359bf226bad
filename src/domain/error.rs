/// Error raised inside a single transaction attempt, by the store or by the
/// work unit itself. The executor pattern-matches on the variant to decide
/// whether the attempt may be retried.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The store could not serialize this transaction against concurrent
    /// ones. The attempt's effects are discarded and it is safe to retry.
    #[error("serialization conflict")]
    Conflict,

    /// Business-rule violation. Re-running the same inputs would fail
    /// identically, so this is never retried.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Store failure unrelated to concurrency (connectivity, constraint).
    #[error("store failed: {0}")]
    Store(String),
}

/// Terminal outcome of an executor call, after retries are resolved.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("gave up after {attempts} conflicting attempts")]
    ConflictExhausted { attempts: u32 },

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("store failed: {0}")]
    StoreError(String),

    #[error("deadline exceeded after {attempts} attempts")]
    DeadlineExceeded { attempts: u32 },
}
