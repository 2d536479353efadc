use thiserror::Error;

/// Error kind for rejected submissions and failed queue setup.
///
/// Submission errors are reported synchronously; when one is returned nothing
/// has been enqueued.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DispatchError {
    /// The submitted task carries no work.
    #[error("task carries no work")]
    InvalidArgument,
    /// The requested deadline cannot be represented as an `Instant`.
    #[error("deadline is out of the representable range")]
    DeadlineOutOfRange,
    /// A blocking submission's work was dropped before it signalled completion,
    /// typically because it panicked.
    #[error("work was dropped before signalling completion")]
    Abandoned,
    /// The worker pool could not be built.
    #[error("failed to build worker pool: {0}")]
    PoolBuild(String),
    /// The timer's alarm thread could not be started.
    #[error("failed to spawn alarm thread: {0}")]
    AlarmSpawn(String),
}
