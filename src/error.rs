use thiserror::Error;

use crate::future::FutureId;

/// Errors produced by the crate itself.
///
/// Futures are generic over their rejection reason, so any reason type that
/// implements `From<Error>` can carry these. `Error` is also a perfectly good
/// reason type on its own and is the default for [Future](crate::Future).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A future was resolved with itself, directly or through a handler
    /// returning its own downstream future.
    #[error("chaining cycle detected for future {0}")]
    ChainingCycle(FutureId),

    /// [Executor::block_on](crate::task::Executor::block_on) ran out of
    /// queued work while the future was still pending.
    #[error("future {0} can never settle: the microtask queue is empty")]
    Stalled(FutureId),

    /// A plain textual rejection reason.
    #[error("{0}")]
    Reason(String),
}

impl From<&str> for Error {
    fn from(reason: &str) -> Self {
        Self::Reason(reason.to_owned())
    }
}

impl From<String> for Error {
    fn from(reason: String) -> Self {
        Self::Reason(reason)
    }
}
