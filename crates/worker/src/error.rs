//! Errors raised by the host side of swcache.

use swcache_core::Error;

use crate::lifecycle::WorkerState;

/// Failures a host reports for a worker or its transport.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The install phase failed; the worker never becomes active.
    #[error("INSTALL_FAILED: {0}")]
    InstallFailed(#[source] Error),

    /// A lifecycle step was requested out of order.
    #[error("INVALID_STATE: expected {expected}, worker is {actual}")]
    InvalidState { expected: WorkerState, actual: WorkerState },

    /// An event line could not be understood.
    #[error("INVALID_EVENT: {0}")]
    InvalidEvent(String),
}
