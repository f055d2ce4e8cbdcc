//! Synchronization errors

use thiserror::Error;
use void_inventory::ContainerId;

/// Protocol decoding failures.
///
/// These never reach the remote peer: the server drops the offending
/// request, the client drops the frame.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Slot payload truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Slot payload has {actual} bytes, container needs {expected}")]
    CapacityMismatch { expected: usize, actual: usize },

    #[error("Envelope error: {0}")]
    Envelope(#[from] bincode::Error),

    #[error("Unknown {0}")]
    UnknownContainer(ContainerId),
}

pub type SyncResult<T> = Result<T, SyncError>;
