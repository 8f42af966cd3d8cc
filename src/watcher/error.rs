//! Error types for the directory watcher.

use thiserror::Error;

/// Errors from watcher setup and operation.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("none of the configured roots could be watched")]
    NoWatchableRoots,

    #[error("event channel closed unexpectedly")]
    ChannelClosed,
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}
