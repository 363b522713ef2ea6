//! Error types for the runner crate.

use std::io;

use thiserror::Error;

/// Ways a runner can end up `Failed`.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The process could not be started.
    #[error("failed to start '{program}': {source}")]
    Spawn {
        /// Program that failed to launch.
        program: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The process ran and exited unsuccessfully.
    #[error("{0}")]
    Exit(std::process::ExitStatus),

    /// The process was terminated by `cancel()`.
    #[error("canceled")]
    Canceled,

    /// I/O error while waiting on the process.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl RunnerError {
    /// True if this failure came from `cancel()`.
    pub fn is_canceled(&self) -> bool {
        matches!(self, RunnerError::Canceled)
    }

    /// Exit code, if the process exited on its own with one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RunnerError::Exit(status) => status.code(),
            _ => None,
        }
    }
}

/// Result type for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;
