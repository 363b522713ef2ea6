//! Error types for the nix crate.

use thiserror::Error;

/// Errors that can occur evaluating nix expressions.
#[derive(Debug, Error)]
pub enum NixError {
    /// nix is not installed or not in PATH.
    #[error("nix not found in PATH")]
    NotFound,

    /// The nix process could not be run.
    #[error("failed to run nix: {0}")]
    Io(#[from] std::io::Error),

    /// Evaluation failed.
    #[error("nix run failed: {status}\n\nScript:\n{script}\n\nOutput:\n{stderr}")]
    Eval {
        status: std::process::ExitStatus,
        script: String,
        stderr: String,
    },

    /// Evaluation succeeded but produced unexpected JSON.
    #[error("nix decode failed: {source}\n\nJSON output:\n{output}")]
    Decode {
        #[source]
        source: serde_json::Error,
        output: String,
    },
}

/// Result type for nix operations.
pub type Result<T> = std::result::Result<T, NixError>;
