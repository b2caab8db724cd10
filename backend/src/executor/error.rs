//! Execution-specific error types
//!
//! Errors that can occur while running the separation tool (spawning, timeouts, etc.)

use thiserror::Error;

/// Errors that can occur while running the separation tool
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// Process exited with a non-zero status; `stderr` is kept verbatim
    #[error("Demucs failed: {stderr}")]
    ProcessFailed {
        /// Program that was run
        program: String,
        /// Exit code, or -1 when terminated by a signal
        exit_code: i32,
        /// Captured standard error
        stderr: String,
    },

    /// Failed to spawn the process (e.g., command not found, permission denied)
    #[error("Failed to start {program}: {source}")]
    SpawnFailed {
        /// Program that could not be started
        program: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the running process failed
    #[error("Failed to collect output of {program}: {source}")]
    WaitFailed {
        /// Program being waited on
        program: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Command execution exceeded the timeout limit
    #[error("Separation timed out after {0} seconds")]
    Timeout(u64),

    /// The job was cancelled (client disconnect or server shutdown)
    #[error("Separation cancelled")]
    Cancelled,
}
