//! CLI executor implementation
//!
//! Runs a command to completion, capturing its output, under an optional
//! timeout and a cancellation token.

use crate::executor::error::ExecutionError;
use std::ffi::OsString;
use std::fmt;
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// A fully resolved command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Executable to run
    pub program: String,
    /// Arguments in order
    pub args: Vec<OsString>,
}

impl Invocation {
    /// Create an invocation with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// CLI executor for running tool processes
pub struct CliExecutor {
    /// Upper bound on a single run; `None` waits forever
    timeout: Option<Duration>,
}

impl CliExecutor {
    /// Create a new CLI executor; a timeout of 0 disables the limit
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        }
    }

    /// Get the timeout duration
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run the invocation to completion
    ///
    /// The child is killed if the timeout elapses, the token is cancelled, or
    /// the returned future is dropped.
    ///
    /// # Returns
    /// * `Ok(Output)` - The captured output of a successful run
    /// * `Err(ExecutionError)` - If the run failed, timed out or was cancelled
    pub async fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> Result<Output, ExecutionError> {
        let program = invocation.program.clone();

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(command = %invocation, "Spawning process");

        let child = cmd.spawn().map_err(|source| {
            error!(program = %program, error = %source, "Failed to spawn process");
            ExecutionError::SpawnFailed {
                program: program.clone(),
                source,
            }
        })?;

        let started = Instant::now();
        let wait = async {
            let output = match self.timeout {
                Some(limit) => timeout(limit, child.wait_with_output())
                    .await
                    .map_err(|_| ExecutionError::Timeout(limit.as_secs()))?,
                None => child.wait_with_output().await,
            };
            output.map_err(|source| ExecutionError::WaitFailed {
                program: program.clone(),
                source,
            })
        };

        let output = tokio::select! {
            result = wait => result,
            _ = cancel.cancelled() => Err(ExecutionError::Cancelled),
        };

        let elapsed_ms = started.elapsed().as_millis();
        let output = match output {
            Ok(output) => output,
            Err(err) => {
                error!(program = %program, elapsed_ms = elapsed_ms, error = %err, "Process did not complete");
                return Err(err);
            }
        };

        if output.status.success() {
            info!(
                program = %program,
                elapsed_ms = elapsed_ms,
                stdout_len = output.stdout.len(),
                "Process completed successfully"
            );
            Ok(output)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            let exit_code = output.status.code().unwrap_or(-1);

            error!(
                program = %program,
                exit_code = exit_code,
                stderr = %stderr,
                "Process execution failed"
            );

            Err(ExecutionError::ProcessFailed {
                program,
                exit_code,
                stderr,
            })
        }
    }
}
