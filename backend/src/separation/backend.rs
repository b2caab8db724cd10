//! Separation backends
//!
//! A backend turns one staged input file into stems under an output root.
//! The production backend shells out to the Demucs CLI.

use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::layout::{StemFormat, TARGET_STEM};
use crate::config::Config;
use crate::executor::{CliExecutor, ExecutionError, Invocation};

/// Trait implemented by anything that can split a track into two stems
#[async_trait]
pub trait SeparationBackend: Send + Sync {
    /// Separate `input` into stems below `output_root`
    ///
    /// Must return only after the output files are complete, and must stop
    /// work promptly once `cancel` fires.
    async fn separate(
        &self,
        input: &Path,
        output_root: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), ExecutionError>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Backend that runs the Demucs command line tool
pub struct DemucsBackend {
    program: String,
    program_args: Vec<String>,
    model: String,
    format: StemFormat,
    executor: CliExecutor,
}

impl DemucsBackend {
    /// Build a backend from the separation and execution settings
    pub fn from_config(config: &Config) -> Self {
        Self {
            program: config.separation.program.clone(),
            program_args: config.separation.program_args.clone(),
            model: config.separation.model.clone(),
            format: config.separation.output_format,
            executor: CliExecutor::new(config.execution.job_timeout_secs),
        }
    }

    /// Command line for one separation run
    pub fn invocation(&self, input: &Path, output_root: &Path) -> Invocation {
        Invocation::new(&self.program)
            .args(&self.program_args)
            .arg(format!("--two-stems={}", TARGET_STEM))
            .args(["-n", self.model.as_str()])
            .arg("-o")
            .arg(output_root)
            .args(self.format.tool_flag())
            .arg(input)
    }
}

#[async_trait]
impl SeparationBackend for DemucsBackend {
    async fn separate(
        &self,
        input: &Path,
        output_root: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), ExecutionError> {
        let invocation = self.invocation(input, output_root);
        info!(command = %invocation, "Running separation tool");

        self.executor.run(&invocation, cancel).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.program
    }
}
