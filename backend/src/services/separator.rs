//! Separation service
//!
//! Runs one upload through the whole pipeline: admission, staging, the
//! separation backend, and output discovery.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};

use crate::config::{Config, StorageConfig};
use crate::error::AppError;
use crate::separation::{
    public_url, JobId, JobLimiter, JobWorkspace, SeparationBackend, StemFiles, StemLayout,
};
use crate::services::staging::StagingService;

/// An uploaded file as received from the client
#[derive(Debug, Clone)]
pub struct Upload {
    /// Client-supplied filename
    pub filename: String,
    /// File contents
    pub data: axum::body::Bytes,
}

/// Result of a successful separation
#[derive(Debug, Clone)]
pub struct SeparationOutcome {
    /// Job that produced the stems
    pub job_id: JobId,
    /// Files on disk
    pub files: StemFiles,
    /// Public URL of the vocals stem
    pub vocals_url: String,
    /// Public URL of the accompaniment stem
    pub accompaniment_url: String,
}

/// Coordinates separation jobs
pub struct SeparationService {
    storage: StorageConfig,
    layout: StemLayout,
    limiter: Option<JobLimiter>,
    backend: Arc<dyn SeparationBackend>,
    shutdown: CancellationToken,
}

impl SeparationService {
    /// Create a service running jobs on `backend`
    ///
    /// Cancelling `shutdown` cancels every job in flight.
    pub fn new(
        config: &Config,
        backend: Arc<dyn SeparationBackend>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            storage: config.storage.clone(),
            layout: StemLayout::new(
                config.separation.model.clone(),
                config.separation.output_format,
            ),
            limiter: JobLimiter::new(&config.execution),
            backend,
            shutdown,
        }
    }

    /// Separate one upload into vocals and accompaniment
    ///
    /// Dropping the returned future cancels the job and kills the running tool.
    pub async fn separate(&self, upload: Upload) -> Result<SeparationOutcome, AppError> {
        let filename = StagingService::sanitize_filename(&upload.filename)?;

        let _permit = match &self.limiter {
            Some(limiter) => Some(limiter.acquire().await?),
            None => None,
        };

        let workspace = JobWorkspace::new(JobId::generate(), &self.storage);
        let span = info_span!("separation_job", job_id = %workspace.id, filename = %filename);

        async {
            let started = Instant::now();
            let staged = StagingService::stage(&workspace, &filename, &upload.data).await?;

            let result = self.run(&workspace, &staged).await;

            if !self.storage.retain_uploads {
                StagingService::discard(&workspace, &staged).await;
            }

            if result.is_ok() {
                info!(
                    elapsed_ms = started.elapsed().as_millis(),
                    backend = self.backend.name(),
                    "Separation complete"
                );
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        workspace: &JobWorkspace,
        staged: &Path,
    ) -> Result<SeparationOutcome, AppError> {
        let cancel = self.shutdown.child_token();
        let _cancel_on_drop = cancel.clone().drop_guard();
        self.backend
            .separate(staged, &workspace.output_root, &cancel)
            .await?;

        let files = self.layout.locate(&workspace.output_root, staged).await?;

        let output_dir = self.storage.output_dir();
        let url_for = |path: &Path| {
            public_url(&output_dir, path).ok_or_else(|| {
                AppError::Internal(anyhow!(
                    "Stem {} is outside the outputs directory",
                    path.display()
                ))
            })
        };

        Ok(SeparationOutcome {
            job_id: workspace.id,
            vocals_url: url_for(&files.vocals)?,
            accompaniment_url: url_for(&files.accompaniment)?,
            files,
        })
    }
}
