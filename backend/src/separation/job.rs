//! Separation job identity and working directories

use crate::config::StorageConfig;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Unique identifier of a separation job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(Uuid);

impl JobId {
    /// Generate a new unique ID
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Directories one job stages into and writes results under
#[derive(Debug, Clone)]
pub struct JobWorkspace {
    /// Job this workspace belongs to
    pub id: JobId,
    /// Where the upload is written
    pub staging_dir: PathBuf,
    /// Passed to the tool as its output root
    pub output_root: PathBuf,
    /// Whether both directories are private to this job
    pub isolated: bool,
}

impl JobWorkspace {
    /// Workspace for `id` under the configured storage directories
    ///
    /// Without isolation every job shares `temp/` and `outputs/`, so two uploads
    /// with the same filename overwrite each other.
    pub fn new(id: JobId, storage: &StorageConfig) -> Self {
        let (staging_dir, output_root) = if storage.isolate_jobs {
            let segment = id.to_string();
            (
                storage.temp_dir().join(&segment),
                storage.output_dir().join(&segment),
            )
        } else {
            (storage.temp_dir(), storage.output_dir())
        };

        Self {
            id,
            staging_dir,
            output_root,
            isolated: storage.isolate_jobs,
        }
    }
}
