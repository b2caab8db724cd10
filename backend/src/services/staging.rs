//! Upload staging service
//!
//! Writes uploaded bytes into a job's staging directory and prepares the
//! directories the separation tool writes into.

use crate::config::StorageConfig;
use crate::error::AppError;
use crate::separation::JobWorkspace;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Upload staging service
pub struct StagingService;

impl StagingService {
    /// Create the staging and output directories if absent
    pub async fn ensure_directories(storage: &StorageConfig) -> std::io::Result<()> {
        for dir in [storage.temp_dir(), storage.output_dir()] {
            fs::create_dir_all(&dir).await?;
            debug!(path = %dir.display(), "Ensured directory");
        }
        Ok(())
    }

    /// Reduce a client-supplied filename to its final path component
    ///
    /// Both `/` and `\` are treated as separators, so `../../x.mp3` and
    /// `C:\music\x.mp3` both stage as `x.mp3`.
    ///
    /// # Returns
    /// * `Ok(String)` - A filename safe to join onto the staging directory
    /// * `Err(AppError)` - If nothing usable remains
    pub fn sanitize_filename(raw: &str) -> Result<String, AppError> {
        let name = raw.rsplit(['/', '\\']).next().unwrap_or("").trim();

        if name.is_empty() || name == "." || name == ".." {
            return Err(AppError::InvalidUpload(format!(
                "Unusable upload filename: {:?}",
                raw
            )));
        }

        Ok(name.to_string())
    }

    /// Write `data` to `<staging_dir>/<filename>`, replacing any existing file
    ///
    /// Also creates the workspace's output root so the tool can write into it.
    ///
    /// # Returns
    /// * `Ok(PathBuf)` - Path of the staged file
    /// * `Err(AppError)` - If a directory or the file could not be written
    pub async fn stage(
        workspace: &JobWorkspace,
        filename: &str,
        data: &[u8],
    ) -> Result<PathBuf, AppError> {
        for dir in [&workspace.staging_dir, &workspace.output_root] {
            fs::create_dir_all(dir).await.map_err(|e| {
                AppError::Staging(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }

        let path = workspace.staging_dir.join(filename);
        let write_err =
            |e: std::io::Error| AppError::Staging(format!("{}: {}", path.display(), e));

        let mut file = fs::File::create(&path).await.map_err(write_err)?;
        file.write_all(data).await.map_err(write_err)?;
        file.sync_all().await.map_err(write_err)?;

        info!(
            job_id = %workspace.id,
            path = %path.display(),
            bytes = data.len(),
            "Staged upload"
        );

        Ok(path)
    }

    /// Remove a staged upload once its job is finished
    ///
    /// Isolated workspaces drop their whole staging directory. Failures are
    /// logged, not returned.
    pub async fn discard(workspace: &JobWorkspace, staged: &Path) {
        let result = if workspace.isolated {
            fs::remove_dir_all(&workspace.staging_dir).await
        } else {
            fs::remove_file(staged).await
        };

        match result {
            Ok(()) => debug!(job_id = %workspace.id, "Removed staged upload"),
            Err(e) => warn!(
                job_id = %workspace.id,
                path = %staged.display(),
                error = %e,
                "Failed to clean up staged upload"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::separation::JobId;
    use tempfile::tempdir;

    fn storage(base: &Path, isolate_jobs: bool) -> StorageConfig {
        StorageConfig {
            base_dir: base.to_path_buf(),
            isolate_jobs,
            retain_uploads: true,
        }
    }

    #[test]
    fn test_sanitize_keeps_plain_names() {
        assert_eq!(
            StagingService::sanitize_filename("my song.mp3").unwrap(),
            "my song.mp3"
        );
    }

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(
            StagingService::sanitize_filename("../../etc/passwd.mp3").unwrap(),
            "passwd.mp3"
        );
        assert_eq!(
            StagingService::sanitize_filename("C:\\Music\\track.flac").unwrap(),
            "track.flac"
        );
    }

    #[test]
    fn test_sanitize_rejects_empty_names() {
        for raw in ["", "   ", "uploads/", "..", "a/.."] {
            match StagingService::sanitize_filename(raw) {
                Err(AppError::InvalidUpload(_)) => {}
                other => panic!("Expected InvalidUpload for {:?}, got: {:?}", raw, other),
            }
        }
    }

    #[tokio::test]
    async fn test_ensure_directories_creates_both() {
        let base = tempdir().expect("Failed to create temp dir");
        let storage = storage(base.path(), false);

        StagingService::ensure_directories(&storage)
            .await
            .expect("Failed to create directories");

        assert!(storage.temp_dir().is_dir());
        assert!(storage.output_dir().is_dir());
    }

    #[tokio::test]
    async fn test_stage_overwrites_same_filename() {
        let base = tempdir().expect("Failed to create temp dir");
        let storage = storage(base.path(), false);

        let first = JobWorkspace::new(JobId::generate(), &storage);
        let second = JobWorkspace::new(JobId::generate(), &storage);

        let path_a = StagingService::stage(&first, "song.mp3", b"first upload")
            .await
            .expect("Failed to stage first upload");
        let path_b = StagingService::stage(&second, "song.mp3", b"second")
            .await
            .expect("Failed to stage second upload");

        assert_eq!(path_a, path_b);
        assert_eq!(path_a, base.path().join("temp").join("song.mp3"));
        assert_eq!(std::fs::read(&path_a).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_discard_isolated_workspace_removes_directory() {
        let base = tempdir().expect("Failed to create temp dir");
        let storage = storage(base.path(), true);
        let workspace = JobWorkspace::new(JobId::generate(), &storage);

        let staged = StagingService::stage(&workspace, "song.mp3", b"audio")
            .await
            .expect("Failed to stage upload");
        assert!(workspace.output_root.is_dir());

        StagingService::discard(&workspace, &staged).await;

        assert!(!workspace.staging_dir.exists());
        assert!(workspace.output_root.is_dir());
    }
}
