//! Output layout of the separation tool
//!
//! Demucs writes two-stem results to
//! `<output_root>/<model>/<input stem>/{vocals,no_vocals}.<ext>`. Nothing in the
//! tool's interface advertises this, so every path lookup goes through
//! [`StemLayout`].

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

/// Stem isolated in two-stem mode
pub const TARGET_STEM: &str = "vocals";

/// File stem of the residual mix in two-stem mode
pub const RESIDUAL_STEM: &str = "no_vocals";

/// URL prefix the outputs directory is mounted under
pub const OUTPUTS_MOUNT: &str = "/outputs";

/// Audio encoding of the produced stems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StemFormat {
    /// Uncompressed WAV (tool default)
    #[default]
    Wav,
    /// MP3, requested with `--mp3`
    Mp3,
    /// FLAC, requested with `--flac`
    Flac,
}

impl StemFormat {
    /// File extension the tool uses for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Flac => "flac",
        }
    }

    /// Extra flag selecting this format, if any
    pub fn tool_flag(&self) -> Option<&'static str> {
        match self {
            Self::Wav => None,
            Self::Mp3 => Some("--mp3"),
            Self::Flac => Some("--flac"),
        }
    }
}

impl fmt::Display for StemFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for StemFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wav" => Ok(Self::Wav),
            "mp3" => Ok(Self::Mp3),
            "flac" => Ok(Self::Flac),
            other => Err(format!("unsupported stem format: {}", other)),
        }
    }
}

/// Located output files of one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StemFiles {
    /// Isolated vocals
    pub vocals: PathBuf,
    /// Everything except the vocals
    pub accompaniment: PathBuf,
}

/// Where the separation tool puts its results
#[derive(Debug, Clone)]
pub struct StemLayout {
    model: String,
    format: StemFormat,
}

impl StemLayout {
    /// Layout for the given model and output format
    pub fn new(model: impl Into<String>, format: StemFormat) -> Self {
        Self {
            model: model.into(),
            format,
        }
    }

    /// Model name used as the first path segment
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Output format of the stems
    pub fn format(&self) -> StemFormat {
        self.format
    }

    /// Directory holding the stems for `input`
    pub fn result_dir(&self, output_root: &Path, input: &Path) -> PathBuf {
        let track = input.file_stem().unwrap_or(input.as_os_str());
        output_root.join(&self.model).join(track)
    }

    /// Paths the tool is expected to produce for `input`
    pub fn expected(&self, output_root: &Path, input: &Path) -> StemFiles {
        let dir = self.result_dir(output_root, input);
        let ext = self.format.extension();
        StemFiles {
            vocals: dir.join(format!("{}.{}", TARGET_STEM, ext)),
            accompaniment: dir.join(format!("{}.{}", RESIDUAL_STEM, ext)),
        }
    }

    /// Expected paths for `input`, failing if either file is missing
    pub async fn locate(&self, output_root: &Path, input: &Path) -> Result<StemFiles, AppError> {
        let files = self.expected(output_root, input);

        for path in [&files.vocals, &files.accompaniment] {
            let present = tokio::fs::metadata(path)
                .await
                .map(|meta| meta.is_file())
                .unwrap_or(false);
            if !present {
                return Err(AppError::OutputNotFound(path.display().to_string()));
            }
        }

        Ok(files)
    }
}

/// URL under [`OUTPUTS_MOUNT`] for a file inside `outputs_dir`
///
/// Returns `None` when `file` is not inside `outputs_dir` or contains
/// non-UTF-8 or parent-directory components.
pub fn public_url(outputs_dir: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(outputs_dir).ok()?;

    let mut url = String::from(OUTPUTS_MOUNT);
    for component in relative.components() {
        match component {
            Component::Normal(segment) => {
                url.push('/');
                url.push_str(segment.to_str()?);
            }
            Component::CurDir => {}
            _ => return None,
        }
    }

    Some(url)
}
