//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use crate::separation::StemFormat;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

/// Name of the staging directory under the base directory
pub const TEMP_DIR_NAME: &str = "temp";

/// Name of the outputs directory under the base directory
pub const OUTPUT_DIR_NAME: &str = "outputs";

/// Application configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Staging and output directory configuration
    pub storage: StorageConfig,
    /// External separation tool configuration
    pub separation: SeparationConfig,
    /// Job admission and execution limits
    pub execution: ExecutionConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
    /// Maximum accepted request body size in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            host: "0.0.0.0".to_string(),
            max_upload_bytes: 512 * 1024 * 1024,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory holding `temp/` and `outputs/`
    pub base_dir: PathBuf,
    /// Give every job its own staging and output directory
    pub isolate_jobs: bool,
    /// Keep staged uploads after the job finishes
    pub retain_uploads: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            isolate_jobs: true,
            retain_uploads: true,
        }
    }
}

impl StorageConfig {
    /// Directory uploads are staged into
    pub fn temp_dir(&self) -> PathBuf {
        self.base_dir.join(TEMP_DIR_NAME)
    }

    /// Directory the separation tool writes into, served under `/outputs`
    pub fn output_dir(&self) -> PathBuf {
        self.base_dir.join(OUTPUT_DIR_NAME)
    }
}

/// Separation tool configuration
#[derive(Debug, Clone)]
pub struct SeparationConfig {
    /// Executable to run (e.g. `demucs` or `python3`)
    pub program: String,
    /// Arguments placed before the separation flags (e.g. `-m demucs`)
    pub program_args: Vec<String>,
    /// Model name passed with `-n`; also the first output path segment
    pub model: String,
    /// Encoding of the produced stems
    pub output_format: StemFormat,
}

impl Default for SeparationConfig {
    fn default() -> Self {
        Self {
            program: "demucs".to_string(),
            program_args: Vec::new(),
            model: "htdemucs".to_string(),
            output_format: StemFormat::Wav,
        }
    }
}

impl SeparationConfig {
    /// Split a command line such as `python3 -m demucs` into program and leading args
    ///
    /// Returns `None` for a blank command line.
    pub fn parse_command(command: &str) -> Option<(String, Vec<String>)> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some((program, parts.collect()))
    }
}

/// Execution configuration
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Separation jobs allowed to run at once (0 = unlimited)
    pub max_concurrent_jobs: usize,
    /// Jobs allowed to wait for a slot (0 = unlimited)
    pub max_waiting_jobs: usize,
    /// How long a job waits for a slot before being rejected (0 = no waiting)
    pub queue_wait_secs: u64,
    /// Upper bound on a single tool run (0 = no timeout)
    pub job_timeout_secs: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            max_waiting_jobs: 16,
            queue_wait_secs: 300,
            job_timeout_secs: 0,
        }
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup with defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let (program, program_args) = lookup("SEPARATOR_COMMAND")
            .and_then(|command| SeparationConfig::parse_command(&command))
            .unwrap_or((
                defaults.separation.program.clone(),
                defaults.separation.program_args.clone(),
            ));

        Self {
            server: ServerConfig {
                port: parse_or(&lookup, "PORT", defaults.server.port),
                host: lookup("HOST").unwrap_or(defaults.server.host),
                max_upload_bytes: parse_or(
                    &lookup,
                    "SEPARATOR_MAX_UPLOAD_BYTES",
                    defaults.server.max_upload_bytes,
                ),
            },
            storage: StorageConfig {
                base_dir: lookup("SEPARATOR_BASE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.base_dir),
                isolate_jobs: parse_or(
                    &lookup,
                    "SEPARATOR_ISOLATE_JOBS",
                    defaults.storage.isolate_jobs,
                ),
                retain_uploads: parse_or(
                    &lookup,
                    "SEPARATOR_RETAIN_UPLOADS",
                    defaults.storage.retain_uploads,
                ),
            },
            separation: SeparationConfig {
                program,
                program_args,
                model: lookup("SEPARATOR_MODEL")
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or(defaults.separation.model),
                output_format: parse_or(
                    &lookup,
                    "SEPARATOR_OUTPUT_FORMAT",
                    defaults.separation.output_format,
                ),
            },
            execution: ExecutionConfig {
                max_concurrent_jobs: parse_or(
                    &lookup,
                    "SEPARATOR_MAX_CONCURRENT_JOBS",
                    defaults.execution.max_concurrent_jobs,
                ),
                max_waiting_jobs: parse_or(
                    &lookup,
                    "SEPARATOR_MAX_WAITING_JOBS",
                    defaults.execution.max_waiting_jobs,
                ),
                queue_wait_secs: parse_or(
                    &lookup,
                    "SEPARATOR_QUEUE_WAIT_SECS",
                    defaults.execution.queue_wait_secs,
                ),
                job_timeout_secs: parse_or(
                    &lookup,
                    "SEPARATOR_JOB_TIMEOUT_SECS",
                    defaults.execution.job_timeout_secs,
                ),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Parse `key` from the lookup, falling back to `default` when unset or invalid
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key = key, value = %raw, "Ignoring invalid configuration value");
                default
            }
        },
        None => default,
    }
}
