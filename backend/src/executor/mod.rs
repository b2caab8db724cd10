//! Tool execution module
//!
//! This module runs external command line tools.
//! It handles process spawning, output capture, timeout management, and cancellation.

pub mod cli;
pub mod error;

pub use cli::{CliExecutor, Invocation};
pub use error::ExecutionError;
