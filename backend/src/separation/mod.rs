//! Audio stem separation
//!
//! Everything the service knows about separation jobs: how they are admitted,
//! where they stage and write, which backend runs them, and where the tool
//! leaves its results.

pub mod backend;
pub mod job;
pub mod layout;
pub mod limiter;

pub use backend::{DemucsBackend, SeparationBackend};
pub use job::{JobId, JobWorkspace};
pub use layout::{public_url, StemFiles, StemFormat, StemLayout};
pub use limiter::{JobLimiter, JobPermit};
