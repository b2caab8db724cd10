//! Vocal Separator Backend Library
//!
//! This library exposes modules for testing and external use.
//! The main binary is in `src/main.rs`.

pub mod api;
pub mod config;
pub mod error;
pub mod executor;
pub mod separation;
pub mod services;
/// Application state management
///
/// Holds configuration and the separation service shared by handlers.
pub mod state;
