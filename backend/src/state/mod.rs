// State management module
// Holds configuration and the separation service shared across requests

pub mod app_state;

pub use app_state::AppState;
