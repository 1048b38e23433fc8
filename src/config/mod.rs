//! Configuration and policy validation
//!
//! Compiled-in defaults, the trusted override file, and allow-list linting.

pub mod loader;
pub mod types;
pub mod validator;

pub use loader::{load_config, load_config_from};
