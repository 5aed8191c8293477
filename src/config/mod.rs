//! Configuration Management
//!
//! Layered configuration resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/reportforge/config.toml)
//! 3. Project config (.reportforge/config.toml)
//! 4. Environment variables (REPORTFORGE_*)
//! 5. CLI arguments (highest priority)
//!
//! Credentials never live in config files. They are read from the
//! environment (or a `.env` file) when providers are constructed.

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
