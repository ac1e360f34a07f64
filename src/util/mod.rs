//! Shared utilities

pub mod config;
pub mod context;
pub mod diagnostic;
pub mod fs;
pub mod process;

pub use config::{ConfigStore, HostEnv};
pub use context::BuildLayout;
pub use diagnostic::ConfigError;
