//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Top-level config struct definitions (Config, ServerConfig)
//! - [`blacklist`]: Filter configuration (BlacklistConfig, DynamicBlacklistConfig)
//! - [`validation`]: Startup validation (ValidationError)

mod blacklist;
mod types;
mod validation;

pub use blacklist::{BlacklistConfig, DynamicBlacklistConfig};
pub use types::{Config, ConfigError, ServerConfig};
pub use validation::{ValidationError, validate, validate_blacklist};
