//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::{BlacklistConfig, Config};
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("blacklist.db_path is required")]
    MissingDatabasePath,
    #[error("blacklist.db_path parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
    #[error("blacklist.dynamic.period_seconds must be greater than 0")]
    ZeroPeriod,
    #[error("blacklist.dynamic.rate_limit_threshold must be greater than 0")]
    ZeroThreshold,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    validate_blacklist(&config.blacklist)
}

/// Validate the filter section on its own.
pub fn validate_blacklist(config: &BlacklistConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let db_path = config.db_path.trim();
    if db_path.is_empty() {
        errors.push(ValidationError::MissingDatabasePath);
    } else if db_path != ":memory:"
        && let Some(parent) = Path::new(db_path).parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        errors.push(ValidationError::DatabasePathInvalid(config.db_path.clone()));
    }

    if config.dynamic.enabled {
        if config.dynamic.period_seconds == 0 {
            errors.push(ValidationError::ZeroPeriod);
        }
        if config.dynamic.rate_limit_threshold == 0 {
            errors.push(ValidationError::ZeroThreshold);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DynamicBlacklistConfig;

    fn config(db_path: &str) -> BlacklistConfig {
        BlacklistConfig {
            static_blacklist: Vec::new(),
            dynamic: DynamicBlacklistConfig::default(),
            real_ip_depth: 0,
            db_path: db_path.to_string(),
        }
    }

    #[test]
    fn memory_database_is_valid() {
        assert!(validate_blacklist(&config(":memory:")).is_ok());
    }

    #[test]
    fn bare_filename_is_valid() {
        assert!(validate_blacklist(&config("ipblacklist.db")).is_ok());
    }

    #[test]
    fn empty_path_is_rejected() {
        assert_eq!(
            validate_blacklist(&config("  ")).unwrap_err(),
            vec![ValidationError::MissingDatabasePath]
        );
    }

    #[test]
    fn missing_parent_is_rejected() {
        let errors = validate_blacklist(&config("/nonexistent/dir/bl.db")).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::DatabasePathInvalid("/nonexistent/dir/bl.db".into())]
        );
    }

    #[test]
    fn zero_values_only_matter_when_enabled() {
        let mut cfg = config(":memory:");
        cfg.dynamic.period_seconds = 0;
        cfg.dynamic.rate_limit_threshold = 0;
        assert!(validate_blacklist(&cfg).is_ok());

        cfg.dynamic.enabled = true;
        assert_eq!(
            validate_blacklist(&cfg).unwrap_err(),
            vec![ValidationError::ZeroPeriod, ValidationError::ZeroThreshold]
        );
    }

    #[test]
    fn all_errors_are_collected() {
        let mut cfg = config("");
        cfg.dynamic.enabled = true;
        cfg.dynamic.period_seconds = 0;
        assert_eq!(validate_blacklist(&cfg).unwrap_err().len(), 2);
    }
}
