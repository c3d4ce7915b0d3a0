//! Errors raised while constructing the filter.
//!
//! Everything on the request path degrades instead of failing: lookup errors
//! fail open and accounting errors are logged and dropped, so these are the
//! only errors a caller ever sees.

use crate::config::ValidationError;
use crate::db::DbError;
use thiserror::Error;

/// Fatal filter initialization errors.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("invalid configuration: {}", join_errors(.0))]
    Config(Vec<ValidationError>),

    #[error("failed to open blacklist database: {0}")]
    Database(#[from] DbError),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
