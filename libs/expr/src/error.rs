//! Error types for job ad handling.

use thiserror::Error;

/// Errors that can occur when building a job ad from external input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdError {
    /// The input was not a JSON object.
    #[error("job ad must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// An attribute name was empty.
    #[error("job ad contains an empty attribute name")]
    EmptyAttributeName,
}
