//! Error types for policy parsing.

use thiserror::Error;

/// Errors that can occur when loading a policy document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// The document root was not a JSON object.
    #[error("policy document must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// The document is not valid JSON, or a category has the wrong shape.
    #[error("malformed policy document: {0}")]
    Malformed(String),

    /// A threshold key could not be read as a number.
    #[error("invalid {category} threshold {key:?}: expected a number")]
    InvalidThreshold { category: &'static str, key: String },
}

impl PolicyError {
    /// Returns true if the error came from a threshold key.
    pub fn is_threshold(&self) -> bool {
        matches!(self, PolicyError::InvalidThreshold { .. })
    }
}

impl From<serde_json::Error> for PolicyError {
    fn from(err: serde_json::Error) -> Self {
        PolicyError::Malformed(err.to_string())
    }
}
