//! Error types for site parsing.

use thiserror::Error;

/// Errors that can occur when parsing a site identifier.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SiteError {
    /// The site string is empty.
    #[error("site cannot be empty")]
    Empty,

    /// The site does not follow the `T<tier>_<CC>_<Name>` convention.
    #[error("invalid site '{value}': expected T<tier>_<country>_<name>")]
    InvalidFormat { value: String },
}

impl SiteError {
    /// Returns true if this error indicates the input was empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, SiteError::Empty)
    }
}
