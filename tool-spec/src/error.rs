//! Error types for the specification model.

use thiserror::Error;

/// Result type alias for specification operations.
pub type Result<T> = std::result::Result<T, SpecError>;

/// Errors that can occur while decoding or editing a specification.
#[derive(Error, Debug)]
pub enum SpecError {
    /// The record does not decode into a tool specification.
    #[error("invalid tool specification: {0}")]
    InvalidDocument(#[from] serde_json::Error),

    /// Projection field not present.
    #[error("projection field not found: {0}")]
    ProjectionFieldNotFound(String),

    /// Parameter index outside the parameter list.
    #[error("parameter index out of range: {0}")]
    ParameterIndexOutOfRange(usize),
}
