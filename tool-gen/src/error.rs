//! Error types for the tool generation system.

use thiserror::Error;
use toolsmith_spec::{ObjectKind, SpecError};

/// Result type alias for generation operations.
pub type Result<T> = std::result::Result<T, GenerationError>;

/// Errors surfaced by the generation orchestrator.
///
/// Every variant is terminal for the current call; nothing here is retried.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// Required caller input missing.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Sampling returned no documents.
    #[error("no documents found in {kind} \"{name}\"")]
    NotFound { kind: ObjectKind, name: String },

    /// A sample or text-generation provider call failed.
    #[error("upstream provider failed: {0}")]
    Upstream(#[from] ProviderError),

    /// Generated output could not be turned into a specification, even after
    /// fenced block recovery. Callers may offer to regenerate.
    #[error("failed to parse generated specification: {0}")]
    GenerationParse(String),
}

/// Errors raised by external collaborators.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Provider not configured (missing API key, missing sample source).
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// API request failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// Object or database name unusable by the provider.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Invalid response from provider.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for catalog operations.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Errors raised by the tool catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Entry not found.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// Identifier unusable as a catalog key.
    #[error("invalid tool id: {0}")]
    InvalidId(String),

    /// Import payload is neither a tool nor a list of tools.
    #[error("invalid import: {0}")]
    InvalidImport(String),

    /// Stored record is not a valid specification.
    #[error("invalid stored tool: {0}")]
    Spec(#[from] SpecError),

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to create storage directory.
    #[error("failed to create directory: {0}")]
    CreateDirectory(String),

    /// Failed to read tool file.
    #[error("failed to read file: {0}")]
    ReadFile(String),

    /// Failed to write tool file.
    #[error("failed to write file: {0}")]
    WriteFile(String),
}

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
