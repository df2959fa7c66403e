//! # Tool Generation
//!
//! This crate turns a sampled collection or table into a query tool
//! specification. It:
//!
//! - **Samples** documents through a `SampleProvider`
//! - **Discovers** the attribute paths present in those samples
//! - **Prompts** a `TextGenerator` for a specification
//! - **Resolves** the answer, forcing the identity fields to what was sampled
//! - **Stores** the result in a `ToolCatalog`
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Tool Generation                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  SampleProvider ──► discover ──► prompt ──► TextGenerator       │
//! │                                                  │              │
//! │                                                  ▼              │
//! │  ToolCatalog ◄──────── ToolSpecification ◄── resolve            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod generator;
pub mod prompt;
pub mod provider;
pub mod resolver;
pub mod samples;
pub mod storage;

pub use config::{GeneratorConfig, OpenAiConfig, ToolsmithConfig};
pub use error::{
    CatalogError, CatalogResult, ConfigError, GenerationError, ProviderError, Result,
    StorageError,
};
pub use generator::{
    AttributeReport, GenerationRequest, GenerationResult, ToolGenerator, scrub_samples,
};
pub use prompt::{PromptContext, build_request};
pub use provider::{
    CompletionRequest, ObjectSchema, OpenAiGenerator, SampleProvider, TextGenerator,
};
pub use resolver::{resolve, resolve_with_repairs};
pub use samples::DirectorySampleProvider;
pub use storage::{FileCatalog, ToolCatalog};
