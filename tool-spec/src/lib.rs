//! # Tool Specifications
//!
//! This crate holds the typed model of a declarative query tool and the
//! schema inference that feeds its generation:
//!
//! - **Attribute Discovery**: infer attribute paths from sample documents
//! - **Specification Model**: tools, parameters and binding modes
//! - **Normalization**: upgrade stored records written without a binding mode
//! - **Editing**: projection and parameter edits used by the catalog editor
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Tool Specification Model                     │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  Document ──► discover() ──► AttributePath                      │
//! │                                                                 │
//! │  stored JSON ──► normalize() ──► ToolSpecification              │
//! │                                      │                          │
//! │                                      ▼                          │
//! │                    ToolParameter ◄── Binding (sum type)         │
//! │                    Projection    ◄── ProjectionMarker           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod discovery;
pub mod error;
pub mod normalize;
pub mod parameter;
pub mod projection;
pub mod spec;

pub use discovery::{AttributePath, discover, escape_key};
pub use error::{Result, SpecError};
pub use normalize::{infer_mode, normalize, normalize_parameter};
pub use parameter::{Binding, Operator, ParamMode, ParamType, ParameterRecord, ToolParameter};
pub use projection::{Projection, ProjectionMarker};
pub use spec::{ObjectKind, ToolSpecification, ToolTarget};

/// A sampled document: an arbitrary JSON object.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Field carrying the catalog identifier on stored documents.
pub const ID_FIELD: &str = "_id";

/// Classification every generated query tool carries.
pub const TOOL_TYPE: &str = "tool";
