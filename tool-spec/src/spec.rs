//! The query tool specification.
//!
//! A specification describes one parameterized fetch against a named
//! collection or table. It is created empty from the editor or populated
//! wholesale by generation, edited field by field, and persisted by the
//! catalog, which assigns the identifier on first save.

use std::collections::BTreeSet;
use std::num::NonZeroU32;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::TOOL_TYPE;
use crate::error::{Result, SpecError};
use crate::parameter::ToolParameter;
use crate::projection::{self, Projection, ProjectionMarker};

/// Kind of object a tool reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Collection,
    Table,
}

impl ObjectKind {
    /// Specification field holding the object name for this kind.
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Collection => "collection_name",
            Self::Table => "table_name",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Collection => write!(f, "collection"),
            Self::Table => write!(f, "table"),
        }
    }
}

/// The collection or table a tool reads from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolTarget {
    pub kind: ObjectKind,
    pub name: String,
}

impl ToolTarget {
    /// Create a new target.
    pub fn new(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// Target a collection.
    pub fn collection(name: impl Into<String>) -> Self {
        Self::new(ObjectKind::Collection, name)
    }

    /// Target a table.
    pub fn table(name: impl Into<String>) -> Self {
        Self::new(ObjectKind::Table, name)
    }
}

impl std::fmt::Display for ToolTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} \"{}\"", self.kind, self.name)
    }
}

/// A declarative query tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SpecRecord", into = "SpecRecord")]
pub struct ToolSpecification {
    /// Catalog identifier, assigned on first save.
    pub id: Option<String>,

    /// Tool name, unique within the catalog.
    pub name: String,

    pub description: Option<String>,

    /// Tags in display order.
    pub tags: Vec<String>,

    /// Classification; `"tool"` for query tools.
    pub tool_type: String,

    /// Execution verb hint, e.g. `find`.
    pub method: Option<String>,

    /// Collection or table the tool reads from.
    pub target: Option<ToolTarget>,

    pub db_name: Option<String>,

    /// Returned fields. Never `Some` of an empty map.
    pub projection: Option<Projection>,

    /// Maximum number of documents returned.
    pub limit: Option<NonZeroU32>,

    pub enabled: bool,

    pub parameters: Vec<ToolParameter>,
}

impl ToolSpecification {
    /// Create an empty, enabled query tool.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            tags: Vec::new(),
            tool_type: TOOL_TYPE.to_string(),
            method: None,
            target: None,
            db_name: None,
            projection: None,
            limit: None,
            enabled: true,
            parameters: Vec::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the target.
    pub fn with_target(mut self, target: ToolTarget) -> Self {
        self.target = Some(target);
        self
    }

    /// Set the database name.
    pub fn with_db_name(mut self, db_name: impl Into<String>) -> Self {
        self.db_name = Some(db_name.into());
        self
    }

    /// Add a parameter.
    pub fn with_parameter(mut self, parameter: ToolParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Point the tool at a collection or table; the other kind is cleared.
    pub fn set_target(&mut self, kind: ObjectKind, name: impl Into<String>) {
        self.target = Some(ToolTarget::new(kind, name));
    }

    pub fn collection_name(&self) -> Option<&str> {
        self.target_name(ObjectKind::Collection)
    }

    pub fn table_name(&self) -> Option<&str> {
        self.target_name(ObjectKind::Table)
    }

    fn target_name(&self, kind: ObjectKind) -> Option<&str> {
        self.target
            .as_ref()
            .filter(|target| target.kind == kind)
            .map(|target| target.name.as_str())
    }

    /// Replace the tags from a comma separated list.
    pub fn set_tags_from_list(&mut self, list: &str) {
        self.tags = list
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect();
    }

    /// Tag equality ignoring order.
    pub fn has_same_tags(&self, other: &ToolSpecification) -> bool {
        let ours: BTreeSet<_> = self.tags.iter().collect();
        let theirs: BTreeSet<_> = other.tags.iter().collect();
        ours == theirs
    }

    /// Append a blank caller-supplied parameter and return its index.
    pub fn add_parameter(&mut self) -> usize {
        self.parameters.push(ToolParameter::blank());
        self.parameters.len() - 1
    }

    /// Remove the parameter at `index`.
    pub fn remove_parameter(&mut self, index: usize) -> Result<ToolParameter> {
        if index >= self.parameters.len() {
            return Err(SpecError::ParameterIndexOutOfRange(index));
        }
        Ok(self.parameters.remove(index))
    }

    /// Add a placeholder projection field marked `1`; returns its name.
    pub fn add_projection_field(&mut self) -> String {
        projection::add_field(&mut self.projection)
    }

    /// Remove a projection field; an emptied projection becomes `None`.
    pub fn remove_projection_field(&mut self, name: &str) -> bool {
        projection::remove_field(&mut self.projection, name)
    }

    /// Rename a projection field in place.
    pub fn rename_projection_field(
        &mut self,
        old: &str,
        new: &str,
        marker: Option<ProjectionMarker>,
    ) -> Result<()> {
        projection::rename_field(&mut self.projection, old, new, marker)
    }

    /// Encode as a catalog record.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Wire shape of a specification. Both target fields exist on the wire;
/// `collection_name` wins when a record carries both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SpecRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,

    #[serde(default)]
    tags: Option<Vec<String>>,

    #[serde(rename = "type", default)]
    tool_type: Option<String>,

    name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_limit",
        skip_serializing_if = "Option::is_none"
    )]
    limit: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    collection_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    table_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    db_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    projection: Option<Projection>,

    #[serde(default)]
    enabled: Option<bool>,

    #[serde(default)]
    parameters: Option<Vec<ToolParameter>>,
}

impl From<SpecRecord> for ToolSpecification {
    fn from(record: SpecRecord) -> Self {
        let non_empty = |name: Option<String>| name.filter(|name| !name.is_empty());
        let target = match (
            non_empty(record.collection_name),
            non_empty(record.table_name),
        ) {
            (Some(name), _) => Some(ToolTarget::collection(name)),
            (None, Some(name)) => Some(ToolTarget::table(name)),
            (None, None) => None,
        };

        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            tags: record.tags.unwrap_or_default(),
            tool_type: record
                .tool_type
                .filter(|tool_type| !tool_type.is_empty())
                .unwrap_or_else(|| TOOL_TYPE.to_string()),
            method: record.method,
            target,
            db_name: non_empty(record.db_name),
            projection: projection::collapse(record.projection),
            limit: record.limit.and_then(NonZeroU32::new),
            enabled: record.enabled.unwrap_or(true),
            parameters: record.parameters.unwrap_or_default(),
        }
    }
}

impl From<ToolSpecification> for SpecRecord {
    fn from(spec: ToolSpecification) -> Self {
        let (collection_name, table_name) = match spec.target {
            Some(ToolTarget {
                kind: ObjectKind::Collection,
                name,
            }) => (Some(name), None),
            Some(ToolTarget {
                kind: ObjectKind::Table,
                name,
            }) => (None, Some(name)),
            None => (None, None),
        };

        Self {
            id: spec.id,
            tags: Some(spec.tags),
            tool_type: Some(spec.tool_type),
            name: spec.name,
            description: spec.description,
            limit: spec.limit.map(NonZeroU32::get),
            method: spec.method,
            collection_name,
            table_name,
            db_name: spec.db_name,
            projection: projection::collapse(spec.projection),
            enabled: Some(spec.enabled),
            parameters: Some(spec.parameters),
        }
    }
}

/// Generated limits arrive as `10`, `10.0` or `"10"`. Anything that is not a
/// positive integer reads as no limit.
fn lenient_limit<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let whole = |number: f64| {
        (number.fract() == 0.0 && (1.0..=f64::from(u32::MAX)).contains(&number))
            .then_some(number as u32)
    };
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(number)) => match number.as_u64() {
            Some(n) => u32::try_from(n).ok(),
            None => number.as_f64().and_then(whole),
        },
        Some(Value::String(text)) => {
            let text = text.trim();
            match text.parse::<u32>() {
                Ok(n) => Some(n),
                Err(_) => text.parse::<f64>().ok().and_then(whole),
            }
        }
        _ => None,
    })
}
