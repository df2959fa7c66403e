//! Tool parameters and their binding modes.
//!
//! A parameter binds one filter condition of a query tool: the attribute it
//! matches, the comparison operator, and where the compared value comes from.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::normalize::normalize_parameter;

/// How a parameter's value is determined at invocation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamMode {
    /// Supplied by the caller.
    #[default]
    ToolParam,

    /// Fixed value embedded in the specification.
    Static,

    /// Computed from an expression over the invocation context.
    Expression,
}

impl ParamMode {
    /// Wire name of the mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ToolParam => "tool_param",
            Self::Static => "static",
            Self::Expression => "expression",
        }
    }
}

impl std::fmt::Display for ParamMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The binding payload of a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Value supplied by the caller.
    ToolParam,

    /// Fixed value.
    Static(Value),

    /// Expression evaluated against the invocation context.
    Expression(String),
}

impl Binding {
    /// The mode this binding corresponds to.
    pub fn mode(&self) -> ParamMode {
        match self {
            Self::ToolParam => ParamMode::ToolParam,
            Self::Static(_) => ParamMode::Static,
            Self::Expression(_) => ParamMode::Expression,
        }
    }
}

/// Comparison operators a parameter can apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[default]
    #[serde(rename = "$eq")]
    Eq,
    #[serde(rename = "$gt")]
    Gt,
    #[serde(rename = "$gte")]
    Gte,
    #[serde(rename = "$lt")]
    Lt,
    #[serde(rename = "$lte")]
    Lte,
    #[serde(rename = "$in")]
    In,
    #[serde(rename = "$ne")]
    Ne,
}

impl Operator {
    /// Every operator, in display order.
    pub const ALL: [Operator; 7] = [
        Self::Eq,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::In,
        Self::Ne,
    ];

    /// Query token for the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "$eq",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
            Self::In => "$in",
            Self::Ne => "$ne",
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared value kind of a parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[default]
    String,
    #[serde(alias = "integer")]
    Number,
    #[serde(alias = "bool")]
    Boolean,
    Text,
    Timestamp,
    Float,
    Vector,
}

impl ParamType {
    /// Every parameter type, in display order.
    pub const ALL: [ParamType; 7] = [
        Self::String,
        Self::Number,
        Self::Boolean,
        Self::Text,
        Self::Timestamp,
        Self::Float,
        Self::Vector,
    ];

    /// Read a wire type name, accepting the `integer` and `bool` aliases.
    pub fn parse(value: &Value) -> Option<Self> {
        ParamType::deserialize(value).ok()
    }

    /// Wire name of the type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Text => "text",
            Self::Timestamp => "timestamp",
            Self::Float => "float",
            Self::Vector => "vector",
        }
    }
}

/// One filter binding of a query tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ParameterRecord", into = "ParameterRecord")]
pub struct ToolParameter {
    /// Caller-facing parameter name.
    pub param: String,

    /// Attribute path the parameter filters on.
    pub attribute: String,

    /// Comparison operator.
    pub operator: Operator,

    /// Declared value kind.
    pub param_type: ParamType,

    /// Whether the caller must supply the value.
    pub required: bool,

    /// Description shown to the caller.
    pub description: Option<String>,

    /// Free-text hint, e.g. "partition key".
    pub info: Option<String>,

    /// Allowed values, if the attribute is enumerable.
    pub allowed_values: Option<Vec<String>>,

    /// Embedding model for vector parameters.
    pub embedding_model: Option<String>,

    /// Where the value comes from.
    pub binding: Binding,
}

impl ToolParameter {
    /// Create a caller-supplied parameter filtering `attribute` with `$eq`.
    pub fn new(param: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            attribute: attribute.into(),
            operator: Operator::Eq,
            param_type: ParamType::String,
            required: false,
            description: None,
            info: None,
            allowed_values: None,
            embedding_model: None,
            binding: Binding::ToolParam,
        }
    }

    /// A blank caller-supplied parameter, as added from the editor.
    pub fn blank() -> Self {
        Self::new("", "")
    }

    /// Set the operator.
    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = operator;
        self
    }

    /// Set the declared type.
    pub fn with_type(mut self, param_type: ParamType) -> Self {
        self.param_type = param_type;
        self
    }

    /// Mark the parameter as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the binding.
    pub fn with_binding(mut self, binding: Binding) -> Self {
        self.binding = binding;
        self
    }

    /// The binding mode.
    pub fn mode(&self) -> ParamMode {
        self.binding.mode()
    }
}

/// Wire shape of a parameter as stored in the catalog or produced by a
/// generator. `paramMode` may be missing on records written before binding
/// modes existed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub param: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,

    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub param_type: Option<ParamType>,

    #[serde(default, deserialize_with = "lenient_bool")]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expr: Option<String>,

    #[serde(
        rename = "enum",
        default,
        deserialize_with = "lenient_strings",
        skip_serializing_if = "Option::is_none"
    )]
    pub allowed_values: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    #[serde(rename = "paramMode", default, skip_serializing_if = "Option::is_none")]
    pub param_mode: Option<ParamMode>,
}

impl From<ParameterRecord> for ToolParameter {
    fn from(record: ParameterRecord) -> Self {
        normalize_parameter(record)
    }
}

impl From<ToolParameter> for ParameterRecord {
    fn from(parameter: ToolParameter) -> Self {
        let mode = parameter.mode();
        let (value, expr) = match parameter.binding {
            Binding::ToolParam => (None, None),
            Binding::Static(value) => (Some(value), None),
            Binding::Expression(expr) => (None, Some(expr)),
        };
        Self {
            param: parameter.param,
            description: parameter.description,
            attribute: Some(parameter.attribute),
            param_type: Some(parameter.param_type),
            required: parameter.required,
            operator: Some(parameter.operator),
            expr,
            allowed_values: parameter.allowed_values,
            embedding_model: parameter.embedding_model,
            info: parameter.info,
            value,
            param_mode: Some(mode),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Older catalog entries store `required` as `0`/`1`.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        None => false,
        Some(Flag::Bool(flag)) => flag,
        Some(Flag::Number(number)) => number != 0.0,
        Some(Flag::Text(text)) => matches!(text.trim(), "true" | "1"),
    })
}

/// Unsupported types read as unset, which falls back to `string`.
fn lenient_type<'de, D>(deserializer: D) -> Result<Option<ParamType>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|value| ParamType::parse(&value)))
}

/// Enumerations sometimes arrive with numeric members.
fn lenient_strings<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(values.map(|values| {
        values
            .into_iter()
            .map(|value| match value {
                Value::String(text) => text,
                other => other.to_string(),
            })
            .collect()
    }))
}
