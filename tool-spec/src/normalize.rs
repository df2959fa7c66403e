//! Normalization of stored tool records.
//!
//! Catalog entries written before binding modes existed carry a bare `value`
//! or `expr` next to the parameter with no `paramMode`. Loading such a record
//! infers the mode from the payload; an explicit mode is never re-derived, so
//! normalizing a normalized record changes nothing.

use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::parameter::{Binding, ParamMode, ParameterRecord, ToolParameter};
use crate::spec::ToolSpecification;

/// Decode a stored specification, inferring any missing binding modes.
pub fn normalize(raw: Value) -> Result<ToolSpecification> {
    let spec: ToolSpecification = serde_json::from_value(raw)?;
    debug!(
        "Normalized tool {} with {} parameters",
        spec.name,
        spec.parameters.len()
    );
    Ok(spec)
}

/// The mode a record resolves to: the explicit one, or one inferred from
/// which payload is populated (expression first, then static value).
pub fn infer_mode(record: &ParameterRecord) -> ParamMode {
    if let Some(mode) = record.param_mode {
        return mode;
    }
    if record.expr.as_deref().is_some_and(|expr| !expr.is_empty()) {
        ParamMode::Expression
    } else if record.value.as_ref().is_some_and(has_static_payload) {
        ParamMode::Static
    } else {
        ParamMode::ToolParam
    }
}

/// Convert a wire record into a parameter with a resolved binding.
pub fn normalize_parameter(record: ParameterRecord) -> ToolParameter {
    let mode = infer_mode(&record);
    let binding = match mode {
        ParamMode::ToolParam => Binding::ToolParam,
        ParamMode::Static => Binding::Static(record.value.unwrap_or(Value::Null)),
        ParamMode::Expression => Binding::Expression(record.expr.unwrap_or_default()),
    };
    let attribute = match record.attribute {
        Some(attribute) if !attribute.is_empty() => attribute,
        _ => record.param.clone(),
    };

    ToolParameter {
        param: record.param,
        attribute,
        operator: record.operator.unwrap_or_default(),
        param_type: record.param_type.unwrap_or_default(),
        required: record.required,
        description: record.description,
        info: record.info,
        allowed_values: record.allowed_values,
        embedding_model: record.embedding_model,
        binding,
    }
}

fn has_static_payload(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(value: Value) -> ParameterRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_expression_payload_infers_expression() {
        let param = normalize_parameter(record(json!({"param": "since", "expr": "x"})));
        assert_eq!(param.binding, Binding::Expression("x".to_string()));
    }

    #[test]
    fn test_static_payload_infers_static() {
        let param = normalize_parameter(record(json!({"param": "kind", "value": 5})));
        assert_eq!(param.binding, Binding::Static(json!(5)));
    }

    #[test]
    fn test_no_payload_infers_tool_param() {
        let param = normalize_parameter(record(json!({"param": "q", "value": "", "expr": ""})));
        assert_eq!(param.mode(), ParamMode::ToolParam);
    }

    #[test]
    fn test_expression_wins_over_value() {
        let mode = infer_mode(&record(json!({"param": "p", "value": 1, "expr": "now()"})));
        assert_eq!(mode, ParamMode::Expression);
    }

    #[test]
    fn test_explicit_mode_is_kept() {
        let param = normalize_parameter(record(json!({
            "param": "p",
            "paramMode": "tool_param",
            "value": 5
        })));
        assert_eq!(param.binding, Binding::ToolParam);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw = json!({
            "name": "movies_by_year",
            "type": "tool",
            "collection_name": "movies",
            "parameters": [
                {"param": "year", "attribute": "year", "expr": "x"},
                {"param": "genre", "value": 5},
                {"param": "title"}
            ]
        });

        let once = normalize(raw).unwrap();
        let twice = normalize(once.to_value().unwrap()).unwrap();

        assert_eq!(once, twice);
        let modes: Vec<_> = twice.parameters.iter().map(ToolParameter::mode).collect();
        assert_eq!(
            modes,
            vec![ParamMode::Expression, ParamMode::Static, ParamMode::ToolParam]
        );
    }

    #[test]
    fn test_normalize_rejects_non_object() {
        assert!(normalize(json!(["not", "a", "tool"])).is_err());
    }
}
