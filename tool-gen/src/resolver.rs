//! Resolution of generated output into a specification.
//!
//! The generator is an untrusted producer of structure. Its output is parsed
//! leniently (strict JSON first, then fenced code blocks), after which the
//! fields that identify what the tool reads from are overwritten with what
//! was actually sampled. Those fields must never be hallucinated or omitted.

use serde_json::{Map, Value};
use toolsmith_spec::{
    ID_FIELD, ObjectKind, ParamType, TOOL_TYPE, ToolSpecification, ToolTarget, normalize,
};
use tracing::debug;

use crate::error::{GenerationError, Result};

/// Matches fenced code blocks with an optional language tag.
const FENCED_BLOCK_PATTERN: &str = r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)```";

/// Parse `response` and enforce the identity of `target` and `db_name`.
pub fn resolve(
    response: &str,
    target: &ToolTarget,
    db_name: Option<&str>,
) -> Result<ToolSpecification> {
    resolve_with_repairs(response, target, db_name).map(|(tool, _)| tool)
}

/// Like [`resolve`], also describing the values that were coerced.
pub fn resolve_with_repairs(
    response: &str,
    target: &ToolTarget,
    db_name: Option<&str>,
) -> Result<(ToolSpecification, Vec<String>)> {
    let mut object = parse_object(response)?;
    let repairs = unsupported_types(&object);

    object.remove(ID_FIELD);
    for kind in [ObjectKind::Collection, ObjectKind::Table] {
        object.remove(kind.field_name());
    }
    object.insert(
        target.kind.field_name().to_string(),
        Value::String(target.name.clone()),
    );
    match db_name {
        Some(db_name) => {
            object.insert("db_name".to_string(), Value::String(db_name.to_string()));
        }
        None => {
            object.remove("db_name");
        }
    }
    object.insert("type".to_string(), Value::String(TOOL_TYPE.to_string()));
    let enabled = !matches!(object.get("enabled"), Some(Value::Bool(false)));
    object.insert("enabled".to_string(), Value::Bool(enabled));

    let tool = normalize(Value::Object(object))
        .map_err(|e| GenerationError::GenerationParse(e.to_string()))?;
    Ok((tool, repairs))
}

/// Parameters whose declared type is not supported and reads as `string`.
fn unsupported_types(object: &Map<String, Value>) -> Vec<String> {
    let Some(Value::Array(parameters)) = object.get("parameters") else {
        return Vec::new();
    };
    parameters
        .iter()
        .filter_map(|parameter| {
            let declared = parameter.get("type").filter(|value| !value.is_null())?;
            if ParamType::parse(declared).is_some() {
                return None;
            }
            let name = parameter.get("param").and_then(Value::as_str).unwrap_or("?");
            Some(format!("Parameter {name} has unsupported type {declared}, using string"))
        })
        .collect()
}

/// Parse the response as a JSON object, falling back to fenced blocks.
fn parse_object(response: &str) -> Result<Map<String, Value>> {
    let value = match serde_json::from_str::<Value>(response.trim()) {
        Ok(value) => value,
        Err(strict) => {
            debug!("Strict parse failed ({strict}), searching fenced blocks");
            extract_fenced_json(response).ok_or_else(|| {
                GenerationError::GenerationParse(format!(
                    "response is not valid JSON and holds no parsable code block: {strict}"
                ))
            })?
        }
    };

    match value {
        Value::Object(object) => Ok(object),
        other => Err(GenerationError::GenerationParse(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        ))),
    }
}

/// First fenced block whose content parses as JSON.
fn extract_fenced_json(response: &str) -> Option<Value> {
    let Ok(re) = regex_lite::Regex::new(FENCED_BLOCK_PATTERN) else {
        return None;
    };
    re.captures_iter(response)
        .filter_map(|captures| captures.get(1))
        .find_map(|block| serde_json::from_str(block.as_str().trim()).ok())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::num::NonZeroU32;
    use toolsmith_spec::{Binding, ParamMode};

    fn movies() -> ToolTarget {
        ToolTarget::collection("movies")
    }

    #[test]
    fn test_strict_json() {
        let tool = resolve(r#"  {"name": "t"}  "#, &movies(), None).unwrap();
        assert_eq!(tool.name, "t");
    }

    #[test]
    fn test_tagged_fenced_block() {
        let tool = resolve("```json\n{\"name\":\"t\"}\n```", &movies(), None).unwrap();
        assert_eq!(tool.name, "t");
    }

    #[test]
    fn test_untagged_fenced_block_after_prose() {
        let response = "Here is your tool:\n```\n{\"name\": \"by_year\"}\n```\nEnjoy.";
        let tool = resolve(response, &movies(), None).unwrap();
        assert_eq!(tool.name, "by_year");
    }

    #[test]
    fn test_skips_unparsable_blocks() {
        let response = "```text\nnot json\n```\n```json\n{\"name\": \"second\"}\n```";
        let tool = resolve(response, &movies(), None).unwrap();
        assert_eq!(tool.name, "second");
    }

    #[test]
    fn test_plain_text_fails() {
        let err = resolve("I cannot help with that.", &movies(), None).unwrap_err();
        assert!(matches!(err, GenerationError::GenerationParse(_)));
    }

    #[test]
    fn test_non_object_fails() {
        let err = resolve("[1, 2, 3]", &movies(), None).unwrap_err();
        assert!(
            matches!(err, GenerationError::GenerationParse(message) if message.contains("an array"))
        );
    }

    #[test]
    fn test_missing_name_fails() {
        let err = resolve(r#"{"description": "nameless"}"#, &movies(), None).unwrap_err();
        assert!(matches!(err, GenerationError::GenerationParse(_)));
    }

    #[test]
    fn test_identity_fields_are_forced() {
        let response = r#"{
            "_id": "hallucinated",
            "name": "t",
            "type": "function",
            "collection_name": "films",
            "table_name": "films_by_year",
            "db_name": "wrong",
            "enabled": "yes"
        }"#;

        let tool = resolve(response, &movies(), Some("cinema")).unwrap();

        assert_eq!(tool.id, None);
        assert_eq!(tool.target, Some(movies()));
        assert_eq!(tool.db_name.as_deref(), Some("cinema"));
        assert_eq!(tool.tool_type, "tool");
        assert!(tool.enabled);
    }

    #[test]
    fn test_table_target_and_missing_db() {
        let response = r#"{"name": "t", "collection_name": "movies", "db_name": "x"}"#;

        let tool = resolve(response, &ToolTarget::table("books"), None).unwrap();

        assert_eq!(tool.collection_name(), None);
        assert_eq!(tool.table_name(), Some("books"));
        assert_eq!(tool.db_name, None);
    }

    #[test]
    fn test_explicit_disable_is_kept() {
        let tool = resolve(r#"{"name": "t", "enabled": false}"#, &movies(), None).unwrap();
        assert!(!tool.enabled);
    }

    #[test]
    fn test_off_type_limits_are_coerced() {
        for (limit, expected) in [("10.0", 10), ("\"10\"", 10), ("\"7.0\"", 7)] {
            let response = format!(r#"{{"name": "t", "limit": {limit}}}"#);
            let tool = resolve(&response, &movies(), None).unwrap();
            assert_eq!(tool.limit, NonZeroU32::new(expected));
        }

        let tool = resolve(r#"{"name": "t", "limit": 0}"#, &movies(), None).unwrap();
        assert_eq!(tool.limit, None);
    }

    #[test]
    fn test_unsupported_parameter_type_is_repaired() {
        let response = r#"{"name": "t", "parameters": [
            {"param": "genres", "attribute": "genres", "type": "array", "operator": "$in"},
            {"param": "year", "attribute": "year", "type": "integer"}
        ]}"#;

        let (tool, repairs) = resolve_with_repairs(response, &movies(), None).unwrap();

        assert_eq!(tool.parameters[0].param_type, ParamType::String);
        assert_eq!(tool.parameters[1].param_type, ParamType::Number);
        assert_eq!(
            repairs,
            vec!["Parameter genres has unsupported type \"array\", using string".to_string()]
        );
    }

    #[test]
    fn test_parameters_get_modes() {
        let response = r#"{"name": "t", "parameters": [
            {"param": "year", "attribute": "year"},
            {"param": "kind", "attribute": "kind", "value": "feature"},
            {"param": "q", "attribute": "title", "paramMode": "expression", "expr": "q.lower()"}
        ]}"#;

        let tool = resolve(response, &movies(), None).unwrap();

        assert_eq!(tool.parameters[0].mode(), ParamMode::ToolParam);
        assert_eq!(
            tool.parameters[1].binding,
            Binding::Static(Value::String("feature".to_string()))
        );
        assert_eq!(tool.parameters[2].mode(), ParamMode::Expression);
    }
}
