//! Projection maps and their editing operations.
//!
//! A projection is an ordered map from attribute path to marker. An empty
//! projection means the same as no projection, so every edit collapses an
//! empty map back to `None`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SpecError};

/// Ordered attribute path to marker mapping.
pub type Projection = IndexMap<String, ProjectionMarker>;

/// Whether a projected field is returned, and under what value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum ProjectionMarker {
    /// `1`: include the field.
    Include,

    /// `0`: exclude the field.
    Exclude,

    /// Custom replacement value.
    Custom(Value),
}

impl From<Value> for ProjectionMarker {
    fn from(value: Value) -> Self {
        match &value {
            Value::Bool(true) => Self::Include,
            Value::Bool(false) => Self::Exclude,
            Value::Number(number) if number.as_f64() == Some(1.0) => Self::Include,
            Value::Number(number) if number.as_f64() == Some(0.0) => Self::Exclude,
            Value::String(text) if text == "1" => Self::Include,
            Value::String(text) if text == "0" => Self::Exclude,
            _ => Self::Custom(value),
        }
    }
}

impl From<ProjectionMarker> for Value {
    fn from(marker: ProjectionMarker) -> Self {
        match marker {
            ProjectionMarker::Include => Value::from(1),
            ProjectionMarker::Exclude => Value::from(0),
            ProjectionMarker::Custom(value) => value,
        }
    }
}

/// Insert a placeholder field marked `1` and return its name.
pub fn add_field(projection: &mut Option<Projection>) -> String {
    let fields = projection.get_or_insert_with(Projection::new);
    let mut n = fields.len() + 1;
    let mut name = format!("field_{n}");
    while fields.contains_key(&name) {
        n += 1;
        name = format!("field_{n}");
    }
    fields.insert(name.clone(), ProjectionMarker::Include);
    name
}

/// Remove a field; returns whether it was present.
pub fn remove_field(projection: &mut Option<Projection>, name: &str) -> bool {
    let Some(fields) = projection.as_mut() else {
        return false;
    };
    let removed = fields.shift_remove(name).is_some();
    if fields.is_empty() {
        *projection = None;
    }
    removed
}

/// Rename `old` to `new` at the same position.
///
/// The marker is kept unless `marker` is given. Any other entry already
/// named `new` is replaced.
pub fn rename_field(
    projection: &mut Option<Projection>,
    old: &str,
    new: &str,
    marker: Option<ProjectionMarker>,
) -> Result<()> {
    let fields = projection
        .as_mut()
        .filter(|fields| fields.contains_key(old))
        .ok_or_else(|| SpecError::ProjectionFieldNotFound(old.to_string()))?;

    let mut marker = marker;
    let renamed: Projection = fields
        .drain(..)
        .filter_map(|(key, value)| {
            if key == old {
                Some((new.to_string(), marker.take().unwrap_or(value)))
            } else if key == new {
                None
            } else {
                Some((key, value))
            }
        })
        .collect();
    *fields = renamed;
    Ok(())
}

/// Collapse an empty projection to `None`.
pub fn collapse(projection: Option<Projection>) -> Option<Projection> {
    projection.filter(|fields| !fields.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn projection(value: Value) -> Option<Projection> {
        Some(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_marker_decoding() {
        let fields = projection(json!({"a": 1, "b": 0, "c": "1", "d": "$title"})).unwrap();

        assert_eq!(fields["a"], ProjectionMarker::Include);
        assert_eq!(fields["b"], ProjectionMarker::Exclude);
        assert_eq!(fields["c"], ProjectionMarker::Include);
        assert_eq!(fields["d"], ProjectionMarker::Custom(json!("$title")));
        assert_eq!(
            serde_json::to_value(&fields).unwrap(),
            json!({"a": 1, "b": 0, "c": 1, "d": "$title"})
        );
    }

    #[test]
    fn test_add_field_synthesizes_unique_names() {
        let mut fields = projection(json!({"field_2": 1}));

        assert_eq!(add_field(&mut fields), "field_3");
        assert_eq!(add_field(&mut fields), "field_4");

        let mut empty = None;
        assert_eq!(add_field(&mut empty), "field_1");
        assert_eq!(empty.unwrap()["field_1"], ProjectionMarker::Include);
    }

    #[test]
    fn test_remove_last_field_collapses() {
        let mut fields = projection(json!({"title": 1}));

        assert!(remove_field(&mut fields, "title"));
        assert!(fields.is_none());
        assert!(!remove_field(&mut fields, "title"));
    }

    #[test]
    fn test_rename_keeps_position_and_marker() {
        let mut fields = projection(json!({"a": 1, "b": "alias", "c": 0}));

        rename_field(&mut fields, "b", "renamed", None).unwrap();

        let fields = fields.unwrap();
        let keys: Vec<_> = fields.keys().cloned().collect();
        assert_eq!(keys, vec!["a", "renamed", "c"]);
        assert_eq!(fields["renamed"], ProjectionMarker::Custom(json!("alias")));
    }

    #[test]
    fn test_rename_with_new_marker() {
        let mut fields = projection(json!({"a": 1}));

        rename_field(&mut fields, "a", "a", Some(ProjectionMarker::Exclude)).unwrap();
        assert_eq!(fields.unwrap()["a"], ProjectionMarker::Exclude);
    }

    #[test]
    fn test_rename_onto_existing_field_replaces_it() {
        let mut fields = projection(json!({"a": 1, "b": 0, "c": "alias"}));

        rename_field(&mut fields, "c", "a", None).unwrap();

        let fields = fields.unwrap();
        let keys: Vec<_> = fields.keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(fields["a"], ProjectionMarker::Custom(json!("alias")));
    }

    #[test]
    fn test_rename_missing_field() {
        let mut fields = None;
        let err = rename_field(&mut fields, "ghost", "x", None).unwrap_err();
        assert!(matches!(err, SpecError::ProjectionFieldNotFound(name) if name == "ghost"));
    }
}
