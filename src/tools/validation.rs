//! Shallow JSON Schema checks run before a tool executes.

use serde_json::Value;

use crate::error::TurnkitError;

/// Check `args` against the top level of `schema`.
///
/// Covers the object type, required keys, and declared property types.
/// Nested schemas are not descended into.
pub fn validate_arguments(args: &Value, schema: &Value) -> Result<(), TurnkitError> {
    let invalid = |message: String| Err(TurnkitError::InvalidArgument(message));

    if schema.get("type").and_then(Value::as_str) == Some("object") && !args.is_object() {
        return invalid(format!("expected object arguments, got {}", type_name(args)));
    }
    let Some(obj) = args.as_object() else {
        return Ok(());
    };

    let required = schema.get("required").and_then(Value::as_array);
    if let Some(missing) = required
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .find(|name| !obj.contains_key(*name))
    {
        return invalid(format!("missing required field '{missing}'"));
    }

    let properties = schema.get("properties").and_then(Value::as_object);
    for (key, value) in obj {
        let expected = properties
            .and_then(|props| props.get(key))
            .and_then(|prop| prop.get("type"))
            .and_then(Value::as_str);
        if let Some(expected) = expected {
            if !matches_type(value, expected) {
                return invalid(format!(
                    "field '{key}' expected type '{expected}', got {}",
                    type_name(value)
                ));
            }
        }
    }
    Ok(())
}

fn matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        other => type_name(value) == other || !KNOWN_TYPES.contains(&other),
    }
}

const KNOWN_TYPES: &[&str] = &["string", "boolean", "object", "array", "null"];

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn question_schema() -> Value {
        json!({
            "type": "object",
            "properties": { "question": { "type": "string" } },
            "required": ["question"],
        })
    }

    #[test]
    fn rejects_non_object_arguments() {
        let err = validate_arguments(&json!("why"), &question_schema()).unwrap_err();
        assert!(err.to_string().contains("expected object"));
    }

    #[test]
    fn rejects_missing_required_field() {
        let err = validate_arguments(&json!({}), &question_schema()).unwrap_err();
        assert!(err.to_string().contains("missing required field 'question'"));
    }

    #[test]
    fn rejects_wrong_property_type() {
        let err = validate_arguments(&json!({ "question": 42 }), &question_schema()).unwrap_err();
        assert!(err.to_string().contains("expected type 'string'"));
    }

    #[test]
    fn accepts_extra_fields_and_unknown_types() {
        let schema = json!({ "properties": { "x": { "type": "custom" } } });
        assert!(validate_arguments(&json!({ "x": 1, "y": true }), &schema).is_ok());
        assert!(validate_arguments(&json!({ "question": "ok", "extra": 1 }), &question_schema()).is_ok());
    }

    #[test]
    fn integer_requires_whole_number() {
        let schema = json!({ "properties": { "n": { "type": "integer" } } });
        assert!(validate_arguments(&json!({ "n": 3 }), &schema).is_ok());
        assert!(validate_arguments(&json!({ "n": 3.5 }), &schema).is_err());
    }
}
