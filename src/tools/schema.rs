//! Parameter validation against a tool's declared input schema
//!
//! Only the subset of JSON Schema tools here declare is checked: an object
//! with `required` properties and primitive `type`s per property.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("missing required field '{0}'")]
    MissingField(String),
    #[error("field '{field}' must be of type {expected}")]
    WrongType { field: String, expected: String },
}

/// Check `parameters` against `schema`
pub fn validate(schema: &Value, parameters: &Map<String, Value>) -> Result<(), SchemaError> {
    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            if parameters.get(field).map_or(true, Value::is_null) {
                return Err(SchemaError::MissingField(field.to_string()));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    for (field, value) in parameters {
        let Some(expected) = properties
            .get(field)
            .and_then(|p| p.get("type"))
            .and_then(Value::as_str)
        else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        if !matches_type(expected, value) {
            return Err(SchemaError::WrongType {
                field: field.clone(),
                expected: expected.to_string(),
            });
        }
    }

    Ok(())
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        // Unknown type keywords are not enforced
        _ => true,
    }
}
