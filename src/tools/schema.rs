//! Argument validation against a tool's parameter schema.
//!
//! Covers the schema subset the catalogue actually uses: a top-level object
//! with `properties` (string/integer types, optional `enum`) and `required`.

use serde_json::Value;

/// A schema violation, naming the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentError {
    /// The field that failed validation
    pub field: String,

    /// What was wrong with it
    pub message: String,
}

impl std::fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid argument '{}': {}", self.field, self.message)
    }
}

/// Validate `args` against `schema`.
///
/// Returns the first violation found: a missing required field, a type
/// mismatch, or a value outside a declared enum. Fields not declared in the
/// schema are ignored.
pub fn validate_arguments(schema: &Value, args: &Value) -> Result<(), ArgumentError> {
    let args_map = args.as_object().ok_or_else(|| ArgumentError {
        field: "<arguments>".to_string(),
        message: "expected a JSON object".to_string(),
    })?;

    let empty = serde_json::Map::new();
    let properties = schema["properties"].as_object().unwrap_or(&empty);

    // Required fields first, in schema order.
    if let Some(required) = schema["required"].as_array() {
        for field in required.iter().filter_map(|v| v.as_str()) {
            if !args_map.contains_key(field) {
                return Err(ArgumentError {
                    field: field.to_string(),
                    message: "required field is missing".to_string(),
                });
            }
        }
    }

    for (field, spec) in properties {
        let Some(value) = args_map.get(field) else {
            continue;
        };

        match spec["type"].as_str() {
            Some("string") => {
                if !value.is_string() {
                    return Err(ArgumentError {
                        field: field.clone(),
                        message: format!("expected a string, got {}", type_name(value)),
                    });
                }
            }
            Some("integer") => {
                if !value.is_i64() && !value.is_u64() {
                    return Err(ArgumentError {
                        field: field.clone(),
                        message: format!("expected an integer, got {}", type_name(value)),
                    });
                }
            }
            _ => {}
        }

        if let Some(allowed) = spec["enum"].as_array() {
            if !allowed.contains(value) {
                return Err(ArgumentError {
                    field: field.clone(),
                    message: format!(
                        "value {} is not one of the allowed values",
                        value
                    ),
                });
            }
        }
    }

    Ok(())
}

fn type_name(value: &Value) -> &'static str {
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
    use serde_json::json;

    fn add_slide_schema() -> Value {
        crate::tools::ToolRegistry::new()
            .get(crate::tools::ADD_SLIDE)
            .unwrap()
            .parameters
            .clone()
    }

    #[test]
    fn accepts_valid_arguments() {
        let args = json!({
            "layout": "TITLE_AND_BODY",
            "title": "Intro",
            "content": "- point one\n- point two"
        });
        assert!(validate_arguments(&add_slide_schema(), &args).is_ok());
    }

    #[test]
    fn names_the_missing_required_field() {
        let args = json!({ "layout": "TITLE", "title": "Intro" });
        let err = validate_arguments(&add_slide_schema(), &args).unwrap_err();
        assert_eq!(err.field, "content");
    }

    #[test]
    fn rejects_type_mismatch() {
        let args = json!({ "layout": "TITLE", "title": 7, "content": "x" });
        let err = validate_arguments(&add_slide_schema(), &args).unwrap_err();
        assert_eq!(err.field, "title");
    }

    #[test]
    fn rejects_value_outside_enum() {
        let args = json!({ "layout": "SIDEWAYS", "title": "Intro", "content": "x" });
        let err = validate_arguments(&add_slide_schema(), &args).unwrap_err();
        assert_eq!(err.field, "layout");
    }

    #[test]
    fn rejects_non_object_arguments() {
        let err = validate_arguments(&add_slide_schema(), &json!("not an object")).unwrap_err();
        assert_eq!(err.field, "<arguments>");
    }

    #[test]
    fn integer_fields_accept_integers_only() {
        let schema = json!({
            "type": "object",
            "properties": {
                "slide_index": { "type": "integer" }
            },
            "required": ["slide_index"]
        });
        assert!(validate_arguments(&schema, &json!({ "slide_index": 2 })).is_ok());
        let err = validate_arguments(&schema, &json!({ "slide_index": 1.5 })).unwrap_err();
        assert_eq!(err.field, "slide_index");
    }
}
