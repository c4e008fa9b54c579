//! Declarative event shape.
//!
//! Validation walks [`EVENT_SCHEMA`] in order and reports the first field that
//! fails its default-fill, required or type check. Nested values inside a
//! field are never inspected.

use crate::event::EventError;

use serde_json::{Map, Value};

/// JSON type a schema field must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Mapping,
}

impl FieldKind {
    /// JSON type name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Text => "string",
            FieldKind::Mapping => "object",
        }
    }

    fn matches(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (FieldKind::Text, Value::String(_)) | (FieldKind::Mapping, Value::Object(_))
        )
    }
}

/// One entry of an expected-shape description.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Injected when the field is absent, before the required check runs.
    pub default: Option<fn() -> Value>,
}

/// Shape every emitted event must have.
pub const EVENT_SCHEMA: &[FieldSpec] = &[
    FieldSpec {
        name: "event",
        kind: FieldKind::Text,
        required: true,
        default: None,
    },
    FieldSpec {
        name: "properties",
        kind: FieldKind::Mapping,
        required: true,
        default: Some(empty_mapping),
    },
];

fn empty_mapping() -> Value {
    Value::Object(Map::new())
}

/// JSON type name of a runtime value.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Check `received` against `schema`, filling in defaults for absent fields.
pub fn validate(schema: &[FieldSpec], received: &mut Map<String, Value>) -> Result<(), EventError> {
    for spec in schema {
        if !received.contains_key(spec.name) {
            if let Some(default) = spec.default {
                received.insert(spec.name.to_string(), default());
            }
        }

        let value = match received.get(spec.name) {
            Some(value) => value,
            None if spec.required => {
                return Err(EventError::MissingField { field: spec.name });
            }
            None => continue,
        };

        if !spec.kind.matches(value) {
            return Err(EventError::TypeMismatch {
                field: spec.name,
                expected: spec.kind.name(),
                actual: type_name(value),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn fills_default_properties() {
        let mut received = object(json!({"event": "x"}));
        validate(EVENT_SCHEMA, &mut received).unwrap();
        assert_eq!(received["properties"], json!({}));
    }

    #[test]
    fn keeps_supplied_properties() {
        let mut received = object(json!({"event": "x", "properties": {"a": 1}}));
        validate(EVENT_SCHEMA, &mut received).unwrap();
        assert_eq!(received["properties"], json!({"a": 1}));
    }

    #[test]
    fn reports_first_failing_field() {
        // Both fields are wrong; `event` is declared first.
        let mut received = object(json!({"event": true, "properties": "test_prop"}));
        let err = validate(EVENT_SCHEMA, &mut received).unwrap_err();
        assert_eq!(
            err,
            EventError::TypeMismatch {
                field: "event",
                expected: "string",
                actual: "boolean",
            }
        );
    }

    #[test]
    fn does_not_descend_into_properties() {
        let mut received = object(json!({
            "event": "x",
            "properties": {"nested": [1, null, {"deep": true}]}
        }));
        assert!(validate(EVENT_SCHEMA, &mut received).is_ok());
    }

    #[test]
    fn optional_field_without_default_may_be_absent() {
        const SCHEMA: &[FieldSpec] = &[FieldSpec {
            name: "tag",
            kind: FieldKind::Text,
            required: false,
            default: None,
        }];
        let mut received = Map::new();
        assert!(validate(SCHEMA, &mut received).is_ok());
        assert!(received.is_empty());
    }

    #[test]
    fn null_is_a_type_mismatch_not_a_missing_field() {
        let mut received = object(json!({"event": null}));
        let err = validate(EVENT_SCHEMA, &mut received).unwrap_err();
        assert!(matches!(err, EventError::TypeMismatch { actual: "null", .. }));
    }

    #[test]
    fn type_names() {
        assert_eq!(type_name(&json!(1.5)), "number");
        assert_eq!(type_name(&json!([])), "array");
        assert_eq!(type_name(&json!("s")), "string");
    }
}
