use crate::schema::{type_name, validate, FieldKind, EVENT_SCHEMA};

use serde::Serialize;
use serde_json::{Map, Value};

/// Why an untrusted mapping could not become an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("Required argument `{field}` is missing")]
    MissingField { field: &'static str },

    #[error("Argument `{field}` is expected to be of type `{expected}`, received `{actual}`")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
        actual: &'static str,
    },
}

/// A named record with a properties mapping.
///
/// Serializes to exactly `{"event": <name>, "properties": <object>}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    #[serde(rename = "event")]
    name: String,
    properties: Map<String, Value>,
}

impl Event {
    pub fn new(name: impl Into<String>, properties: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            properties,
        }
    }

    /// Validate an untrusted mapping and build an event from it.
    ///
    /// A missing `properties` field defaults to an empty object.
    pub fn from_map(mut params: Map<String, Value>) -> Result<Self, EventError> {
        validate(EVENT_SCHEMA, &mut params)?;

        Ok(Self {
            name: take_text(&mut params, "event")?,
            properties: take_mapping(&mut params, "properties")?,
        })
    }

    /// Like [`Event::from_map`], but also rejects input that is not an object.
    pub fn from_value(value: Value) -> Result<Self, EventError> {
        match value {
            Value::Object(params) => Self::from_map(params),
            other => Err(EventError::TypeMismatch {
                field: "<event>",
                expected: FieldKind::Mapping.name(),
                actual: type_name(&other),
            }),
        }
    }

    pub fn as_map(&self) -> Map<String, Value> {
        let mut map = Map::with_capacity(2);
        map.insert("event".to_string(), Value::String(self.name.clone()));
        map.insert(
            "properties".to_string(),
            Value::Object(self.properties.clone()),
        );
        map
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.as_map())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    pub fn set_properties(&mut self, properties: Map<String, Value>) {
        self.properties = properties;
    }
}

impl TryFrom<Value> for Event {
    type Error = EventError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl TryFrom<Map<String, Value>> for Event {
    type Error = EventError;

    fn try_from(params: Map<String, Value>) -> Result<Self, Self::Error> {
        Self::from_map(params)
    }
}

/// Move a field already checked by `validate` out of the mapping.
fn take_text(params: &mut Map<String, Value>, field: &'static str) -> Result<String, EventError> {
    match params.remove(field) {
        Some(Value::String(text)) => Ok(text),
        other => Err(mismatch(field, FieldKind::Text, other.as_ref())),
    }
}

fn take_mapping(
    params: &mut Map<String, Value>,
    field: &'static str,
) -> Result<Map<String, Value>, EventError> {
    match params.remove(field) {
        Some(Value::Object(mapping)) => Ok(mapping),
        other => Err(mismatch(field, FieldKind::Mapping, other.as_ref())),
    }
}

fn mismatch(field: &'static str, kind: FieldKind, value: Option<&Value>) -> EventError {
    match value {
        Some(value) => EventError::TypeMismatch {
            field,
            expected: kind.name(),
            actual: type_name(value),
        },
        None => EventError::MissingField { field },
    }
}
