use crate::fingerprint::key_fingerprint;

use serde_json::Value;
use std::fmt;

/// Ordered header set with case-insensitive names.
///
/// `Debug` output never shows the `Authorization` value.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header, replacing any existing value under the same name.
    /// Returns the replaced value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => Some(std::mem::replace(&mut self.0[i].1, value)),
            None => {
                self.0.push((name, value));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.0[i].1.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|i| self.0.remove(i).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}

impl fmt::Debug for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in self.iter() {
            if name.eq_ignore_ascii_case("authorization") {
                map.entry(&name, &format_args!("<redacted {}>", key_fingerprint(value)));
            } else {
                map.entry(&name, &value);
            }
        }
        map.finish()
    }
}

/// An outbound event request, built but not yet sent.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRequest {
    pub method: &'static str,
    pub url: String,
    pub headers: Headers,
    pub body: Value,
}

impl EventRequest {
    pub fn post(url: impl Into<String>, headers: Headers, body: Value) -> Self {
        Self {
            method: "POST",
            url: url.into(),
            headers,
            body,
        }
    }

    /// Compact JSON encoding of the body, as sent on the wire.
    pub fn body_string(&self) -> String {
        self.body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_replaces_case_insensitively() {
        let mut headers = Headers::new();
        assert_eq!(headers.insert("Accept", "text/plain"), None);
        assert_eq!(
            headers.insert("accept", "application/json"),
            Some("text/plain".to_string())
        );
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("ACCEPT"), Some("application/json"));
    }

    #[test]
    fn keeps_insertion_order() {
        let mut headers = Headers::new();
        headers.insert("Authorization", "Bearer k");
        headers.insert("Content-Type", "application/json");
        headers.insert("Accept", "application/json");
        let names: Vec<&str> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["Authorization", "Content-Type", "Accept"]);
    }

    #[test]
    fn remove_returns_value() {
        let mut headers = Headers::new();
        headers.insert("Authorization", "Bearer k");
        assert_eq!(headers.remove("authorization"), Some("Bearer k".to_string()));
        assert!(headers.is_empty());
        assert_eq!(headers.remove("authorization"), None);
    }

    #[test]
    fn debug_redacts_authorization() {
        let mut headers = Headers::new();
        headers.insert("Authorization", "Bearer super-secret");
        headers.insert("Accept", "application/json");
        let rendered = format!("{headers:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted sha256:"));
        assert!(rendered.contains("application/json"));
    }

    #[test]
    fn body_is_compact_json() {
        let request = EventRequest::post(
            "http://h/api/events",
            Headers::new(),
            json!({"event": "t", "properties": {}}),
        );
        assert_eq!(request.method, "POST");
        assert_eq!(request.body_string(), r#"{"event":"t","properties":{}}"#);
    }
}
