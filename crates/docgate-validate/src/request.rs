//! The request view the validator reads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Read-only access to the parts of a request the validator checks.
///
/// Implement this for a host framework's request type to validate it in
/// place. Values are expected to be parsed already; the validator does not
/// coerce.
pub trait QuerySource {
    /// The request method, in any case.
    fn method(&self) -> &str;

    /// The parsed value of a query parameter, if present.
    fn query_param(&self, name: &str) -> Option<&Value>;
}

/// An owned request: method plus parsed query map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocRequest {
    pub method: String,
    #[serde(default)]
    pub query: Map<String, Value>,
}

impl DocRequest {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            query: Map::new(),
        }
    }

    /// Build a request from a method and an already parsed query map.
    pub fn with_query(method: impl Into<String>, query: Map<String, Value>) -> Self {
        Self {
            method: method.into(),
            query,
        }
    }

    /// Set a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }
}

impl QuerySource for DocRequest {
    fn method(&self) -> &str {
        &self.method
    }

    fn query_param(&self, name: &str) -> Option<&Value> {
        self.query.get(name)
    }
}

impl<T: QuerySource + ?Sized> QuerySource for &T {
    fn method(&self) -> &str {
        (**self).method()
    }

    fn query_param(&self, name: &str) -> Option<&Value> {
        (**self).query_param(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_sets_query_values() {
        let req = DocRequest::new("get").query("limit", 5).query("token", "abc");
        assert_eq!(req.method(), "get");
        assert_eq!(req.query_param("limit"), Some(&json!(5)));
        assert_eq!(req.query_param("token"), Some(&json!("abc")));
        assert_eq!(req.query_param("offset"), None);
    }

    #[test]
    fn deserializes_from_json() {
        let req: DocRequest =
            serde_json::from_value(json!({"method": "GET", "query": {"offset": 25}})).unwrap();
        assert_eq!(req.query_param("offset"), Some(&json!(25)));
    }
}
