//! Declared query parameter types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Runtime type a query parameter must have.
///
/// Matched against the intrinsic JSON type of the value. No coercion is
/// performed: `"5"` is a string, `5` is a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    /// The type of a JSON value, or `None` for `null`.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => Some(ParamType::String),
            Value::Number(_) => Some(ParamType::Number),
            Value::Bool(_) => Some(ParamType::Boolean),
            Value::Array(_) => Some(ParamType::Array),
            Value::Object(_) => Some(ParamType::Object),
            Value::Null => None,
        }
    }

    /// Whether `value` has this type.
    pub fn matches(self, value: &Value) -> bool {
        Self::of(value) == Some(self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
