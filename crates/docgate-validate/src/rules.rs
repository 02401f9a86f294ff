//! Test predicates applied to query parameter values.
//!
//! A predicate either comes from the serializable [`Rule`] set, which can be
//! declared in a JSON doc, or is custom code implementing [`ParamTest`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;

/// Rejection returned by a test predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// Rule code (e.g. "min_length", "natural", "custom")
    pub code: String,
    /// Human-readable reason, surfaced verbatim to API consumers
    pub message: String,
}

impl ValidationFailure {
    /// Create a new failure.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&str> for ValidationFailure {
    fn from(message: &str) -> Self {
        Self::new("custom", message)
    }
}

impl From<String> for ValidationFailure {
    fn from(message: String) -> Self {
        Self::new("custom", message)
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationFailure {}

/// A predicate over a single query parameter value.
///
/// ## Example
///
/// ```rust
/// use docgate_validate::{ParamTest, ValidationFailure};
/// use serde_json::Value;
///
/// #[derive(Debug)]
/// struct Even;
///
/// impl ParamTest for Even {
///     fn test(&self, value: &Value) -> Result<(), ValidationFailure> {
///         match value.as_i64() {
///             Some(n) if n % 2 == 0 => Ok(()),
///             _ => Err(ValidationFailure::new("even", "must be even")),
///         }
///     }
///
///     fn name(&self) -> &str {
///         "even"
///     }
/// }
/// ```
pub trait ParamTest: fmt::Debug + Send + Sync {
    /// Check the value. Called only for present values of the declared type.
    fn test(&self, value: &Value) -> Result<(), ValidationFailure>;

    /// Name of the test, used in logs.
    fn name(&self) -> &str;
}

/// A [`ParamTest`] backed by a closure.
pub struct FnTest<F> {
    name: String,
    f: F,
}

impl<F> FnTest<F>
where
    F: Fn(&Value) -> Result<(), ValidationFailure> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> fmt::Debug for FnTest<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTest").field("name", &self.name).finish()
    }
}

impl<F> ParamTest for FnTest<F>
where
    F: Fn(&Value) -> Result<(), ValidationFailure> + Send + Sync,
{
    fn test(&self, value: &Value) -> Result<(), ValidationFailure> {
        (self.f)(value)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Built-in, serializable test predicates.
///
/// A rule applied to a value kind it does not understand passes; the type
/// check governs kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rule {
    /// Minimum string length (chars) or array length
    MinLength {
        min: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Maximum string length (chars) or array length
    MaxLength {
        max: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Inclusive numeric bounds
    Range {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Number without a fractional part
    Integer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Non-negative integer
    Natural {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Regex that must match the whole string
    Pattern(PatternRule),
    /// Value must equal one of the listed values
    OneOf {
        values: Vec<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

fn is_integer(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0
}

/// Full-match regex rule.
///
/// The regex is compiled once, on first use, and kept with the rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRule {
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip)]
    compiled: OnceLock<Regex>,
}

impl PartialEq for PatternRule {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.message == other.message
    }
}

impl PatternRule {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            message: None,
            compiled: OnceLock::new(),
        }
    }

    /// Set a custom error message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// The compiled, anchored regex.
    pub fn regex(&self) -> Result<&Regex, regex::Error> {
        if let Some(regex) = self.compiled.get() {
            return Ok(regex);
        }
        let regex = Regex::new(&format!("^(?:{})$", self.pattern))?;
        Ok(self.compiled.get_or_init(|| regex))
    }
}

fn measure(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

impl Rule {
    /// Check that the rule definition itself is usable.
    pub fn check(&self) -> Result<(), String> {
        match self {
            Rule::Range {
                min: Some(min),
                max: Some(max),
                ..
            } if min > max => Err(format!("range min {min} is greater than max {max}")),
            Rule::Pattern(rule) => rule
                .regex()
                .map(|_| ())
                .map_err(|e| format!("invalid pattern: {e}")),
            _ => Ok(()),
        }
    }

    fn fail(&self, message: &Option<String>, default: impl FnOnce() -> String) -> ValidationFailure {
        let message = message.clone().unwrap_or_else(default);
        ValidationFailure::new(self.name(), message)
    }
}

impl ParamTest for Rule {
    fn test(&self, value: &Value) -> Result<(), ValidationFailure> {
        match self {
            Rule::MinLength { min, message } => match measure(value) {
                Some(len) if len < *min => Err(self.fail(message, || {
                    format!("too short, must be at least {min} length")
                })),
                _ => Ok(()),
            },
            Rule::MaxLength { max, message } => match measure(value) {
                Some(len) if len > *max => Err(self.fail(message, || {
                    format!("too long, must be at most {max} length")
                })),
                _ => Ok(()),
            },
            Rule::Range { min, max, message } => {
                let Some(n) = value.as_f64() else {
                    return Ok(());
                };
                if let Some(min) = min {
                    if n < *min {
                        return Err(self.fail(message, || format!("must be at least {min}")));
                    }
                }
                if let Some(max) = max {
                    if n > *max {
                        return Err(self.fail(message, || format!("must be at most {max}")));
                    }
                }
                Ok(())
            }
            Rule::Integer { message } => match value.as_f64() {
                Some(n) if !is_integer(n) => {
                    Err(self.fail(message, || "must be integer".to_string()))
                }
                _ => Ok(()),
            },
            Rule::Natural { message } => {
                let Some(n) = value.as_f64() else {
                    return Ok(());
                };
                if n < 0.0 {
                    return Err(self.fail(message, || "must be greater than zero".to_string()));
                }
                if !is_integer(n) {
                    return Err(self.fail(message, || "must be integer".to_string()));
                }
                Ok(())
            }
            Rule::Pattern(rule) => {
                let Some(s) = value.as_str() else {
                    return Ok(());
                };
                // Unreachable for docs accepted by `Doc::check` or `Validator::new`.
                let regex = rule.regex().map_err(|e| {
                    tracing::error!(pattern = %rule.pattern, error = %e, "Pattern rule does not compile");
                    ValidationFailure::new(self.name(), "pattern rule is misconfigured")
                })?;
                if regex.is_match(s) {
                    Ok(())
                } else {
                    Err(self.fail(&rule.message, || format!("must match pattern {}", rule.pattern)))
                }
            }
            Rule::OneOf { values, message } => {
                if values.contains(value) {
                    Ok(())
                } else {
                    Err(self.fail(message, || {
                        let allowed: Vec<String> = values.iter().map(Value::to_string).collect();
                        format!("must be one of {}", allowed.join(", "))
                    }))
                }
            }
        }
    }

    fn name(&self) -> &str {
        match self {
            Rule::MinLength { .. } => "min_length",
            Rule::MaxLength { .. } => "max_length",
            Rule::Range { .. } => "range",
            Rule::Integer { .. } => "integer",
            Rule::Natural { .. } => "natural",
            Rule::Pattern(_) => "pattern",
            Rule::OneOf { .. } => "one_of",
        }
    }
}
