//! Validation error types, message rendering, and the JSON error format.

use crate::rules::ValidationFailure;
use crate::types::ParamType;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;

/// Numeric classification of a rejected request.
///
/// The discriminants are stable and exposed through [`ErrorCode::as_u8`] so
/// callers can branch on them without matching message strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    /// Request method differs from the doc's method
    WrongMethod = 1,
    /// A required query parameter is absent
    MissingRequiredParam = 2,
    /// A query parameter is present with the wrong type
    WrongParamType = 3,
    /// A rule or custom test rejected the value
    CustomTestFailed = 4,
}

impl ErrorCode {
    /// The numeric code.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Short machine-readable name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::WrongMethod => "wrong_method",
            ErrorCode::MissingRequiredParam => "missing_required_param",
            ErrorCode::WrongParamType => "wrong_param_type",
            ErrorCode::CustomTestFailed => "custom_test_failed",
        }
    }
}

impl TryFrom<u8> for ErrorCode {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(ErrorCode::WrongMethod),
            2 => Ok(ErrorCode::MissingRequiredParam),
            3 => Ok(ErrorCode::WrongParamType),
            4 => Ok(ErrorCode::CustomTestFailed),
            other => Err(other),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

/// The part of the doc a failure refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorContext {
    /// The endpoint doc itself (method mismatch)
    Doc {
        /// Method the doc expects
        method: String,
    },
    /// A single query parameter spec
    Param {
        /// Parameter name
        name: String,
        /// Declared parameter type
        param_type: ParamType,
        /// Underlying test failure message, if any
        reason: Option<String>,
    },
}

impl ErrorContext {
    /// Name of the parameter, when the context is a parameter.
    pub fn param_name(&self) -> Option<&str> {
        match self {
            ErrorContext::Param { name, .. } => Some(name),
            ErrorContext::Doc { .. } => None,
        }
    }
}

/// Render the human-readable message for a code and its context.
///
/// Pure: the same inputs always produce the same message.
pub fn render_message(code: ErrorCode, context: &ErrorContext) -> String {
    match (code, context) {
        (ErrorCode::WrongMethod, ErrorContext::Doc { method }) => {
            format!("wrong request method, expected \"{}\"", method.trim().to_ascii_uppercase())
        }
        (ErrorCode::MissingRequiredParam, ErrorContext::Param { name, .. }) => {
            format!("missing required query parameter \"{name}\"")
        }
        (ErrorCode::WrongParamType, ErrorContext::Param { name, param_type, .. }) => {
            format!("query parameter \"{name}\" must be of type {param_type}")
        }
        (ErrorCode::CustomTestFailed, ErrorContext::Param { name, reason, .. }) => {
            let reason = reason.as_deref().unwrap_or("test rejected the value");
            format!("query parameter \"{name}\" failed validation: {reason}")
        }
        _ => "request does not match endpoint doc".to_string(),
    }
}

/// A classified request validation failure.
///
/// Carries a numeric [`ErrorCode`], the rendered message, and the doc
/// context that failed. Serializes to the standard error envelope:
///
/// ```json
/// {
///   "error": {
///     "type": "validation_error",
///     "code": 2,
///     "message": "missing required query parameter \"token\"",
///     "param": "token"
///   }
/// }
/// ```
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    code: ErrorCode,
    message: String,
    context: ErrorContext,
    #[source]
    failure: Option<ValidationFailure>,
}

impl ValidationError {
    /// Build an error, rendering its message from the code and context.
    pub fn new(code: ErrorCode, context: ErrorContext) -> Self {
        Self {
            message: render_message(code, &context),
            code,
            context,
            failure: None,
        }
    }

    pub(crate) fn wrong_method(method: &str) -> Self {
        Self::new(
            ErrorCode::WrongMethod,
            ErrorContext::Doc {
                method: method.to_string(),
            },
        )
    }

    pub(crate) fn missing(name: &str, param_type: ParamType) -> Self {
        Self::new(
            ErrorCode::MissingRequiredParam,
            ErrorContext::Param {
                name: name.to_string(),
                param_type,
                reason: None,
            },
        )
    }

    pub(crate) fn wrong_type(name: &str, param_type: ParamType) -> Self {
        Self::new(
            ErrorCode::WrongParamType,
            ErrorContext::Param {
                name: name.to_string(),
                param_type,
                reason: None,
            },
        )
    }

    pub(crate) fn test_failed(name: &str, param_type: ParamType, failure: ValidationFailure) -> Self {
        let mut error = Self::new(
            ErrorCode::CustomTestFailed,
            ErrorContext::Param {
                name: name.to_string(),
                param_type,
                reason: Some(failure.message.clone()),
            },
        );
        error.failure = Some(failure);
        error
    }

    /// The error classification.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The rendered message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The doc context that failed.
    pub fn context(&self) -> &ErrorContext {
        &self.context
    }

    /// The rule or test failure behind a [`ErrorCode::CustomTestFailed`].
    pub fn failure(&self) -> Option<&ValidationFailure> {
        self.failure.as_ref()
    }
}

impl Serialize for ValidationError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Body<'a>(&'a ValidationError);

        impl Serialize for Body<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let param = self.0.context.param_name();
                let len = if param.is_some() { 4 } else { 3 };
                let mut state = serializer.serialize_struct("ErrorBody", len)?;
                state.serialize_field("type", "validation_error")?;
                state.serialize_field("code", &self.0.code)?;
                state.serialize_field("message", &self.0.message)?;
                if let Some(param) = param {
                    state.serialize_field("param", param)?;
                }
                state.end()
            }
        }

        #[derive(Serialize)]
        struct Envelope<'a> {
            error: Body<'a>,
        }

        Envelope { error: Body(self) }.serialize(serializer)
    }
}

/// Error raised while loading or checking a [`crate::Doc`].
#[derive(Debug, thiserror::Error)]
pub enum DocError {
    /// The JSON document could not be parsed
    #[error("invalid doc JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The doc declares no method
    #[error("doc method must not be empty")]
    EmptyMethod,
    /// Two parameter specs share a name
    #[error("duplicate query parameter \"{0}\"")]
    DuplicateParam(String),
    /// A rule definition is unusable
    #[error("invalid rule for query parameter \"{param}\": {reason}")]
    InvalidRule {
        /// Parameter that owns the rule
        param: String,
        /// What is wrong with it
        reason: String,
    },
}
