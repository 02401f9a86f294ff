//! # docgate validation
//!
//! Schema-driven validation of request query parameters. An endpoint is
//! described by a [`Doc`]: the method it accepts and the query parameters it
//! expects, each with a type, a required flag, and optional tests. A
//! [`Validator`] built from the doc checks incoming requests and returns a
//! classified [`ValidationError`] on the first mismatch.
//!
//! ## Example
//!
//! ```rust
//! use docgate_validate::prelude::*;
//!
//! let doc = Doc::new("get")
//!     .param(
//!         ParamSpec::new("token", ParamType::String)
//!             .required()
//!             .rule(Rule::MinLength { min: 16, message: None }),
//!     )
//!     .param(ParamSpec::new("limit", ParamType::Number).rule(Rule::Natural { message: None }));
//!
//! let validator = Validator::new(doc);
//!
//! let request = DocRequest::new("GET").query("token", "fc6d").query("limit", 5);
//! let err = validator.validate(&request).unwrap_err();
//! assert_eq!(err.code(), ErrorCode::CustomTestFailed);
//! assert!(err.message().contains("too short"));
//! ```
//!
//! ## Error codes
//!
//! | Code | Kind | Context |
//! |------|------|---------|
//! | 1 | wrong request method | doc |
//! | 2 | missing required parameter | parameter |
//! | 3 | wrong parameter type | parameter |
//! | 4 | rule or custom test failed | parameter |
//!
//! ## Error Format
//!
//! ```json
//! {
//!   "error": {
//!     "type": "validation_error",
//!     "code": 3,
//!     "message": "query parameter \"limit\" must be of type number",
//!     "param": "limit"
//!   }
//! }
//! ```

mod doc;
mod error;
mod request;
mod rules;
mod types;
mod validator;

pub use doc::{Doc, ParamSpec};
pub use error::{render_message, DocError, ErrorCode, ErrorContext, ValidationError};
pub use request::{DocRequest, QuerySource};
pub use rules::{FnTest, ParamTest, PatternRule, Rule, ValidationFailure};
pub use types::ParamType;
pub use validator::{validate, validator, Validator};

/// Prelude module for validation
pub mod prelude {
    pub use crate::doc::{Doc, ParamSpec};
    pub use crate::error::{ErrorCode, ValidationError};
    pub use crate::request::{DocRequest, QuerySource};
    pub use crate::rules::{ParamTest, PatternRule, Rule, ValidationFailure};
    pub use crate::types::ParamType;
    pub use crate::validator::Validator;
}
