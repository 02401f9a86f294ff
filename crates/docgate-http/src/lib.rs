//! # docgate HTTP adapter
//!
//! Runs [`docgate_validate`] in front of a `tower` service. The layer reads
//! the method and query string of an `http::Request`, turns query values
//! into typed JSON values, and validates them against the endpoint doc.
//!
//! Rejected requests never reach the inner service; they are answered with
//! a JSON error:
//!
//! | Code | Status |
//! |------|--------|
//! | 1 wrong method | 405 Method Not Allowed |
//! | 2 missing parameter | 400 Bad Request |
//! | 3 wrong type | 400 Bad Request |
//! | 4 test failed | 422 Unprocessable Entity |
//!
//! Accepted requests carry a [`ValidatedQuery`] extension with the parsed
//! values.

mod layer;
mod query;
mod response;

pub use layer::{DocValidationLayer, DocValidationService, ValidatedQuery};
pub use query::{parse_query, QueryError, QueryParsing};
pub use response::{bad_query_response, status_for, validation_response};
