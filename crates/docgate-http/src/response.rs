//! Mapping rejected requests to HTTP responses.

use crate::query::QueryError;
use bytes::Bytes;
use docgate_validate::{ErrorCode, ValidationError};
use http::{header, HeaderValue, Response, StatusCode};
use serde::Serialize;

const SERIALIZE_FALLBACK: &[u8] =
    br#"{"error":{"type":"internal_error","message":"Failed to serialize error"}}"#;

/// HTTP status for a validation error code.
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::WrongMethod => StatusCode::METHOD_NOT_ALLOWED,
        ErrorCode::MissingRequiredParam | ErrorCode::WrongParamType => StatusCode::BAD_REQUEST,
        ErrorCode::CustomTestFailed => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

/// JSON error response for a rejected request.
pub fn validation_response<B: From<Bytes>>(error: &ValidationError) -> Response<B> {
    json_response(status_for(error.code()), error)
}

/// JSON error response for an undecodable query string.
pub fn bad_query_response<B: From<Bytes>>(error: &QueryError) -> Response<B> {
    #[derive(Serialize)]
    struct Body<'a> {
        #[serde(rename = "type")]
        error_type: &'a str,
        message: String,
    }

    #[derive(Serialize)]
    struct Envelope<'a> {
        error: Body<'a>,
    }

    let envelope = Envelope {
        error: Body {
            error_type: "bad_request",
            message: error.to_string(),
        },
    };
    json_response(StatusCode::BAD_REQUEST, &envelope)
}

fn json_response<B: From<Bytes>, T: Serialize>(status: StatusCode, body: &T) -> Response<B> {
    let body = serde_json::to_vec(body).unwrap_or_else(|_| SERIALIZE_FALLBACK.to_vec());

    let mut response = Response::new(B::from(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}
