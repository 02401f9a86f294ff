//! Tower layer that validates requests against an endpoint doc.

use crate::query::{parse_query, QueryParsing};
use crate::response::{bad_query_response, status_for, validation_response};
use bytes::Bytes;
use docgate_validate::{Doc, QuerySource, ValidationError, Validator};
use futures_util::future::{self, Either, Ready};
use serde_json::{Map, Value};
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Query values of a request that passed validation.
///
/// Inserted into the request extensions before the inner service runs, so
/// handlers can read the typed values without parsing the query again.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedQuery(pub Map<String, Value>);

impl ValidatedQuery {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

struct HttpQuery<'a> {
    method: &'a str,
    query: &'a Map<String, Value>,
}

impl QuerySource for HttpQuery<'_> {
    fn method(&self) -> &str {
        self.method
    }

    fn query_param(&self, name: &str) -> Option<&Value> {
        self.query.get(name)
    }
}

/// Layer that rejects requests not matching a [`Doc`].
///
/// # Example
///
/// ```rust,ignore
/// use docgate_http::DocValidationLayer;
/// use docgate_validate::{Doc, ParamSpec, ParamType};
///
/// let doc = Doc::new("get").param(ParamSpec::new("token", ParamType::String).required());
///
/// let service = tower::ServiceBuilder::new()
///     .layer(DocValidationLayer::new(doc))
///     .service(handler);
/// ```
#[derive(Debug, Clone)]
pub struct DocValidationLayer {
    validator: Validator,
    parsing: QueryParsing,
}

impl DocValidationLayer {
    /// Create a layer for `doc` with [`QueryParsing::Declared`].
    pub fn new(doc: Doc) -> Self {
        Self::from_validator(Validator::new(doc))
    }

    /// Create a layer around an existing validator.
    pub fn from_validator(validator: Validator) -> Self {
        Self {
            validator,
            parsing: QueryParsing::default(),
        }
    }

    /// Set how query strings are turned into typed values.
    pub fn with_parsing(mut self, parsing: QueryParsing) -> Self {
        self.parsing = parsing;
        self
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }
}

impl<S> Layer<S> for DocValidationLayer {
    type Service = DocValidationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DocValidationService {
            inner,
            validator: self.validator.clone(),
            parsing: self.parsing,
        }
    }
}

/// Service produced by [`DocValidationLayer`].
#[derive(Debug, Clone)]
pub struct DocValidationService<S> {
    inner: S,
    validator: Validator,
    parsing: QueryParsing,
}

impl<S> DocValidationService<S> {
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn check<B, ResBody>(&self, req: &http::Request<B>) -> Result<ValidatedQuery, http::Response<ResBody>>
    where
        ResBody: From<Bytes>,
    {
        let method = req.method().as_str();
        let path = req.uri().path();

        self.validator.check_method(method).map_err(|e| reject(method, path, &e))?;

        let raw = req.uri().query().unwrap_or("");
        let query = parse_query(raw, self.validator.doc(), self.parsing).map_err(|e| {
            tracing::warn!(method = %method, path = %path, error = %e, "Query string rejected");
            bad_query_response(&e)
        })?;

        let source = HttpQuery {
            method,
            query: &query,
        };
        self.validator
            .validate(&source)
            .map(|()| ValidatedQuery(query))
            .map_err(|e| reject(method, path, &e))
    }
}

fn reject<ResBody: From<Bytes>>(method: &str, path: &str, e: &ValidationError) -> http::Response<ResBody> {
    tracing::warn!(
        method = %method,
        path = %path,
        status = status_for(e.code()).as_u16(),
        code = e.code().as_u8(),
        "Request rejected by doc"
    );
    validation_response(e)
}

impl<S, ReqBody, ResBody> Service<http::Request<ReqBody>> for DocValidationService<S>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<ResBody>>,
    ResBody: From<Bytes>,
{
    type Response = http::Response<ResBody>;
    type Error = S::Error;
    type Future = Either<Ready<Result<Self::Response, Self::Error>>, S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<ReqBody>) -> Self::Future {
        match self.check(&req) {
            Ok(query) => {
                req.extensions_mut().insert(query);
                Either::Right(self.inner.call(req))
            }
            Err(response) => Either::Left(future::ready(Ok(response))),
        }
    }
}
