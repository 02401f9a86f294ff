//! Request validation against an endpoint doc.

use crate::doc::Doc;
use crate::error::{DocError, ValidationError};
use crate::request::QuerySource;
use serde_json::Value;
use std::sync::Arc;

/// Check a request against a doc.
///
/// Order: method first, then each parameter in declared order (presence,
/// type, rules, custom test). The first failing check is returned.
pub fn validate<R: QuerySource + ?Sized>(request: &R, doc: &Doc) -> Result<(), ValidationError> {
    let result = check(request, doc);
    match &result {
        Ok(()) => tracing::debug!(
            method = %request.method(),
            params = doc.query_params.len(),
            "request matches doc"
        ),
        Err(e) => tracing::debug!(
            method = %request.method(),
            code = e.code().as_u8(),
            param = e.context().param_name().unwrap_or(""),
            reason = %e.message(),
            "request rejected"
        ),
    }
    result
}

/// Check only the request method against a doc.
pub fn check_method(method: &str, doc: &Doc) -> Result<(), ValidationError> {
    if method.eq_ignore_ascii_case(doc.method.trim()) {
        Ok(())
    } else {
        Err(ValidationError::wrong_method(&doc.method))
    }
}

fn check<R: QuerySource + ?Sized>(request: &R, doc: &Doc) -> Result<(), ValidationError> {
    check_method(request.method(), doc)?;

    for spec in &doc.query_params {
        let value = match request.query_param(&spec.name) {
            None | Some(Value::Null) if spec.required => {
                return Err(ValidationError::missing(&spec.name, spec.param_type));
            }
            None | Some(Value::Null) => continue,
            Some(value) => value,
        };

        if !spec.param_type.matches(value) {
            return Err(ValidationError::wrong_type(&spec.name, spec.param_type));
        }

        spec.run_tests(value)
            .map_err(|failure| ValidationError::test_failed(&spec.name, spec.param_type, failure))?;
    }

    Ok(())
}

/// A validator bound to one endpoint doc.
///
/// Cheap to clone; the doc is shared read-only between clones and across
/// concurrent requests.
///
/// ## Example
///
/// ```rust
/// use docgate_validate::{validator, Doc, DocRequest, ErrorCode, ParamSpec, ParamType};
///
/// let check = validator(Doc::new("get").param(ParamSpec::new("q", ParamType::String).required()));
///
/// let err = check.validate(&DocRequest::new("GET")).unwrap_err();
/// assert_eq!(err.code(), ErrorCode::MissingRequiredParam);
///
/// let ok = DocRequest::new("get").query("q", "rust");
/// assert_eq!(check.call(&ok, &mut (), || "next").unwrap(), "next");
/// ```
#[derive(Debug, Clone)]
pub struct Validator {
    doc: Arc<Doc>,
}

impl Validator {
    /// Bind a validator to `doc`.
    ///
    /// The doc's shape is trusted as given; only pattern rules are compiled
    /// up front.
    ///
    /// # Panics
    ///
    /// Panics if a pattern rule does not compile. Use [`Validator::try_new`]
    /// for docs from untrusted configuration.
    pub fn new(doc: Doc) -> Self {
        Self::from_shared(Arc::new(doc))
    }

    /// Bind a validator to an already shared doc. Panics like [`Validator::new`].
    pub fn from_shared(doc: Arc<Doc>) -> Self {
        if let Err(e) = doc.compile() {
            panic!("invalid endpoint doc: {e}");
        }
        Self { doc }
    }

    /// Bind a validator to `doc` after running [`Doc::check`].
    pub fn try_new(doc: Doc) -> Result<Self, DocError> {
        doc.check()?;
        Ok(Self { doc: Arc::new(doc) })
    }

    pub fn doc(&self) -> &Doc {
        &self.doc
    }

    /// Check only the request method. Adapters call this before decoding
    /// the query so a wrong method is reported ahead of a malformed query.
    pub fn check_method(&self, method: &str) -> Result<(), ValidationError> {
        check_method(method, &self.doc)
    }

    /// Check a request without a continuation.
    pub fn validate<R: QuerySource + ?Sized>(&self, request: &R) -> Result<(), ValidationError> {
        validate(request, &self.doc)
    }

    /// Middleware form: validate, then run `next` exactly once on success.
    ///
    /// `response` is the host framework's response context; it is passed
    /// through untouched.
    pub fn call<R, Res, T, F>(
        &self,
        request: &R,
        _response: &mut Res,
        next: F,
    ) -> Result<T, ValidationError>
    where
        R: QuerySource + ?Sized,
        Res: ?Sized,
        F: FnOnce() -> T,
    {
        self.validate(request)?;
        Ok(next())
    }
}

impl From<Doc> for Validator {
    fn from(doc: Doc) -> Self {
        Self::new(doc)
    }
}

/// Build a validator for `doc`.
pub fn validator(doc: Doc) -> Validator {
    Validator::new(doc)
}
