//! Endpoint docs: the declarative description of an endpoint's expected
//! method and query parameters.

use crate::error::DocError;
use crate::rules::{FnTest, ParamTest, Rule, ValidationFailure};
use crate::types::ParamType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Schema entry for a single query parameter.
///
/// `rules` are declarative and survive JSON round-trips; `test` holds a
/// custom predicate set in code and is skipped by serde.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Rule>,
    #[serde(skip)]
    pub test: Option<Arc<dyn ParamTest>>,
}

impl ParamSpec {
    /// An optional parameter of the given type.
    pub fn new(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: false,
            rules: Vec::new(),
            test: None,
        }
    }

    /// Mark the parameter as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Append a built-in rule.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Set the custom test from a closure.
    pub fn test<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> Result<(), ValidationFailure> + Send + Sync + 'static,
    {
        self.test_with(FnTest::new(name, f))
    }

    /// Set the custom test from a [`ParamTest`] implementation.
    pub fn test_with(mut self, test: impl ParamTest + 'static) -> Self {
        self.test = Some(Arc::new(test));
        self
    }

    /// Run the rules, then the custom test, stopping at the first failure.
    pub fn run_tests(&self, value: &Value) -> Result<(), ValidationFailure> {
        for rule in &self.rules {
            rule.test(value)?;
        }
        match &self.test {
            Some(test) => test.test(value),
            None => Ok(()),
        }
    }
}

/// Declarative schema for one endpoint.
///
/// ## Example
///
/// ```rust
/// use docgate_validate::{Doc, ParamSpec, ParamType, Rule};
///
/// let doc = Doc::new("get")
///     .param(
///         ParamSpec::new("token", ParamType::String)
///             .required()
///             .rule(Rule::MinLength { min: 16, message: None }),
///     )
///     .param(ParamSpec::new("limit", ParamType::Number).rule(Rule::Natural { message: None }));
///
/// assert_eq!(doc.query_params.len(), 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doc {
    pub method: String,
    #[serde(default)]
    pub query_params: Vec<ParamSpec>,
}

impl Doc {
    /// A doc for `method` with no query parameters.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            query_params: Vec::new(),
        }
    }

    /// Append a parameter spec. Declaration order is check order.
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.query_params.push(spec);
        self
    }

    /// Look up a parameter spec by name.
    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.query_params.iter().find(|p| p.name == name)
    }

    /// Parse a doc from JSON and check it.
    pub fn from_json(json: &str) -> Result<Self, DocError> {
        let doc: Doc = serde_json::from_str(json)?;
        doc.check()?;
        Ok(doc)
    }

    /// Compile every pattern rule, failing on the first one that does not
    /// compile. Compiled regexes stay cached in the doc.
    pub fn compile(&self) -> Result<(), DocError> {
        for spec in &self.query_params {
            for rule in &spec.rules {
                if let Rule::Pattern(pattern) = rule {
                    pattern.regex().map_err(|e| DocError::InvalidRule {
                        param: spec.name.clone(),
                        reason: format!("invalid pattern: {e}"),
                    })?;
                }
            }
        }
        Ok(())
    }

    /// Check the doc's shape: a method, unique parameter names and usable rules.
    pub fn check(&self) -> Result<(), DocError> {
        if self.method.trim().is_empty() {
            return Err(DocError::EmptyMethod);
        }

        let mut seen = HashSet::new();
        for spec in &self.query_params {
            if !seen.insert(spec.name.as_str()) {
                return Err(DocError::DuplicateParam(spec.name.clone()));
            }
            for rule in &spec.rules {
                rule.check().map_err(|reason| DocError::InvalidRule {
                    param: spec.name.clone(),
                    reason,
                })?;
            }
        }
        Ok(())
    }
}
