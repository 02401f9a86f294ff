//! Query string parsing into the typed values the validator checks.

use docgate_validate::{Doc, ParamType};
use percent_encoding::percent_decode_str;
use serde_json::{Map, Number, Value};
use std::borrow::Cow;

/// How raw query strings become typed values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryParsing {
    /// Convert each value toward the type the doc declares for it.
    ///
    /// Values that do not convert stay strings, so the validator reports a
    /// type mismatch. Undeclared parameters stay strings.
    #[default]
    Declared,
    /// Turn `true`/`false` into booleans and numeric text into numbers,
    /// regardless of the doc.
    Infer,
    /// Keep every value a string.
    Strings,
}

/// The query string could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// A `%` not followed by two hex digits
    #[error("invalid query string: malformed percent escape in \"{0}\"")]
    MalformedEscape(String),
    /// Escapes that decode to bytes which are not UTF-8
    #[error("invalid query string: \"{0}\" is not valid UTF-8")]
    InvalidUtf8(String),
}

/// Parse `query` (without the leading `?`) into a map of typed values.
///
/// Decoding is strict: a malformed `%` escape or an escape sequence that
/// is not UTF-8 fails the whole query instead of being passed through or
/// replaced. A key that appears more than once becomes an array of its
/// values, in order of appearance.
pub fn parse_query(
    query: &str,
    doc: &Doc,
    mode: QueryParsing,
) -> Result<Map<String, Value>, QueryError> {
    let mut map = Map::new();
    for segment in query.split('&').filter(|s| !s.is_empty()) {
        let (key, raw) = segment.split_once('=').unwrap_or((segment, ""));
        let key = decode(key)?;
        let raw = decode(raw)?;

        let declared = doc.get(&key).map(|spec| spec.param_type);
        let value = convert(raw, declared, mode);
        match map.get_mut(&key) {
            None => {
                map.insert(key, value);
            }
            Some(Value::Array(items)) => match value {
                Value::Array(more) => items.extend(more),
                value => items.push(value),
            },
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }
    Ok(map)
}

/// Decode one `application/x-www-form-urlencoded` component.
fn decode(component: &str) -> Result<String, QueryError> {
    let component: Cow<'_, str> = if component.contains('+') {
        Cow::Owned(component.replace('+', " "))
    } else {
        Cow::Borrowed(component)
    };

    let bytes = component.as_bytes();
    let mut i = 0;
    while let Some(offset) = bytes[i..].iter().position(|&b| b == b'%') {
        let at = i + offset;
        let escape = bytes.get(at + 1..at + 3);
        if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
            return Err(QueryError::MalformedEscape(component.into_owned()));
        }
        i = at + 3;
    }

    percent_decode_str(&component)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|_| QueryError::InvalidUtf8(component.to_string()))
}

fn convert(raw: String, declared: Option<ParamType>, mode: QueryParsing) -> Value {
    match mode {
        QueryParsing::Strings => Value::String(raw),
        QueryParsing::Infer => infer(raw),
        QueryParsing::Declared => match declared {
            Some(ParamType::Number) => parse_number(&raw).map_or(Value::String(raw), Value::Number),
            Some(ParamType::Boolean) => parse_bool(&raw).map_or(Value::String(raw), Value::Bool),
            Some(ParamType::Array) => Value::Array(vec![Value::String(raw)]),
            _ => Value::String(raw),
        },
    }
}

fn infer(raw: String) -> Value {
    if let Some(b) = parse_bool(&raw) {
        return Value::Bool(b);
    }
    match parse_number(&raw) {
        Some(n) => Value::Number(n),
        None => Value::String(raw),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn parse_number(raw: &str) -> Option<Number> {
    if raw.is_empty() || raw.trim() != raw {
        return None;
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n.into());
    }
    if let Ok(n) = raw.parse::<u64>() {
        return Some(n.into());
    }
    // "inf" and "NaN" parse as f64 but are not JSON numbers
    raw.parse::<f64>().ok().and_then(Number::from_f64)
}
