//! Canonical scalar forms for custom record attributes.
//!
//! Both conversions are total: anything that has no sensible string or
//! numeric form falls back to `""` or `0`.

use serde_json::{Number, Value};

/// Coerce an attribute value to a JSON string.
///
/// Strings pass through, numbers and booleans use their display form, nested
/// objects and arrays are serialized as compact JSON, and `null` becomes `""`.
pub fn string_value(value: &Value) -> Value {
    let s = match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    };
    Value::String(s)
}

/// Coerce an attribute value to a JSON number.
///
/// Numeric strings are parsed (surrounding whitespace ignored, empty is `0`),
/// booleans map to `1`/`0`. Anything unparseable, non-finite or structured
/// becomes `0`. Integral results are emitted as integers.
pub fn number_value(value: &Value) -> Value {
    let n = match value {
        Value::Number(n) => return Value::Number(n.clone()),
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(s) => parse_number(s),
        Value::Null | Value::Array(_) | Value::Object(_) => 0.0,
    };
    Value::Number(to_json_number(n))
}

fn parse_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

fn to_json_number(n: f64) -> Number {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Number::from(n as i64)
    } else {
        Number::from_f64(n).unwrap_or_else(|| Number::from(0))
    }
}
