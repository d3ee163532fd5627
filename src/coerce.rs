//! Coercion rules: (target primitive kind, input) → canonical value.
//!
//! Upstream data is mostly stringly-typed, so numeric, boolean and temporal
//! kinds accept their string spellings. The rules stop short of anything that
//! would hide a bug:
//! - booleans never widen to integers, integers never become booleans;
//! - nothing is stringified;
//! - `Null` only satisfies `Null` (and `Any`).
pub mod num;
pub mod temporal;

use crate::error::ErrorKind;
use crate::ir::Kind;
use crate::value::Value;

/// Why a single coercion failed; the engine attaches the path.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl Failure {
    /// Wrong kind of value altogether.
    fn mismatch(target: &str, input: &Value) -> Self {
        Failure {
            kind: ErrorKind::TypeMismatch,
            message: format!("expected {target}, got {}", input.describe()),
        }
    }

    /// A string that doesn't parse as the target.
    fn unparsable(target: &str, input: &Value) -> Self {
        Failure {
            kind: ErrorKind::CoercionFailure,
            message: format!("expected {target}, got {}", input.describe()),
        }
    }
}

pub fn coerce(kind: Kind, input: &Value) -> Result<Value, Failure> {
    let target = kind.name();
    match kind {
        Kind::Any => Ok(input.clone()),

        Kind::Null => match input {
            Value::Null => Ok(Value::Null),
            other => Err(Failure::mismatch(target, other)),
        },

        Kind::Bool => match input {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::String(s) if s == "true" => Ok(Value::Bool(true)),
            Value::String(s) if s == "false" => Ok(Value::Bool(false)),
            Value::String(_) => Err(Failure::unparsable(target, input)),
            other => Err(Failure::mismatch(target, other)),
        },

        Kind::Int => match input {
            Value::Int(i) => Ok(Value::Int(*i)),
            Value::String(s) => num::parse_int(s)
                .map(Value::Int)
                .ok_or_else(|| Failure::unparsable(target, input)),
            other => Err(Failure::mismatch(target, other)),
        },

        Kind::Float => match input {
            Value::Float(f) => Ok(Value::Float(*f)),
            Value::Int(i) => Ok(Value::Float(*i as f64)),
            Value::String(s) => num::parse_float(s)
                .map(Value::Float)
                .ok_or_else(|| Failure::unparsable(target, input)),
            other => Err(Failure::mismatch(target, other)),
        },

        Kind::String => match input {
            Value::String(s) => Ok(Value::String(s.clone())),
            other => Err(Failure::mismatch(target, other)),
        },

        Kind::DateTime => match input {
            Value::DateTime(dt) => Ok(Value::DateTime(*dt)),
            Value::String(s) => temporal::parse_datetime(s)
                .map(Value::DateTime)
                .ok_or_else(|| Failure {
                    kind: ErrorKind::CoercionFailure,
                    message: format!("expected {target}, got invalid datetime {}", input.describe()),
                }),
            other => Err(Failure::mismatch(target, other)),
        },

        Kind::Date => match input {
            Value::Date(d) => Ok(Value::Date(*d)),
            Value::DateTime(dt) => Ok(Value::Date(dt.date())),
            Value::String(s) => temporal::parse_date(s)
                .map(Value::Date)
                .ok_or_else(|| Failure::unparsable("Date (YYYY-MM-DD)", input)),
            other => Err(Failure::mismatch("Date (YYYY-MM-DD)", other)),
        },

        Kind::Duration => match input {
            Value::Duration(d) => Ok(Value::Duration(*d)),
            Value::String(s) => temporal::parse_duration(s)
                .map(Value::Duration)
                .ok_or_else(|| Failure::unparsable("Duration (ISO 8601)", input)),
            other => Err(Failure::mismatch("Duration (ISO 8601)", other)),
        },
    }
}

// ------------------------------- Tests ------------------------------------ //
