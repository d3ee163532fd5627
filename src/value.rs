//! Dynamic values consumed and produced by validators.
//!
//! Inputs usually arrive as `serde_json::Value`; the engine works on this
//! closed tagged variant instead so every rule is an exhaustive match, and so
//! coerced temporal values have somewhere to live.
use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

pub type Record = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Record(Record),               // insertion order preserved
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Duration(IsoDuration),
}

/// ISO-8601 duration, kept component-wise (`P1Y2M` is not a fixed number of
/// seconds).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IsoDuration {
    pub years: u32,
    pub months: u32,
    pub weeks: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: f64,
}

// ------------------------------ Accessors ---------------------------------- //

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::List(_) => "List",
            Value::Record(_) => "Record",
            Value::DateTime(_) => "DateTime",
            Value::Date(_) => "Date",
            Value::Duration(_) => "Duration",
        }
    }

    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

    pub fn as_i64(&self) -> Option<i64> {
        match self { Value::Int(i) => Some(*i), _ => None }
    }

    /// Int and Float both read as f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self { Value::String(s) => Some(s), _ => None }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self { Value::List(xs) => Some(xs), _ => None }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self { Value::Record(m) => Some(m), _ => None }
    }

    /// Field lookup on records; `None` for anything else.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_record().and_then(|m| m.get(key))
    }

    pub fn as_datetime(&self) -> Option<&NaiveDateTime> {
        match self { Value::DateTime(dt) => Some(dt), _ => None }
    }

    pub fn year(&self) -> Option<i32> {
        match self {
            Value::DateTime(dt) => Some(dt.year()),
            Value::Date(d) => Some(d.year()),
            _ => None,
        }
    }

    pub fn month(&self) -> Option<u32> {
        match self {
            Value::DateTime(dt) => Some(dt.month()),
            Value::Date(d) => Some(d.month()),
            _ => None,
        }
    }

    pub fn day(&self) -> Option<u32> {
        match self {
            Value::DateTime(dt) => Some(dt.day()),
            Value::Date(d) => Some(d.day()),
            _ => None,
        }
    }

    pub fn hour(&self) -> Option<u32> { self.as_datetime().map(|dt| dt.hour()) }
    pub fn minute(&self) -> Option<u32> { self.as_datetime().map(|dt| dt.minute()) }
    pub fn second(&self) -> Option<u32> { self.as_datetime().map(|dt| dt.second()) }

    /// Short human description used in error messages:
    /// strings are quoted, everything else is named by kind.
    pub fn describe(&self) -> String {
        match self {
            Value::String(s) => serde_json::Value::from(s.as_str()).to_string(),
            other => other.kind_name().to_string(),
        }
    }
}

// ---------------------------- serde_json bridge ---------------------------- //

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                // u64 beyond i64::MAX and real floats
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(xs) => Value::List(xs.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(m) => {
                Value::Record(m.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(v: &serde_json::Value) -> Self { Value::from(v.clone()) }
}

impl From<bool> for Value { fn from(b: bool) -> Self { Value::Bool(b) } }
impl From<i64> for Value { fn from(i: i64) -> Self { Value::Int(i) } }
impl From<i32> for Value { fn from(i: i32) -> Self { Value::Int(i as i64) } }
impl From<f64> for Value { fn from(f: f64) -> Self { Value::Float(f) } }
impl From<&str> for Value { fn from(s: &str) -> Self { Value::String(s.to_string()) } }
impl From<String> for Value { fn from(s: String) -> Self { Value::String(s) } }
impl From<Vec<Value>> for Value { fn from(xs: Vec<Value>) -> Self { Value::List(xs) } }
impl From<Record> for Value { fn from(m: Record) -> Self { Value::Record(m) } }

impl Value {
    /// Lossy for temporal values (rendered as ISO strings) and for non-finite
    /// floats (rendered as null, as serde_json does).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(xs) => serde_json::Value::Array(xs.iter().map(Value::to_json).collect()),
            Value::Record(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::DateTime(_) | Value::Date(_) | Value::Duration(_) => {
                serde_json::Value::String(self.to_string())
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(xs) => {
                let mut seq = serializer.serialize_seq(Some(xs.len()))?;
                for x in xs { seq.serialize_element(x)?; }
                seq.end()
            }
            Value::Record(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (k, v) in m { map.serialize_entry(k, v)?; }
                map.end()
            }
            Value::DateTime(_) | Value::Date(_) | Value::Duration(_) => {
                serializer.collect_str(self)
            }
        }
    }
}

// ------------------------------- Display ----------------------------------- //

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Duration(d) => write!(f, "{d}"),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl fmt::Display for IsoDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P")?;
        if self.years > 0 { write!(f, "{}Y", self.years)?; }
        if self.months > 0 { write!(f, "{}M", self.months)?; }
        if self.weeks > 0 { write!(f, "{}W", self.weeks)?; }
        if self.days > 0 { write!(f, "{}D", self.days)?; }
        let has_time = self.hours > 0 || self.minutes > 0 || self.seconds > 0.0;
        if has_time {
            write!(f, "T")?;
            if self.hours > 0 { write!(f, "{}H", self.hours)?; }
            if self.minutes > 0 { write!(f, "{}M", self.minutes)?; }
            if self.seconds > 0.0 { write!(f, "{}S", self.seconds)?; }
        }
        if *self == IsoDuration::default() {
            write!(f, "T0S")?;
        }
        Ok(())
    }
}

// ------------------------------- Tests ------------------------------------ //
