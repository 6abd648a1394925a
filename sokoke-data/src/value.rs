use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::Serialize;

use crate::entity::FieldKind;

/// Fixed-width timestamp layout shared by every backend.
///
/// Millisecond precision, always UTC, so lexical order is chronological.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// A dynamic scalar used in filters, range bounds and write payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    #[serde(serialize_with = "serialize_timestamp")]
    Timestamp(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Normalise a loosely typed value to the storage type of a field.
    ///
    /// Values that cannot be converted are returned unchanged and simply
    /// match nothing.
    pub fn coerce(self, kind: FieldKind) -> Value {
        match (kind, self) {
            (_, Value::Null) => Value::Null,
            (FieldKind::Id | FieldKind::Text | FieldKind::Reference, value) => match value {
                Value::Integer(i) => Value::Text(i.to_string()),
                Value::Float(f) => Value::Text(f.to_string()),
                Value::Bool(b) => Value::Text(b.to_string()),
                Value::Timestamp(t) => Value::Text(format_timestamp(&t)),
                other => other,
            },
            (FieldKind::Integer, Value::Float(f)) if f.fract() == 0.0 => Value::Integer(f as i64),
            (FieldKind::Integer, Value::Text(s)) => match s.parse::<i64>() {
                Ok(i) => Value::Integer(i),
                Err(_) => Value::Text(s),
            },
            (FieldKind::Float, Value::Integer(i)) => Value::Float(i as f64),
            (FieldKind::Float, Value::Text(s)) => match s.parse::<f64>() {
                Ok(f) if f.is_finite() => Value::Float(f),
                _ => Value::Text(s),
            },
            (FieldKind::Boolean, Value::Integer(0)) => Value::Bool(false),
            (FieldKind::Boolean, Value::Integer(1)) => Value::Bool(true),
            (FieldKind::Timestamp, Value::Text(s)) => match parse_timestamp(&s) {
                Some(t) => Value::Timestamp(t),
                None => Value::Text(s),
            },
            (FieldKind::Timestamp, Value::Integer(ms)) => {
                match DateTime::<Utc>::from_timestamp_millis(ms) {
                    Some(t) => Value::Timestamp(t),
                    None => Value::Integer(ms),
                }
            }
            (_, value) => value,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Timestamp(t)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Current time, truncated to the millisecond precision every backend stores.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc).trunc_subsecs(3));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn serialize_timestamp<S: serde::Serializer>(t: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_timestamp(t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn numeric_value_aimed_at_text_field_becomes_text() {
        assert_eq!(
            Value::Integer(42).coerce(FieldKind::Text),
            Value::Text("42".into())
        );
    }

    #[test]
    fn iso_date_aimed_at_timestamp_field_becomes_timestamp() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(
            Value::Text("2024-03-01".into()).coerce(FieldKind::Timestamp),
            Value::Timestamp(expected)
        );
    }

    #[test]
    fn unconvertible_values_pass_through() {
        assert_eq!(
            Value::Text("soon".into()).coerce(FieldKind::Integer),
            Value::Text("soon".into())
        );
        assert_eq!(Value::Integer(7).coerce(FieldKind::Boolean), Value::Integer(7));
    }

    #[test]
    fn timestamps_format_with_milliseconds() {
        let t = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap();
        assert_eq!(format_timestamp(&t), "2024-01-15T09:30:00.000Z");
        assert_eq!(parse_timestamp("2024-01-15T09:30:00.000Z"), Some(t));
        assert_eq!(parse_timestamp("2024-01-15T10:30:00+01:00"), Some(t));
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
