//! Scalar values, primary keys and record shapes
//!
//! Every value crossing into the engine is a [`Value`] bound as a statement
//! parameter. Primary keys get their own [`Key`] type because they must be
//! totally ordered to serve as snapshot map keys.

use crate::{Error, Result};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::str::FromStr;

/// A record: column name to value, primary key excluded.
pub type Record = BTreeMap<String, Value>;

/// A whole table materialized as primary key to record.
pub type Snapshot = BTreeMap<Key, Record>;

/// Tagged scalar stored in a record column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    /// Convert a JSON scalar. Booleans become 0/1; arrays and objects are rejected.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        match json {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Integer(i64::from(*b))),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Integer(i))
                } else if n.is_f64() {
                    n.as_f64()
                        .map(Value::Real)
                        .ok_or_else(|| Error::InvalidValue(n.to_string()))
                } else {
                    Err(Error::InvalidValue(format!("integer out of range: {}", n)))
                }
            }
            serde_json::Value::String(s) => Ok(Value::Text(s.clone())),
            other => Err(Error::InvalidValue(format!("not a scalar: {}", other))),
        }
    }
}

/// Convert a JSON object into a record.
pub fn record_from_json(json: &serde_json::Value) -> Result<Record> {
    let object = json
        .as_object()
        .ok_or_else(|| Error::InvalidValue(format!("record must be a JSON object, got {}", json)))?;

    object
        .iter()
        .map(|(column, value)| -> Result<(String, Value)> {
            Ok((column.clone(), Value::from_json(value)?))
        })
        .collect()
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Real(r) => serializer.serialize_f64(*r),
            Value::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            Value::Null => ValueRef::Null,
            Value::Integer(i) => ValueRef::Integer(*i),
            Value::Real(r) => ValueRef::Real(*r),
            Value::Text(s) => ValueRef::Text(s.as_bytes()),
        };
        Ok(ToSqlOutput::Borrowed(value))
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Value::Null),
            ValueRef::Integer(i) => Ok(Value::Integer(i)),
            ValueRef::Real(r) => Ok(Value::Real(r)),
            ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                .map(|s| Value::Text(s.to_string()))
                .map_err(|e| FromSqlError::Other(Box::new(e))),
            ValueRef::Blob(_) => Err(FromSqlError::InvalidType),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Primary-key value.
///
/// Numbers compare by value, so `Integer(1) == Real(1.0)` as in SQLite, and
/// every number sorts before every text key. NaN keeps a place in the
/// ordering but is never accepted by a statement (see [`Key::checked`]).
#[derive(Debug, Clone)]
pub enum Key {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Key {
    /// The engine stores a NaN bind as NULL, so non-finite reals are refused
    /// before they reach a statement.
    pub fn checked(&self) -> Result<&Self> {
        match self {
            Key::Real(r) if !r.is_finite() => {
                Err(Error::InvalidValue(format!("primary key must be finite, got {}", r)))
            }
            _ => Ok(self),
        }
    }
}

/// Reals by value with `-0.0 == 0.0`; NaN falls back to `total_cmp`, which
/// puts it beyond both infinities.
fn cmp_reals(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b))
}

/// Exact integer/real comparison, without rounding the integer through f64.
fn cmp_integer_real(i: i64, r: f64) -> Ordering {
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

    if r.is_nan() {
        return if r.is_sign_negative() { Ordering::Greater } else { Ordering::Less };
    }
    if r >= TWO_POW_63 {
        return Ordering::Less;
    }
    if r < -TWO_POW_63 {
        return Ordering::Greater;
    }

    let whole = r.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal if r > whole => Ordering::Less,
        Ordering::Equal if r < whole => Ordering::Greater,
        ordering => ordering,
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Key::Integer(a), Key::Integer(b)) => a.cmp(b),
            (Key::Real(a), Key::Real(b)) => cmp_reals(*a, *b),
            (Key::Integer(a), Key::Real(b)) => cmp_integer_real(*a, *b),
            (Key::Real(a), Key::Integer(b)) => cmp_integer_real(*b, *a).reverse(),
            (Key::Text(a), Key::Text(b)) => a.cmp(b),
            (Key::Text(_), _) => Ordering::Greater,
            (_, Key::Text(_)) => Ordering::Less,
        }
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Integer(i) => write!(f, "{}", i),
            Key::Real(r) => write!(f, "{}", r),
            Key::Text(s) => f.write_str(s),
        }
    }
}

/// Parsed as a JSON scalar: integers and finite floats become numeric keys,
/// a JSON-quoted string (`"42"`) is unquoted and kept as text, and anything
/// else is taken verbatim as text.
impl FromStr for Key {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return Ok(Key::Integer(i));
        }
        match serde_json::from_str(trimmed) {
            Ok(serde_json::Value::String(text)) => Ok(Key::Text(text)),
            Ok(serde_json::Value::Number(n)) => match n.as_f64() {
                Some(r) if r.is_finite() => Ok(Key::Real(r)),
                _ => Ok(Key::Text(s.to_string())),
            },
            _ => Ok(Key::Text(s.to_string())),
        }
    }
}

impl TryFrom<Value> for Key {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Integer(i) => Ok(Key::Integer(i)),
            Value::Real(r) => Ok(Key::Real(r)),
            Value::Text(s) => Ok(Key::Text(s)),
            Value::Null => Err(Error::InvalidValue("primary key is NULL".to_string())),
        }
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        match key {
            Key::Integer(i) => Value::Integer(i),
            Key::Real(r) => Value::Real(r),
            Key::Text(s) => Value::Text(s),
        }
    }
}

impl From<&Key> for Value {
    fn from(key: &Key) -> Self {
        Value::from(key.clone())
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Key::Integer(v)
    }
}

impl From<i32> for Key {
    fn from(v: i32) -> Self {
        Key::Integer(i64::from(v))
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Key::Text(v.to_string())
    }
}

impl From<String> for Key {
    fn from(v: String) -> Self {
        Key::Text(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_scalars() {
        assert_eq!(Value::from_json(&json!(null)).unwrap(), Value::Null);
        assert_eq!(Value::from_json(&json!(true)).unwrap(), Value::Integer(1));
        assert_eq!(Value::from_json(&json!(7)).unwrap(), Value::Integer(7));
        assert_eq!(Value::from_json(&json!(2.5)).unwrap(), Value::Real(2.5));
        assert_eq!(Value::from_json(&json!("Ada")).unwrap(), Value::from("Ada"));
    }

    #[test]
    fn test_json_rejects_nested() {
        assert!(matches!(Value::from_json(&json!([1, 2])), Err(Error::InvalidValue(_))));
        assert!(matches!(Value::from_json(&json!({"a": 1})), Err(Error::InvalidValue(_))));
        assert!(record_from_json(&json!("not an object")).is_err());
    }

    #[test]
    fn test_record_from_json() {
        let record = record_from_json(&json!({"name": "Lin", "score": 20})).unwrap();
        assert_eq!(record.get("name"), Some(&Value::from("Lin")));
        assert_eq!(record.get("score"), Some(&Value::Integer(20)));
    }

    #[test]
    fn test_key_ordering() {
        let mut keys = vec![
            Key::from("b"),
            Key::Real(1.5),
            Key::from(10),
            Key::from("a"),
            Key::from(2),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![Key::Real(1.5), Key::from(2), Key::from(10), Key::from("a"), Key::from("b")]
        );
    }

    #[test]
    fn test_integer_and_real_keys_compare_by_value() {
        assert_eq!(Key::from(1), Key::Real(1.0));
        assert_eq!(Key::Real(-0.0), Key::Real(0.0));
        assert!(Key::from(1) < Key::Real(1.5));
        assert!(Key::Real(0.5) < Key::from(1));
        assert!(Key::from(i64::MAX) < Key::Real(9_223_372_036_854_775_808.0));
        assert!(Key::from(i64::MAX - 1) < Key::from(i64::MAX));
        assert!(Key::Real(1e300) < Key::from("a"));

        let mut snapshot = Snapshot::new();
        snapshot.insert(Key::Real(1.0), Record::new());
        assert!(snapshot.contains_key(&Key::from(1)));
    }

    #[test]
    fn test_non_finite_key_rejected() {
        assert!(matches!(Key::Real(f64::NAN).checked(), Err(Error::InvalidValue(_))));
        assert!(matches!(Key::Real(f64::INFINITY).checked(), Err(Error::InvalidValue(_))));
        assert_eq!(Key::Real(2.5).checked().unwrap(), &Key::Real(2.5));
        assert_eq!(Key::from("x").checked().unwrap(), &Key::from("x"));
    }

    #[test]
    fn test_key_parse() {
        assert_eq!("42".parse::<Key>().unwrap(), Key::Integer(42));
        assert_eq!("\"42\"".parse::<Key>().unwrap(), Key::from("42"));
        assert_eq!("ada".parse::<Key>().unwrap(), Key::from("ada"));
        assert_eq!("1.5".parse::<Key>().unwrap(), Key::Real(1.5));
        assert_eq!("-2e3".parse::<Key>().unwrap(), Key::Real(-2000.0));
        assert_eq!("NaN".parse::<Key>().unwrap(), Key::from("NaN"));
        assert_eq!("1e999".parse::<Key>().unwrap(), Key::from("1e999"));
    }

    #[test]
    fn test_null_key_rejected() {
        assert!(Key::try_from(Value::Null).is_err());
        assert_eq!(Key::try_from(Value::Integer(3)).unwrap(), Key::Integer(3));
    }

    #[test]
    fn test_serialize_record() {
        let mut record = Record::new();
        record.insert("name".to_string(), Value::from("Ada"));
        record.insert("nick".to_string(), Value::Null);
        let text = serde_json::to_string(&record).unwrap();
        assert_eq!(text, r#"{"name":"Ada","nick":null}"#);
    }
}
