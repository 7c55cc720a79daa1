use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::catalog::FieldType;
use crate::error::{Result, SearchError};

/// A scalar operand of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    /// Always millisecond precision, see [`truncate_to_millis`].
    Timestamp(DateTime<Utc>),
}

impl ConditionValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Bool(_) => "boolean",
            Self::Timestamp(_) => "timestamp",
        }
    }

    pub fn from_json(value: &Value, path: &str) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::String(s) => Ok(Self::Str(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Int(i))
                } else if n.is_u64() {
                    Err(SearchError::invalid(path, "integer out of range"))
                } else {
                    n.as_f64()
                        .map(Self::Float)
                        .ok_or_else(|| SearchError::invalid(path, "unrepresentable number"))
                }
            }
            Value::Null => Err(SearchError::invalid(path, "null is not a valid operand")),
            Value::Array(_) | Value::Object(_) => {
                Err(SearchError::invalid(path, "expected a scalar value"))
            }
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Ordering across compatible kinds. Integers and floats compare
    /// numerically; other kinds only against themselves.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (a, b) if a.is_numeric() && b.is_numeric() => a.as_f64()?.partial_cmp(&b.as_f64()?),
            (Self::Str(a), Self::Str(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn same_value(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    pub fn compatible_with(&self, other: &Self) -> bool {
        (self.is_numeric() && other.is_numeric())
            || std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Convert an operand to the representation a field of type `ty` stores.
    /// Integers widen to floats; ISO-8601 strings become timestamps.
    pub fn coerce_to(self, ty: FieldType, path: &str) -> Result<Self> {
        match (ty, self) {
            (FieldType::Integer, v @ Self::Int(_)) => Ok(v),
            (FieldType::Float, Self::Int(i)) => Ok(Self::Float(i as f64)),
            (FieldType::Float, v @ Self::Float(_)) => Ok(v),
            (FieldType::Text, v @ Self::Str(_)) => Ok(v),
            (FieldType::Boolean, v @ Self::Bool(_)) => Ok(v),
            (FieldType::Timestamp, v @ Self::Timestamp(_)) => Ok(v),
            (FieldType::Timestamp, Self::Str(s)) => parse_timestamp(&s).map(Self::Timestamp).ok_or_else(|| {
                SearchError::invalid(path, format!("'{s}' is not an ISO-8601 timestamp"))
            }),
            (ty, v) => Err(mismatch(ty, &v, path)),
        }
    }

    /// Check without converting. Used when re-validating decoded schemas.
    pub fn check_type(&self, ty: FieldType, path: &str) -> Result<()> {
        let ok = match ty {
            FieldType::Integer => matches!(self, Self::Int(_)),
            FieldType::Float => self.is_numeric(),
            FieldType::Text => matches!(self, Self::Str(_)),
            FieldType::Boolean => matches!(self, Self::Bool(_)),
            FieldType::Timestamp => matches!(self, Self::Timestamp(_)),
        };
        if ok {
            Ok(())
        } else {
            Err(mismatch(ty, self, path))
        }
    }
}

fn mismatch(ty: FieldType, value: &ConditionValue, path: &str) -> SearchError {
    SearchError::TypeMismatch {
        path: path.to_string(),
        expected: ty.name(),
        found: value.kind_name(),
    }
}

impl Serialize for ConditionValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Str(s) => serializer.serialize_str(s),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Timestamp(t) => {
                serializer.serialize_str(&t.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
        }
    }
}

pub fn truncate_to_millis(t: DateTime<Utc>) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(t.timestamp_millis())
}

/// Accepts RFC 3339, naive `YYYY-MM-DD[T ]HH:MM:SS[.fff]` (taken as UTC) and
/// bare dates (midnight UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let parsed = if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        dt.with_timezone(&Utc)
    } else if let Some(naive) = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        naive.and_utc()
    } else {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()?
            .and_hms_opt(0, 0, 0)?
            .and_utc()
    };
    truncate_to_millis(parsed)
}
