use std::cmp::Ordering;

use serde::Serialize;
use serde_json::Value;

use super::regex_guard::{validate_pattern, RegexSafetyProbe};
use super::value::ConditionValue;
use crate::catalog::FieldType;
use crate::error::{Result, SearchError};

/// Condition operators, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
    IsNull,
    Regex,
    NotRegex,
}

impl Operator {
    pub const ALL: [Operator; 11] = [
        Operator::Eq,
        Operator::Neq,
        Operator::Lt,
        Operator::Lte,
        Operator::Gt,
        Operator::Gte,
        Operator::In,
        Operator::NotIn,
        Operator::IsNull,
        Operator::Regex,
        Operator::NotRegex,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::IsNull => "is_null",
            Self::Regex => "regex",
            Self::NotRegex => "not_regex",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == s)
    }

    pub fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// Predicates on a single field. Absent operators do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Conditions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eq: Option<ConditionValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neq: Option<ConditionValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<ConditionValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<ConditionValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<ConditionValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<ConditionValue>,
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub in_: Option<Vec<ConditionValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_in: Option<Vec<ConditionValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_null: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_regex: Option<String>,
}

impl Conditions {
    pub fn has(&self, op: Operator) -> bool {
        match op {
            Operator::Eq => self.eq.is_some(),
            Operator::Neq => self.neq.is_some(),
            Operator::Lt => self.lt.is_some(),
            Operator::Lte => self.lte.is_some(),
            Operator::Gt => self.gt.is_some(),
            Operator::Gte => self.gte.is_some(),
            Operator::In => self.in_.is_some(),
            Operator::NotIn => self.not_in.is_some(),
            Operator::IsNull => self.is_null.is_some(),
            Operator::Regex => self.regex.is_some(),
            Operator::NotRegex => self.not_regex.is_some(),
        }
    }

    pub fn operators(&self) -> impl Iterator<Item = Operator> + '_ {
        Operator::ALL.into_iter().filter(|op| self.has(*op))
    }

    pub fn scalar(&self, op: Operator) -> Option<&ConditionValue> {
        match op {
            Operator::Eq => self.eq.as_ref(),
            Operator::Neq => self.neq.as_ref(),
            Operator::Lt => self.lt.as_ref(),
            Operator::Lte => self.lte.as_ref(),
            Operator::Gt => self.gt.as_ref(),
            Operator::Gte => self.gte.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn scalar_mut(&mut self, op: Operator) -> Option<&mut Option<ConditionValue>> {
        match op {
            Operator::Eq => Some(&mut self.eq),
            Operator::Neq => Some(&mut self.neq),
            Operator::Lt => Some(&mut self.lt),
            Operator::Lte => Some(&mut self.lte),
            Operator::Gt => Some(&mut self.gt),
            Operator::Gte => Some(&mut self.gte),
            _ => None,
        }
    }

    /// Parse a condition object. A bare scalar is `{eq: value}` and `null`
    /// is `{is_null: true}`.
    pub fn from_json(value: &Value, path: &str) -> Result<Self> {
        let map = match value {
            Value::Null => {
                return Ok(Self {
                    is_null: Some(true),
                    ..Self::default()
                })
            }
            Value::Object(map) => map,
            Value::Array(_) => {
                return Err(SearchError::invalid(
                    path,
                    "a list is not a condition, use {\"in\": [...]}",
                ))
            }
            scalar => {
                return Ok(Self {
                    eq: Some(ConditionValue::from_json(scalar, path)?),
                    ..Self::default()
                })
            }
        };

        let mut conditions = Self::default();
        for (key, raw) in map {
            let op_path = format!("{path}.{key}");
            let op = Operator::parse(key).ok_or_else(|| {
                SearchError::invalid(&op_path, format!("unsupported condition operator '{key}'"))
            })?;
            match op {
                Operator::In | Operator::NotIn => {
                    let Value::Array(items) = raw else {
                        return Err(SearchError::invalid(&op_path, "expected a list of values"));
                    };
                    let values = items
                        .iter()
                        .enumerate()
                        .map(|(i, v)| ConditionValue::from_json(v, &format!("{op_path}[{i}]")))
                        .collect::<Result<Vec<_>>>()?;
                    if op == Operator::In {
                        conditions.in_ = Some(values);
                    } else {
                        conditions.not_in = Some(values);
                    }
                }
                Operator::IsNull => {
                    let Value::Bool(b) = raw else {
                        return Err(SearchError::invalid(&op_path, "expected a boolean"));
                    };
                    conditions.is_null = Some(*b);
                }
                Operator::Regex | Operator::NotRegex => {
                    let Value::String(s) = raw else {
                        return Err(SearchError::invalid(&op_path, "expected a pattern string"));
                    };
                    if op == Operator::Regex {
                        conditions.regex = Some(s.clone());
                    } else {
                        conditions.not_regex = Some(s.clone());
                    }
                }
                scalar_op => {
                    let parsed = ConditionValue::from_json(raw, &op_path)?;
                    if let Some(slot) = conditions.scalar_mut(scalar_op) {
                        *slot = Some(parsed);
                    }
                }
            }
        }
        Ok(conditions)
    }

    /// Structural consistency checks, independent of the field's type.
    pub fn validate(&self, path: &str, probe: &dyn RegexSafetyProbe) -> Result<()> {
        if self.operators().next().is_none() {
            return Err(SearchError::invalid(
                path,
                "at least one condition operator is required",
            ));
        }

        if self.is_null == Some(true) && self.operators().any(|op| op != Operator::IsNull) {
            return Err(SearchError::invalid(
                path,
                "is_null=true cannot be combined with other operators",
            ));
        }

        if let (Some(eq), Some(neq)) = (&self.eq, &self.neq) {
            if eq.same_value(neq) {
                return Err(SearchError::invalid(path, "eq and neq cannot be equal"));
            }
        }

        for (name, list) in [("in", &self.in_), ("not_in", &self.not_in)] {
            if let Some(values) = list {
                validate_sequence(values, &format!("{path}.{name}"))?;
            }
        }

        if let Some(eq) = &self.eq {
            if let Some(values) = &self.in_ {
                if !values.iter().any(|v| v.same_value(eq)) {
                    return Err(SearchError::invalid(path, "eq must be one of the in values"));
                }
            }
            if let Some(values) = &self.not_in {
                if values.iter().any(|v| v.same_value(eq)) {
                    return Err(SearchError::invalid(path, "eq cannot be one of the not_in values"));
                }
            }
        }

        if self.gt.is_some() && self.gte.is_some() {
            return Err(SearchError::invalid(path, "gt and gte are mutually exclusive"));
        }
        if self.lt.is_some() && self.lte.is_some() {
            return Err(SearchError::invalid(path, "lt and lte are mutually exclusive"));
        }

        let lower = self.gt.as_ref().map(|v| (v, true)).or(self.gte.as_ref().map(|v| (v, false)));
        let upper = self.lt.as_ref().map(|v| (v, true)).or(self.lte.as_ref().map(|v| (v, false)));
        if let (Some((lo, lo_strict)), Some((hi, hi_strict))) = (lower, upper) {
            let ord = lo
                .compare(hi)
                .ok_or_else(|| SearchError::invalid(path, "range bounds are not comparable"))?;
            let empty = if lo_strict || hi_strict {
                ord != Ordering::Less
            } else {
                ord == Ordering::Greater
            };
            if empty {
                return Err(SearchError::invalid(
                    path,
                    "lower bound must be less than upper bound",
                ));
            }
        }

        if let Some(p) = &self.regex {
            validate_pattern(p, probe, &format!("{path}.regex"))?;
        }
        if let Some(p) = &self.not_regex {
            validate_pattern(p, probe, &format!("{path}.not_regex"))?;
        }
        Ok(())
    }

    /// Convert every operand to the representation `ty` stores.
    pub fn coerce_to(mut self, ty: FieldType, path: &str) -> Result<Self> {
        for op in [Operator::Eq, Operator::Neq, Operator::Lt, Operator::Lte, Operator::Gt, Operator::Gte] {
            if let Some(slot) = self.scalar_mut(op) {
                if let Some(v) = slot.take() {
                    *slot = Some(v.coerce_to(ty, &format!("{path}.{}", op.as_str()))?);
                }
            }
        }
        for (name, list) in [("in", &mut self.in_), ("not_in", &mut self.not_in)] {
            if let Some(values) = list.take() {
                let coerced = values
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| v.coerce_to(ty, &format!("{path}.{name}[{i}]")))
                    .collect::<Result<Vec<_>>>()?;
                *list = Some(coerced);
            }
        }
        self.check_regex_type(ty, path)?;
        Ok(self)
    }

    /// Type check without conversion.
    pub fn check_types(&self, ty: FieldType, path: &str) -> Result<()> {
        for op in Operator::ALL {
            if let Some(v) = self.scalar(op) {
                v.check_type(ty, &format!("{path}.{}", op.as_str()))?;
            }
        }
        for (name, list) in [("in", &self.in_), ("not_in", &self.not_in)] {
            for (i, v) in list.iter().flatten().enumerate() {
                v.check_type(ty, &format!("{path}.{name}[{i}]"))?;
            }
        }
        self.check_regex_type(ty, path)
    }

    fn check_regex_type(&self, ty: FieldType, path: &str) -> Result<()> {
        if ty != FieldType::Text && (self.regex.is_some() || self.not_regex.is_some()) {
            return Err(SearchError::TypeMismatch {
                path: format!("{path}.regex"),
                expected: "string field",
                found: ty.name(),
            });
        }
        Ok(())
    }
}

fn validate_sequence(values: &[ConditionValue], path: &str) -> Result<()> {
    let Some(first) = values.first() else {
        return Err(SearchError::invalid(path, "must contain at least one value"));
    };
    if let Some((i, v)) = values
        .iter()
        .enumerate()
        .find(|(_, v)| !v.compatible_with(first))
    {
        return Err(SearchError::TypeMismatch {
            path: format!("{path}[{i}]"),
            expected: first.kind_name(),
            found: v.kind_name(),
        });
    }
    Ok(())
}
