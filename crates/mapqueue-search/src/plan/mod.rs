//! Turns a validated [`SearchSchema`] into one
//! parameterized Postgres statement over the scope's root entity.
//!
//! The statement is a chain of CTEs: derived field sub-queries, term filters,
//! field-condition filters, per-category relevance scores, and sort keys,
//! joined onto the root table.
//!
//! [`SearchSchema`]: crate::model::SearchSchema

mod compose;
mod filtering;
pub mod links;
pub mod relations;
mod scoring;
mod sorting;
mod target;

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::catalog::FieldType;
use crate::error::{Result, SearchError};
use crate::model::ConditionValue;

pub use compose::PlanComposer;
pub use relations::RelationSpec;

/// A bind parameter. Arrays back `= ANY($n)` predicates.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    IntArray(Vec<i64>),
    FloatArray(Vec<f64>),
    TextArray(Vec<String>),
    BoolArray(Vec<bool>),
    TimestampArray(Vec<DateTime<Utc>>),
}

impl SqlParam {
    pub fn scalar(value: &ConditionValue, ty: FieldType) -> Self {
        match (ty, value) {
            (FieldType::Float, ConditionValue::Int(i)) => Self::Float(*i as f64),
            (_, ConditionValue::Int(i)) => Self::Int(*i),
            (_, ConditionValue::Float(f)) => Self::Float(*f),
            (_, ConditionValue::Str(s)) => Self::Text(s.clone()),
            (_, ConditionValue::Bool(b)) => Self::Bool(*b),
            (_, ConditionValue::Timestamp(t)) => Self::Timestamp(*t),
        }
    }

    pub fn array(values: &[ConditionValue], ty: FieldType) -> Result<Self> {
        fn collect<T>(
            values: &[ConditionValue],
            pick: impl Fn(&ConditionValue) -> Option<T>,
        ) -> Result<Vec<T>> {
            values
                .iter()
                .map(|v| {
                    pick(v).ok_or_else(|| {
                        SearchError::Composition(format!("mixed list element {}", v.kind_name()))
                    })
                })
                .collect()
        }
        Ok(match ty {
            FieldType::Integer => Self::IntArray(collect(values, |v| match v {
                ConditionValue::Int(i) => Some(*i),
                _ => None,
            })?),
            FieldType::Float => Self::FloatArray(collect(values, |v| match v {
                ConditionValue::Int(i) => Some(*i as f64),
                ConditionValue::Float(f) => Some(*f),
                _ => None,
            })?),
            FieldType::Text => Self::TextArray(collect(values, |v| match v {
                ConditionValue::Str(s) => Some(s.clone()),
                _ => None,
            })?),
            FieldType::Boolean => Self::BoolArray(collect(values, |v| match v {
                ConditionValue::Bool(b) => Some(*b),
                _ => None,
            })?),
            FieldType::Timestamp => Self::TimestampArray(collect(values, |v| match v {
                ConditionValue::Timestamp(t) => Some(*t),
                _ => None,
            })?),
        })
    }

    fn literal(&self) -> String {
        fn quote(s: &str) -> String {
            format!("'{}'", s.replace('\'', "''"))
        }
        fn list<T>(items: &[T], f: impl Fn(&T) -> String) -> String {
            format!("ARRAY[{}]", items.iter().map(f).collect::<Vec<_>>().join(", "))
        }
        match self {
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => quote(s),
            Self::Bool(b) => b.to_string(),
            Self::Timestamp(t) => format!("{}::timestamptz", quote(&t.to_rfc3339())),
            Self::IntArray(v) => list(v, |i| i.to_string()),
            Self::FloatArray(v) => list(v, |f| f.to_string()),
            Self::TextArray(v) => list(v, |s| quote(s)),
            Self::BoolArray(v) => list(v, |b| b.to_string()),
            Self::TimestampArray(v) => list(v, |t| format!("{}::timestamptz", quote(&t.to_rfc3339()))),
        }
    }
}

/// A composed query: SQL text with `$n` placeholders and their values.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl Statement {
    /// SQL with parameters inlined, for logs only. Never execute this.
    pub fn explain(&self) -> String {
        let mut sql = self.sql.clone();
        for (i, param) in self.params.iter().enumerate().rev() {
            sql = sql.replace(&format!("${}", i + 1), &param.literal());
        }
        sql
    }
}

/// Accumulates CTEs and parameters while stages are composed.
#[derive(Debug, Default)]
pub(crate) struct SqlBuilder {
    ctes: Vec<(String, String)>,
    cte_names: HashSet<String>,
    params: Vec<SqlParam>,
    joins: Vec<String>,
    order_by: Vec<String>,
}

impl SqlBuilder {
    pub(crate) fn bind(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("${}", self.params.len())
    }

    /// Register a CTE once. Later registrations under the same name are ignored.
    pub(crate) fn cte(&mut self, name: &str, body: String) {
        if self.cte_names.insert(name.to_string()) {
            self.ctes.push((name.to_string(), body));
        }
    }

    pub(crate) fn join(&mut self, clause: String) {
        self.joins.push(clause);
    }

    pub(crate) fn order(&mut self, key: String) {
        self.order_by.push(key);
    }

    pub(crate) fn finish(self, select: String, from: String) -> Statement {
        let mut sql = String::new();
        if !self.ctes.is_empty() {
            let ctes: Vec<String> = self
                .ctes
                .iter()
                .map(|(name, body)| format!("{name} AS (\n{body}\n)"))
                .collect();
            sql.push_str("WITH ");
            sql.push_str(&ctes.join(",\n"));
            sql.push('\n');
        }
        sql.push_str(&select);
        sql.push('\n');
        sql.push_str(&from);
        for join in &self.joins {
            sql.push('\n');
            sql.push_str(join);
        }
        if !self.order_by.is_empty() {
            sql.push_str("\nORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }
        Statement {
            sql,
            params: self.params,
        }
    }

    pub(crate) fn append(statement: &mut Statement, clause: &str) {
        statement.sql.push('\n');
        statement.sql.push_str(clause);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_orders_ctes_and_numbers_params() {
        let mut b = SqlBuilder::default();
        let p1 = b.bind(SqlParam::Int(1));
        b.cte("a", format!("SELECT {p1} AS x"));
        b.cte("a", "SELECT 2".into());
        let p2 = b.bind(SqlParam::Text("o'k".into()));
        b.cte("b", format!("SELECT {p2} AS y"));
        b.join("JOIN a ON true".into());
        b.order("r.id ASC".into());
        let stmt = b.finish("SELECT r.id".into(), "FROM t r".into());
        assert_eq!(
            stmt.sql,
            "WITH a AS (\nSELECT $1 AS x\n),\nb AS (\nSELECT $2 AS y\n)\nSELECT r.id\nFROM t r\nJOIN a ON true\nORDER BY r.id ASC"
        );
        assert_eq!(stmt.params.len(), 2);
        assert!(stmt.explain().contains("SELECT 'o''k' AS y"));
    }

    #[test]
    fn explain_does_not_confuse_param_prefixes() {
        let stmt = Statement {
            sql: "$1 $10".into(),
            params: (1..=10).map(SqlParam::Int).collect(),
        };
        assert_eq!(stmt.explain(), "1 10");
    }

    #[test]
    fn arrays_follow_field_type() {
        let values = [ConditionValue::Int(1), ConditionValue::Float(2.5)];
        assert_eq!(
            SqlParam::array(&values, FieldType::Float).unwrap(),
            SqlParam::FloatArray(vec![1.0, 2.5])
        );
        assert!(SqlParam::array(&values, FieldType::Integer).is_err());
        assert_eq!(
            SqlParam::scalar(&ConditionValue::Int(3), FieldType::Float),
            SqlParam::Float(3.0)
        );
    }
}
