use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::plan::Statement;

/// One result row as produced by a composed statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRow {
    pub id: i64,
    /// The root row as JSON, with any requested relations merged in.
    pub record: Value,
    pub total_score: Option<i64>,
    /// `{category: [{field, term, pattern, score}, ..]}` when terms were given.
    pub score_details: Option<Value>,
}

/// Executes composed statements. The engine never talks to a database
/// directly; the Postgres crate provides the production backend.
#[async_trait]
pub trait SearchStore: Send + Sync {
    async fn fetch(&self, statement: &Statement) -> Result<Vec<SearchRow>>;
}
