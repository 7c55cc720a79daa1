use anyhow::{Context, Result};
use async_trait::async_trait;
use mapqueue_search::{SearchRow, SearchStore, SqlParam, Statement};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};

/// Runs composed search statements against Postgres.
#[derive(Debug, Clone)]
pub struct PgSearchStore {
    pool: PgPool,
}

impl PgSearchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn bind<'q>(query: Query<'q, Postgres, PgArguments>, param: &SqlParam) -> Query<'q, Postgres, PgArguments> {
    match param {
        SqlParam::Int(v) => query.bind(*v),
        SqlParam::Float(v) => query.bind(*v),
        SqlParam::Text(v) => query.bind(v.clone()),
        SqlParam::Bool(v) => query.bind(*v),
        SqlParam::Timestamp(v) => query.bind(*v),
        SqlParam::IntArray(v) => query.bind(v.clone()),
        SqlParam::FloatArray(v) => query.bind(v.clone()),
        SqlParam::TextArray(v) => query.bind(v.clone()),
        SqlParam::BoolArray(v) => query.bind(v.clone()),
        SqlParam::TimestampArray(v) => query.bind(v.clone()),
    }
}

fn to_search_row(row: &PgRow) -> Result<SearchRow> {
    Ok(SearchRow {
        id: row.try_get("id")?,
        record: row.try_get::<Value, _>("record")?,
        total_score: row.try_get("total_score")?,
        score_details: row.try_get("score_details")?,
    })
}

#[async_trait]
impl SearchStore for PgSearchStore {
    async fn fetch(&self, statement: &Statement) -> Result<Vec<SearchRow>> {
        let query = statement
            .params
            .iter()
            .fold(sqlx::query(&statement.sql), bind);

        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("search statement failed")?;

        tracing::debug!(rows = rows.len(), "search rows fetched");
        rows.iter().map(to_search_row).collect()
    }
}
