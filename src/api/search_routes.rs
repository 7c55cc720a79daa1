use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use mapqueue_search::service::{dump, Pagination, SearchOptions};
use mapqueue_search::{RawQuery, SearchError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::AppState;
use crate::error::AppError;

// ── Request/Response types ─────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// JSON search, or a token when `compressed` is set.
    pub q: String,
    /// Unset: a `q` starting with `{` is JSON, anything else a token.
    pub compressed: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Comma separated: relation names, field names, `-field` to drop.
    pub include: Option<String>,
    #[serde(default)]
    pub frontend_mode: bool,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Serialize)]
pub struct PaginationBody {
    pub limit: u32,
    pub offset: u64,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<Value>,
    pub pagination: PaginationBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_trace: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EncodeResponse {
    pub message: String,
    pub q: String,
}

// ── Handlers ───────────────────────────────────────────────────

fn raw_query(q: &str, compressed: Option<bool>) -> Result<RawQuery, SearchError> {
    let q = q.trim();
    let compressed = compressed.unwrap_or(!q.starts_with('{'));
    if compressed {
        return Ok(RawQuery::Token(q.to_string()));
    }
    serde_json::from_str(q)
        .map(RawQuery::Json)
        .map_err(|e| SearchError::invalid("q", format!("malformed JSON: {e}")))
}

/// GET /api/v1/search
///
/// ```text
/// GET /api/v1/search?q={"scope":"queues","search_terms":"camellia"}&limit=20
/// ```
async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let raw = raw_query(&params.q, params.compressed)?;
    let schema = state.search.parse(&raw)?;
    let pagination = Pagination::with_default(params.limit, params.offset, state.default_limit)?;

    let include: Vec<String> = params
        .include
        .as_deref()
        .map(|s| s.split(',').map(str::to_string).collect())
        .unwrap_or_default();
    let options =
        SearchOptions::from_include(schema.scope, &include, params.frontend_mode, params.debug);

    let outcome = state.search.execute(&schema, pagination, &options).await?;
    let results = dump(schema.scope, &outcome.rows, &options.dump, schema.has_terms());

    Ok(Json(SearchResponse {
        pagination: PaginationBody {
            limit: outcome.pagination.limit,
            offset: outcome.pagination.offset,
            count: results.len(),
        },
        results,
        debug_trace: outcome.debug_trace,
    }))
}

/// POST /api/v1/search
///
/// Validates the body and returns the URL token for it. Nothing is executed.
async fn encode(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<EncodeResponse>), AppError> {
    let token = state.search.encode(&body)?;
    tracing::debug!(token_len = token.len(), "search encoded");
    Ok((
        StatusCode::CREATED,
        Json(EncodeResponse {
            message: "search encoded".to_string(),
            q: token,
        }),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/v1/search", get(search).post(encode))
}
