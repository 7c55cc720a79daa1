//! HTTP surface.
//!
//! ## Endpoints
//!
//! - `GET  /health`
//! - `GET  /api/v1/search` - run a search from JSON or a token
//! - `POST /api/v1/search` - validate a JSON search and return its token

pub mod search_routes;

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use mapqueue_search::SearchService;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub search: Arc<SearchService>,
    pub default_limit: u32,
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .merge(search_routes::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
