use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mapqueue_search::SearchError;
use serde::Serialize;

/// HTTP face of a failed search.
#[derive(Debug)]
pub struct AppError(pub SearchError);

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "search failed");
        } else {
            tracing::debug!(error = %self.0, "search rejected");
        }
        let body = ErrorBody {
            message: self.0.to_string(),
            path: self.0.path().map(str::to_string),
        };
        (status, Json(body)).into_response()
    }
}
