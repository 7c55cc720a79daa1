//! mapqueue HTTP service: configuration, routing and error mapping around
//! the `mapqueue-search` engine.

pub mod api;
pub mod config;
pub mod error;

pub use api::{build_router, AppState};
pub use config::AppConfig;
pub use error::AppError;
