use std::sync::Arc;

use anyhow::Context;
use mapqueue::{build_router, AppConfig, AppState};
use mapqueue_postgres::PgSearchStore;
use mapqueue_search::model::default_probe;
use mapqueue_search::{FieldCatalog, SearchService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,mapqueue=debug,mapqueue_search=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        bind = %config.bind_addr,
        debug = config.search_debug,
        default_limit = config.default_limit,
        "starting mapqueue search service"
    );

    let pool = config.database.connect().await?;
    let store = Arc::new(PgSearchStore::new(pool));
    let service = SearchService::new(
        Arc::new(FieldCatalog::new()),
        store,
        Arc::from(default_probe(config.regex_timeout)),
    )
    .with_debug(config.search_debug);

    let app = build_router(AppState {
        search: Arc::new(service),
        default_limit: config.default_limit,
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
