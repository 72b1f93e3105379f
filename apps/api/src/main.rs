mod auth;
mod config;
mod cv;
mod db;
mod errors;
mod handlers;
mod routes;
mod search;
mod state;
mod validation;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::token::JwtMaker;
use crate::config::Config;
use crate::db::{create_pool, run_migrations, PgQueries, Store};
use crate::routes::build_router;
use crate::search::{load_all, ElasticJobIndex, JobIndex, MemoryJobIndex};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting jobboard API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    info!("Connecting to {} database", config.db_driver);
    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;
    let store = Store::new(Arc::new(PgQueries::new(pool)));

    // Initialize the search index and fill it from the row store
    let index = build_index(&config).await?;
    let indexed = load_all(&*store, index.as_ref())
        .await
        .context("Initial search index load failed")?;
    info!("Search index ready with {indexed} jobs");

    let tokens = Arc::new(JwtMaker::new(&config.token_symmetric_key)?);

    let state = AppState {
        store,
        index,
        tokens,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = config
        .server_address
        .parse()
        .with_context(|| format!("Invalid SERVER_ADDRESS '{}'", config.server_address))?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Elasticsearch when `ELASTICSEARCH_URL` is set, otherwise an in-process index that
/// lives as long as the server.
async fn build_index(config: &Config) -> Result<Arc<dyn JobIndex>> {
    match &config.elasticsearch_url {
        Some(url) => {
            let index = ElasticJobIndex::new(url, &config.elasticsearch_index)?;
            index.ensure_index().await?;
            info!(
                "Elasticsearch index '{}' at {url}",
                config.elasticsearch_index
            );
            Ok(Arc::new(index))
        }
        None => {
            warn!("ELASTICSEARCH_URL is not set, using the in-process job index");
            Ok(Arc::new(MemoryJobIndex::new()))
        }
    }
}
