mod analysis;
mod config;
mod db;
mod errors;
mod models;
mod persistence;
mod routes;
mod scoring_client;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::analysis::generation::GenerationTracker;
use crate::analysis::pipeline::AnalysisPipeline;
use crate::analysis::scoring::RemoteScorer;
use crate::analysis::vocabulary::Vocabulary;
use crate::config::Config;
use crate::db::create_pool;
use crate::persistence::postgres::PgStore;
use crate::routes::build_router;
use crate::scoring_client::ScoringClient;
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

    info!("Starting Resume Match API v{}", env!("CARGO_PKG_VERSION"));

    // Keyword vocabulary: embedded default unless VOCABULARY_PATH is set
    let vocabulary = match &config.vocabulary_path {
        Some(path) => Vocabulary::load(path)
            .with_context(|| format!("Failed to load vocabulary from {}", path.display()))?,
        None => Vocabulary::builtin().context("Embedded vocabulary is invalid")?,
    };
    info!(
        "Vocabulary v{} loaded ({} terms), match mode {:?}",
        vocabulary.version(),
        vocabulary.terms().len(),
        config.match_mode
    );

    // Remote fallback scorer is optional
    let remote: Option<Arc<dyn RemoteScorer>> = match &config.remote_scoring_url {
        Some(url) => {
            let client = ScoringClient::new(
                url.clone(),
                config.remote_scoring_api_key.clone(),
                config.remote_scoring_timeout,
            )
            .context("Failed to build remote scoring client")?;
            info!("Remote scoring fallback enabled ({})", client.endpoint());
            Some(Arc::new(client) as Arc<dyn RemoteScorer>)
        }
        None => {
            info!("Remote scoring fallback disabled");
            None
        }
    };

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    let store = Arc::new(PgStore::new(db));

    // Build app state
    let state = AppState {
        config: config.clone(),
        pipeline: AnalysisPipeline::new(Arc::new(vocabulary), config.match_mode, remote),
        profiles: store.clone(),
        analyses: store,
        generations: Arc::new(GenerationTracker::new()),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict allowed origins once the web client's domain is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
