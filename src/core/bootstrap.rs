use anyhow::{Context, Result};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::core::{app_state::AppState, config, db};

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub fn init_env() {
    dotenvy::dotenv().ok();
}

/// Build the shared state up front so the routers can hand it to their auth
/// layers before the server starts.
pub async fn build_state(config: &config::Config) -> Result<AppState> {
    let db_pool = db::create_pool(&config.database.url).await?;
    Ok(AppState {
        db_pool,
        http_client: reqwest::Client::new(),
    })
}

/// Attach the trace layer and serve until shutdown.
pub async fn bootstrap(
    service_name: &str,
    config: &config::Config,
    app: Router<AppState>,
    state: AppState,
) -> Result<()> {
    let app = app.layer(TraceLayer::new_for_http()).with_state(state);

    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("{} listening on {}", service_name, addr);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
