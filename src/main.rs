//! daybrief — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and metrics.
//!
//! See `README.md` for quickstart and environment variables.

use std::net::SocketAddr;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use daybrief::api::{self, AppState};
use daybrief::metrics::Metrics;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("daybrief=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let metrics = Metrics::init();

    let state = AppState::from_env();
    let port = state.settings.api_port;
    let router = api::create_router(state).merge(metrics.router());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "daybrief listening");
    axum::serve(listener, router).await?;
    Ok(())
}
