//! MovieSense binary entrypoint.
//! Boots the Axum HTTP server with config, tracing and shared state.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing::info;

use moviesense::{router, telemetry, AppState, SenseConfig};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    telemetry::init_tracing();

    let cfg = SenseConfig::load().context("loading moviesense config")?;
    let state = AppState::from_config(&cfg).context("building app state")?;
    info!(target: "main", primary = %cfg.primary_url, "starting moviesense");

    Ok(router(state).into())
}
