//! xsent service entrypoint.
//! Boots the Axum HTTP server with configuration, logging and metrics wired in.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;

use xsent::config::AppConfig;
use xsent::metrics::Metrics;
use xsent::{create_router, AppState};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    let cfg = AppConfig::load().context("loading configuration")?;
    cfg.logging.init();

    let mut state = AppState::from_config(&cfg).context("building pipeline")?;
    match Metrics::install(cfg.exchange.markets_ttl_secs) {
        Ok(m) => state = state.with_metrics(m),
        Err(e) => tracing::warn!(error = %e, "prometheus recorder not installed"),
    }

    // No request signer ships with the service; exchange routes answer 503
    // until one is wired in with `AppState::with_signer`.
    tracing::info!(
        policy = ?cfg.search.policy,
        scorer = state.aggregator.scorer_name(),
        exchange = state.exchange.is_some(),
        "xsent starting"
    );

    let router = create_router(state);
    Ok(router.into())
}
