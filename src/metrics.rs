use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and publish the static market
    /// cache TTL gauge. Fails if another recorder is already installed.
    pub fn install(markets_ttl_secs: u64) -> Result<Self, BuildError> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        gauge!("xsent_market_cache_ttl_secs").set(markets_ttl_secs as f64);
        Ok(Self { handle })
    }

    /// Recorder that is not installed globally. Renders only what is recorded
    /// through it directly; used where a global recorder cannot be installed.
    pub fn detached() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        Self {
            handle: recorder.handle(),
        }
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// `/metrics` fallback when no recorder was installed.
pub async fn metrics_unavailable() -> impl IntoResponse {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        "metrics recorder not installed\n",
    )
}
