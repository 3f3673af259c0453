use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, State,
    },
    http::{header::HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::analyze::build_scorer;
use crate::config::{AppConfig, ExchangeConfig};
use crate::decision::{OrderTicket, Recommendation, Side, SignalRule, ThresholdRule};
use crate::engine::{AggregateResult, Aggregator, DEFAULT_MAX_RESULTS};
use crate::error::{AnalyzeError, ExchangeError};
use crate::exchange::{Balance, ExchangeDesk, KalshiClient, Market, OrderOutcome, RequestSigner};
use crate::ingest::providers::XRecentSearch;
use crate::ingest::types::Provenance;
use crate::ingest::PostSource;
use crate::metrics::{metrics_unavailable, Metrics};

pub const DATA_SOURCE_HEADER: &str = "x-data-source";

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Aggregator,
    pub rule: Arc<dyn SignalRule>,
    pub exchange: Option<ExchangeDesk>,
    pub config_summary: Arc<serde_json::Value>,
    pub metrics: Option<Metrics>,
}

impl AppState {
    /// Wire the pipeline from configuration. The exchange stays disabled until
    /// `with_signer` (or `with_exchange`) is called.
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let provider = XRecentSearch::from_config(&cfg.search)?;
        let source = PostSource::new(Arc::new(provider), &cfg.search);
        let scorer = build_scorer(&cfg.scorer);
        let aggregator = Aggregator::new(source, scorer, &cfg.engine)
            .with_default_language(cfg.search.default_language.clone());
        Ok(Self {
            aggregator,
            rule: Arc::new(ThresholdRule::default()),
            exchange: None,
            config_summary: Arc::new(cfg.masked_summary()),
            metrics: None,
        })
    }

    /// Enable the exchange routes with a Kalshi client signing through `signer`.
    pub fn with_signer(
        self,
        cfg: &ExchangeConfig,
        signer: Arc<dyn RequestSigner>,
    ) -> anyhow::Result<Self> {
        let client = KalshiClient::new(cfg, signer)?;
        Ok(self.with_exchange(ExchangeDesk::new(Arc::new(client), cfg.markets_ttl())))
    }

    pub fn with_exchange(mut self, desk: ExchangeDesk) -> Self {
        self.exchange = Some(desk);
        self
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn desk(&self) -> Result<&ExchangeDesk, ApiError> {
        self.exchange
            .as_ref()
            .ok_or_else(|| ApiError::from(ExchangeError::NotConfigured))
    }
}

pub fn create_router(state: AppState) -> Router {
    let metrics = state.metrics.clone();

    let router = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/sentiment", get(sentiment))
        .route("/api/signal", post(signal))
        .route("/api/analyze-signal", get(analyze_signal))
        .route("/api/exchange/markets", get(exchange_markets))
        .route("/api/exchange/balance", get(exchange_balance))
        .route("/api/exchange/order", post(exchange_order))
        .route("/debug/config", get(debug_config))
        .layer(CorsLayer::very_permissive())
        .with_state(state);

    match metrics {
        Some(m) => router.merge(m.router()),
        None => router.route("/metrics", get(metrics_unavailable)),
    }
}

/// JSON error body `{"error": "..."}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(r: JsonRejection) -> Self {
        ApiError::new(r.status(), r.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(r: QueryRejection) -> Self {
        ApiError::new(r.status(), r.body_text())
    }
}

/// `Json` whose rejections use the `{"error": ...}` body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
struct ApiJson<T>(T);

/// `Query` whose rejections use the `{"error": ...}` body.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
struct ApiQuery<T>(T);

impl From<AnalyzeError> for ApiError {
    fn from(e: AnalyzeError) -> Self {
        let status = match e {
            AnalyzeError::EmptyQuery => StatusCode::BAD_REQUEST,
            AnalyzeError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        };
        ApiError::new(status, e.to_string())
    }
}

impl From<ExchangeError> for ApiError {
    fn from(e: ExchangeError) -> Self {
        match e {
            ExchangeError::NotConfigured => {
                ApiError::new(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
            }
            ExchangeError::InvalidOrder(_) => ApiError::new(StatusCode::BAD_REQUEST, e.to_string()),
            // the exchange's own message, untouched
            ExchangeError::Rejected { message, .. } => {
                ApiError::new(StatusCode::BAD_GATEWAY, message)
            }
            ExchangeError::Signing(_) => {
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ExchangeError::Transport(_) | ExchangeError::Decode(_) => {
                ApiError::new(StatusCode::BAD_GATEWAY, e.to_string())
            }
        }
    }
}

fn data_source_header(source: Provenance) -> [(HeaderName, HeaderValue); 1] {
    [(
        HeaderName::from_static(DATA_SOURCE_HEADER),
        HeaderValue::from_static(source.as_str()),
    )]
}

#[derive(Debug, Deserialize)]
struct SentimentParams {
    #[serde(default)]
    q: String,
    /// Raw text; parsed by `parse_max_results` so out-of-range values clamp.
    max_results: Option<String>,
    lang: Option<String>,
}

/// Integer text to `i64`, saturating on overflow. Blank means the default.
fn parse_max_results(raw: Option<&str>) -> Result<i64, ApiError> {
    let s = match raw.map(str::trim) {
        None | Some("") => return Ok(DEFAULT_MAX_RESULTS as i64),
        Some(s) => s,
    };
    if let Ok(v) = s.parse::<i64>() {
        return Ok(v);
    }
    let (negative, digits) = match s.strip_prefix('-') {
        Some(d) => (true, d),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(if negative { i64::MIN } else { i64::MAX });
    }
    Err(ApiError::new(
        StatusCode::BAD_REQUEST,
        format!("max_results must be an integer, got {s:?}"),
    ))
}

async fn run_analysis(state: &AppState, p: &SentimentParams) -> Result<AggregateResult, ApiError> {
    let max_results = parse_max_results(p.max_results.as_deref())?;
    let lang = p.lang.as_deref().map(str::trim).filter(|l| !l.is_empty());
    Ok(state.aggregator.analyze(&p.q, max_results, lang).await?)
}

async fn sentiment(
    State(state): State<AppState>,
    ApiQuery(p): ApiQuery<SentimentParams>,
) -> Result<Response, ApiError> {
    let result = run_analysis(&state, &p).await?;
    Ok((data_source_header(result.source), Json(result)).into_response())
}

#[derive(Debug, Deserialize)]
struct SignalReq {
    average_score: f64,
    #[serde(default)]
    positive: usize,
    #[serde(default)]
    negative: usize,
}

async fn signal(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignalReq>,
) -> Json<Recommendation> {
    Json(
        state
            .rule
            .recommend(req.average_score, req.positive, req.negative),
    )
}

#[derive(Debug, Serialize)]
struct AnalyzeSignalResp {
    result: AggregateResult,
    recommendation: Recommendation,
}

async fn analyze_signal(
    State(state): State<AppState>,
    ApiQuery(p): ApiQuery<SentimentParams>,
) -> Result<Response, ApiError> {
    let result = run_analysis(&state, &p).await?;
    let recommendation = state.rule.evaluate(&result);
    tracing::info!(
        target: "engine",
        query = %result.query,
        side = ?recommendation.side,
        confidence = recommendation.confidence,
        "signal derived"
    );
    let source = result.source;
    Ok((
        data_source_header(source),
        Json(AnalyzeSignalResp {
            result,
            recommendation,
        }),
    )
        .into_response())
}

#[derive(Debug, Serialize)]
struct MarketsResp {
    count: usize,
    markets: Vec<Market>,
}

async fn exchange_markets(State(state): State<AppState>) -> Result<Json<MarketsResp>, ApiError> {
    let markets = state.desk()?.open_markets().await?;
    Ok(Json(MarketsResp {
        count: markets.len(),
        markets,
    }))
}

async fn exchange_balance(State(state): State<AppState>) -> Result<Json<Balance>, ApiError> {
    Ok(Json(state.desk()?.balance().await?))
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct OrderReq {
    ticker: String,
    side: Side,
    price: u32,
    #[serde(default = "default_quantity")]
    quantity: u32,
    #[serde(default)]
    confirm: bool,
}

async fn exchange_order(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<OrderReq>,
) -> Result<Json<OrderOutcome>, ApiError> {
    let desk = state.desk()?;
    let ticket = OrderTicket::new(req.ticker, req.side, req.price, req.quantity)?;
    Ok(Json(desk.submit(ticket, req.confirm).await?))
}

async fn debug_config(State(state): State<AppState>) -> Json<serde_json::Value> {
    let mut v = (*state.config_summary).clone();
    if let Some(obj) = v.as_object_mut() {
        obj.insert(
            "runtime".into(),
            serde_json::json!({
                "scorer": state.aggregator.scorer_name(),
                "exchange_enabled": state.exchange.is_some(),
                "metrics_enabled": state.metrics.is_some(),
            }),
        );
    }
    Json(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_keeps_exchange_message() {
        let e = ApiError::from(ExchangeError::Rejected {
            status: 409,
            message: "market closed".into(),
        });
        assert_eq!(e.status, StatusCode::BAD_GATEWAY);
        assert_eq!(e.message, "market closed");
    }

    #[test]
    fn max_results_parses_leniently() {
        assert_eq!(parse_max_results(None).unwrap(), 10);
        assert_eq!(parse_max_results(Some(" ")).unwrap(), 10);
        assert_eq!(parse_max_results(Some("42")).unwrap(), 42);
        assert_eq!(parse_max_results(Some("-7")).unwrap(), -7);
        assert_eq!(
            parse_max_results(Some("99999999999999999999")).unwrap(),
            i64::MAX
        );
        assert_eq!(
            parse_max_results(Some("-99999999999999999999")).unwrap(),
            i64::MIN
        );
        assert_eq!(
            parse_max_results(Some("abc")).unwrap_err().status,
            StatusCode::BAD_REQUEST
        );
        assert!(parse_max_results(Some("1.5")).is_err());
        assert!(parse_max_results(Some("-")).is_err());
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::from(AnalyzeError::EmptyQuery).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ExchangeError::NotConfigured).status,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(ExchangeError::InvalidOrder("x".into())).status,
            StatusCode::BAD_REQUEST
        );
    }
}
