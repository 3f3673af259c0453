// tests/classifier_http.rs
//
// Remote scorer against a local fake classification service. Every failure
// mode must come back as a neutral score, never an error.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

use xsent::analyze::ClassifierScorer;
use xsent::config::ScorerConfig;
use xsent::sentiment::{Label, Sentiment, SentimentScorer};

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn ok(headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    let authed = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some("Bearer k-123");
    if !authed {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "no key"})));
    }
    let text = body["text"].as_str().unwrap_or_default();
    let score = if text.contains("moon") { 0.8 } else { -0.6 };
    (StatusCode::OK, Json(json!({"score": score, "label": null})))
}

async fn fake_service() -> String {
    let app = Router::new()
        .route("/ok", post(ok))
        .route("/clamp", post(|| async { Json(json!({"score": 7.5})) }))
        .route(
            "/err",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route("/bad", post(|| async { "definitely not json" }))
        .route(
            "/slow",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Json(json!({"score": 1.0}))
            }),
        );
    spawn(app).await
}

fn cfg(key: &str) -> ScorerConfig {
    ScorerConfig {
        classifier_api_key: key.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn valid_response_is_used() {
    let base = fake_service().await;
    let s = ClassifierScorer::new(format!("{base}/ok"), &cfg("k-123")).unwrap();
    let up = s.score("to the moon").await;
    assert_eq!(up.score, 0.8);
    assert_eq!(up.label, Label::Positive);
    let down = s.score("rug pull").await;
    assert_eq!(down.label, Label::Negative);
}

#[tokio::test]
async fn out_of_range_score_is_clamped() {
    let base = fake_service().await;
    let s = ClassifierScorer::new(format!("{base}/clamp"), &cfg("")).unwrap();
    assert_eq!(s.score("anything").await.score, 1.0);
}

#[tokio::test]
async fn failures_degrade_to_neutral() {
    let base = fake_service().await;
    for path in ["/err", "/bad", "/missing"] {
        let s = ClassifierScorer::new(format!("{base}{path}"), &cfg("")).unwrap();
        assert_eq!(s.score("bullish").await, Sentiment::NEUTRAL, "{path}");
    }
    // wrong key → 401 → neutral
    let s = ClassifierScorer::new(format!("{base}/ok"), &cfg("wrong")).unwrap();
    assert_eq!(s.score("moon").await, Sentiment::NEUTRAL);
}

#[tokio::test]
async fn timeout_degrades_to_neutral_within_budget() {
    let base = fake_service().await;
    // below the floor; clamped up to 6s
    let mut c = cfg("");
    c.timeout_secs = 1;
    let mut app_cfg = xsent::config::AppConfig::default();
    app_cfg.scorer = c;
    app_cfg.sanitize();
    assert_eq!(app_cfg.scorer.timeout_secs, 6);

    let s = ClassifierScorer::new(format!("{base}/slow"), &app_cfg.scorer).unwrap();
    let t0 = std::time::Instant::now();
    assert_eq!(s.score("moon").await, Sentiment::NEUTRAL);
    assert!(t0.elapsed() < Duration::from_secs(15));
}

#[tokio::test]
async fn one_failing_text_does_not_poison_later_calls() {
    let hits = Arc::new(AtomicU32::new(0));
    let h = hits.clone();
    let app = Router::new()
        .route(
            "/flaky",
            post(|State(h): State<Arc<AtomicU32>>| async move {
                if h.fetch_add(1, Ordering::SeqCst) == 0 {
                    (StatusCode::BAD_GATEWAY, Json(json!({})))
                } else {
                    (StatusCode::OK, Json(json!({"score": 0.3, "label": "pos"})))
                }
            }),
        )
        .with_state(h);
    let base = spawn(app).await;
    let s = ClassifierScorer::new(format!("{base}/flaky"), &cfg("")).unwrap();
    assert_eq!(s.score("a").await, Sentiment::NEUTRAL);
    let second = s.score("b").await;
    assert_eq!(second.score, 0.3);
    assert_eq!(second.label, Label::Positive);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}
