//! Delegated scoring: forward each text to a remote classification service.
//!
//! The remote side is an oracle. Any failure (timeout, transport error, non-2xx,
//! malformed body, non-finite score) degrades to a neutral result so one bad
//! post never aborts a batch.

use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ScorerConfig;
use crate::sentiment::{Label, Sentiment, SentimentScorer};

#[derive(Serialize)]
struct ClassifyReq<'a> {
    text: &'a str,
}

/// Accepted response shape: `{"score": f64, "label": "positive"|"neutral"|"negative"}`.
/// Short labels (`pos`/`neu`/`neg`) are tolerated.
#[derive(Debug, Deserialize)]
struct ClassifyResp {
    score: f64,
    #[serde(default)]
    label: Option<String>,
}

pub struct ClassifierScorer {
    http: reqwest::Client,
    url: String,
    api_key: String,
    timeout: Duration,
}

impl ClassifierScorer {
    pub fn new(url: impl Into<String>, cfg: &ScorerConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("xsent/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(cfg.timeout())
            .build()?;
        Ok(Self {
            http,
            url: url.into(),
            api_key: cfg.classifier_api_key.clone(),
            timeout: cfg.timeout(),
        })
    }

    async fn classify(&self, text: &str) -> Result<Sentiment, String> {
        let mut req = self
            .http
            .post(&self.url)
            .timeout(self.timeout)
            .json(&ClassifyReq { text });
        if !self.api_key.is_empty() {
            req = req.bearer_auth(&self.api_key);
        }

        let resp = req.send().await.map_err(|e| format!("request: {e}"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }
        let body: ClassifyResp = resp.json().await.map_err(|e| format!("decode: {e}"))?;
        interpret(body)
    }
}

fn parse_label(s: &str) -> Option<Label> {
    match s.trim().to_ascii_lowercase().as_str() {
        "positive" | "pos" => Some(Label::Positive),
        "neutral" | "neu" => Some(Label::Neutral),
        "negative" | "neg" => Some(Label::Negative),
        _ => None,
    }
}

fn interpret(body: ClassifyResp) -> Result<Sentiment, String> {
    if !body.score.is_finite() {
        return Err("non-finite score".to_string());
    }
    let clamped = Sentiment::from_score(body.score);
    let label = body
        .label
        .as_deref()
        .and_then(parse_label)
        .unwrap_or(clamped.label);
    Ok(Sentiment {
        score: clamped.score,
        label,
    })
}

#[async_trait]
impl SentimentScorer for ClassifierScorer {
    async fn score(&self, text: &str) -> Sentiment {
        if text.trim().is_empty() {
            return Sentiment::NEUTRAL;
        }
        match self.classify(text).await {
            Ok(s) => s,
            Err(reason) => {
                counter!("xsent_scoring_failures_total").increment(1);
                tracing::warn!(
                    target: "scoring",
                    reason = %reason,
                    text_id = %crate::analyze::anon_hash(text),
                    "classifier failed; scoring neutral"
                );
                Sentiment::NEUTRAL
            }
        }
    }

    fn name(&self) -> &'static str {
        "classifier"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resp(score: f64, label: Option<&str>) -> ClassifyResp {
        ClassifyResp {
            score,
            label: label.map(str::to_string),
        }
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let s = interpret(resp(4.2, None)).unwrap();
        assert_eq!(s.score, 1.0);
        assert_eq!(s.label, Label::Positive);
    }

    #[test]
    fn explicit_label_wins_over_thresholds() {
        let s = interpret(resp(0.02, Some("NEG"))).unwrap();
        assert_eq!(s.score, 0.02);
        assert_eq!(s.label, Label::Negative);
    }

    #[test]
    fn unknown_label_falls_back_to_thresholds() {
        let s = interpret(resp(-0.4, Some("bearish-ish"))).unwrap();
        assert_eq!(s.label, Label::Negative);
    }

    #[test]
    fn non_finite_score_is_an_error() {
        assert!(interpret(resp(f64::INFINITY, None)).is_err());
    }

    #[tokio::test]
    async fn unreachable_service_scores_neutral() {
        let cfg = ScorerConfig::default();
        // port 9 (discard) on localhost is closed in test environments
        let s = ClassifierScorer::new("http://127.0.0.1:9/classify", &cfg).unwrap();
        assert_eq!(s.score("bullish!").await, Sentiment::NEUTRAL);
    }

    #[tokio::test]
    async fn blank_text_skips_the_call() {
        let cfg = ScorerConfig::default();
        let s = ClassifierScorer::new("http://127.0.0.1:9/classify", &cfg).unwrap();
        assert_eq!(s.score("   ").await, Sentiment::NEUTRAL);
    }
}
