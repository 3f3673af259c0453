// src/ingest/mod.rs
pub mod demo;
pub mod providers;
pub mod types;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{FallbackPolicy, SearchConfig};
use crate::error::{AnalyzeError, SearchError};
use crate::ingest::types::{FetchedBatch, Post, Provenance, SearchProvider};

/// Per-call page cap of the search API.
pub const MAX_PER_CALL: usize = 100;

const MAX_TEXT_CHARS: usize = 4000;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "xsent_posts_fetched_total",
            "Posts returned by the live search provider."
        );
        describe_counter!(
            "xsent_search_retries_total",
            "Search attempts that failed and were retried."
        );
        describe_counter!(
            "xsent_demo_fallback_total",
            "Batches served from the synthetic dataset."
        );
    });
}

/// Normalize post text: decode HTML entities, collapse whitespace, trim.
/// Punctuation is kept; the scorer counts exclamation marks.
pub fn normalize_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("static regex"));
    let mut out = re_ws.replace_all(&decoded, " ").trim().to_string();

    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }
    out
}

/// Fetches one bounded batch per call, retrying transient failures and
/// applying the configured fallback policy.
#[derive(Clone)]
pub struct PostSource {
    provider: Arc<dyn SearchProvider>,
    policy: FallbackPolicy,
    max_attempts: u32,
    backoff_base: Duration,
}

impl PostSource {
    pub fn new(provider: Arc<dyn SearchProvider>, cfg: &SearchConfig) -> Self {
        Self {
            provider,
            policy: cfg.policy,
            max_attempts: cfg.max_attempts.max(1),
            backoff_base: cfg.backoff_base(),
        }
    }

    /// Fetch up to `k` posts (clamped to 1..=100).
    ///
    /// Only returns `Err` under `FallbackPolicy::FailHard`; otherwise a failed
    /// upstream yields a DEMO batch.
    pub async fn fetch(
        &self,
        query: &str,
        k: usize,
        language: Option<&str>,
    ) -> Result<FetchedBatch, AnalyzeError> {
        ensure_metrics_described();
        let k = k.clamp(1, MAX_PER_CALL);

        if self.policy == FallbackPolicy::ForceDemo {
            tracing::info!(target: "ingest", query, "force-demo policy: serving DEMO batch");
            return Ok(demo_batch(query, k, 0));
        }

        let mut attempts = 0u32;
        let mut backoff = self.backoff_base;
        let last_err = loop {
            attempts += 1;
            match self.provider.search(query, k, language).await {
                Ok(posts) => {
                    let posts = finish_posts(posts, k);
                    counter!("xsent_posts_fetched_total").increment(posts.len() as u64);
                    tracing::info!(
                        target: "ingest",
                        provider = self.provider.name(),
                        fetched = posts.len(),
                        attempts,
                        "LIVE batch fetched"
                    );
                    return Ok(FetchedBatch {
                        source: Provenance::Live,
                        posts,
                        attempts,
                    });
                }
                Err(e) if !e.is_retryable() => {
                    tracing::warn!(target: "ingest", error = %e, attempts, "search not retryable");
                    break e;
                }
                Err(e) => {
                    if attempts >= self.max_attempts {
                        tracing::warn!(target: "ingest", error = %e, attempts, "search attempts exhausted");
                        break e;
                    }
                    counter!("xsent_search_retries_total").increment(1);
                    tracing::warn!(
                        target: "ingest",
                        error = %e,
                        attempt = attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        "search failed, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
            }
        };

        self.degrade(query, k, attempts, last_err)
    }

    fn degrade(
        &self,
        query: &str,
        k: usize,
        attempts: u32,
        err: SearchError,
    ) -> Result<FetchedBatch, AnalyzeError> {
        match self.policy {
            FallbackPolicy::FailHard => Err(AnalyzeError::Upstream {
                attempts,
                source: err,
            }),
            _ => {
                tracing::warn!(
                    target: "ingest",
                    error = %err,
                    attempts,
                    "falling back to DEMO data"
                );
                Ok(demo_batch(query, k, attempts))
            }
        }
    }
}

fn demo_batch(query: &str, k: usize, attempts: u32) -> FetchedBatch {
    counter!("xsent_demo_fallback_total").increment(1);
    FetchedBatch {
        source: Provenance::Demo,
        posts: demo::demo_posts(query, k),
        attempts,
    }
}

fn finish_posts(posts: Vec<Post>, k: usize) -> Vec<Post> {
    posts
        .into_iter()
        .take(k)
        .map(|mut p| {
            p.text = normalize_text(&p.text);
            p
        })
        .collect()
}
