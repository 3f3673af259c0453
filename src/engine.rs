//! # Aggregation Engine
//! Fetch one batch, score it item by item under a wall-clock budget, and reduce
//! the scores to summary statistics.
//!
//! Policy: scorer failures are absorbed per item (they come back neutral);
//! post-source failures only surface under the fail-hard policy. When the
//! budget runs out the remaining posts are left unscored and the result is
//! marked `truncated`. The average covers scored items only.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use crate::analyze::DynScorer;
use crate::config::EngineConfig;
use crate::error::AnalyzeError;
use crate::ingest::types::{Post, Provenance};
use crate::ingest::PostSource;
use crate::sentiment::{round_dp, Label};

/// Upper bound on `requested` at the service boundary.
pub const MAX_RESULTS_CAP: usize = 300;
pub const DEFAULT_MAX_RESULTS: usize = 10;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_histogram!("xsent_analyze_ms", "End-to-end analyze time in milliseconds.");
        describe_counter!(
            "xsent_batch_truncated_total",
            "Batches cut short by the scoring budget."
        );
        describe_counter!(
            "xsent_scoring_failures_total",
            "Texts the remote classifier failed to score."
        );
    });
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPost {
    #[serde(flatten)]
    pub post: Post,
    pub score: f64,
    pub label: Label,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCounts {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl LabelCounts {
    pub fn record(&mut self, label: Label) {
        match label {
            Label::Positive => self.positive += 1,
            Label::Negative => self.negative += 1,
            Label::Neutral => self.neutral += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }
}

/// Summary of one batch. `n == items.len() <= fetched <= requested`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    /// The caller's query, as given.
    pub query: String,
    pub requested: usize,
    pub fetched: usize,
    pub n: usize,
    /// Mean over scored items, 4 decimals; exactly 0.0 for an empty batch.
    pub average_score: f64,
    pub counts: LabelCounts,
    pub items: Vec<ScoredPost>,
    pub source: Provenance,
    pub truncated: bool,
}

/// Clamp a caller-supplied batch size into `1..=MAX_RESULTS_CAP`.
pub fn clamp_requested(max_results: i64) -> usize {
    max_results.clamp(1, MAX_RESULTS_CAP as i64) as usize
}

/// Mean of `sum` over `n` items, 0.0 when there are none.
pub fn mean_or_zero(sum: f64, n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        round_dp(sum / n as f64, 4)
    }
}

#[derive(Clone)]
pub struct Aggregator {
    source: PostSource,
    scorer: DynScorer,
    budget: Duration,
    default_language: Option<String>,
}

impl Aggregator {
    pub fn new(source: PostSource, scorer: DynScorer, cfg: &EngineConfig) -> Self {
        Self {
            source,
            scorer,
            budget: Duration::from_millis(cfg.scoring_budget_ms),
            default_language: None,
        }
    }

    /// Language filter used when the caller passes none.
    pub fn with_default_language(mut self, lang: Option<String>) -> Self {
        self.default_language = lang;
        self
    }

    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    /// Run one batch end to end.
    pub async fn analyze(
        &self,
        query: &str,
        max_results: i64,
        language: Option<&str>,
    ) -> Result<AggregateResult, AnalyzeError> {
        ensure_metrics_described();
        let t0 = std::time::Instant::now();

        let input = query;
        let query = query.trim();
        if query.is_empty() {
            return Err(AnalyzeError::EmptyQuery);
        }
        let requested = clamp_requested(max_results);
        let language = language.or(self.default_language.as_deref());

        let batch = self.source.fetch(query, requested, language).await?;
        let fetched = batch.posts.len();

        let deadline = Instant::now() + self.budget;
        let mut items = Vec::with_capacity(fetched);
        let mut counts = LabelCounts::default();
        let mut sum = 0.0f64;
        let mut truncated = false;

        for post in batch.posts {
            if Instant::now() >= deadline {
                truncated = true;
                break;
            }
            let s = self.scorer.score(&post.text).await;
            sum += s.score;
            counts.record(s.label);
            items.push(ScoredPost {
                post,
                score: s.score,
                label: s.label,
            });
        }

        let n = items.len();
        if truncated {
            counter!("xsent_batch_truncated_total").increment(1);
            tracing::warn!(
                target: "engine",
                query,
                scored = n,
                fetched,
                budget_ms = self.budget.as_millis() as u64,
                "scoring budget exhausted; partial result"
            );
        }

        let result = AggregateResult {
            query: input.to_string(),
            requested,
            fetched,
            n,
            average_score: mean_or_zero(sum, n),
            counts,
            items,
            source: batch.source,
            truncated,
        };

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("xsent_analyze_ms").record(ms);
        tracing::info!(
            target: "engine",
            query,
            source = %result.source,
            scorer = self.scorer.name(),
            n = result.n,
            avg = result.average_score,
            pos = result.counts.positive,
            neg = result.counts.negative,
            neu = result.counts.neutral,
            ms,
            "batch analyzed"
        );
        Ok(result)
    }
}
