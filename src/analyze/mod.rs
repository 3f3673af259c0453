// src/analyze/mod.rs
//! Scorer selection: builds the configured `SentimentScorer`.

pub mod classifier;

use std::sync::Arc;

use crate::config::{ScorerConfig, ScorerKind};
use crate::sentiment::{HeuristicScorer, SentimentScorer};

pub use classifier::ClassifierScorer;

/// Convenient alias used by callers.
pub type DynScorer = Arc<dyn SentimentScorer>;

/// Factory: build a scorer according to config.
///
/// * `heuristic` → local lexicon scorer.
/// * `classifier` with a URL → remote scorer.
/// * `classifier` without a URL (or a client build failure) → heuristic, with a warning.
pub fn build_scorer(cfg: &ScorerConfig) -> DynScorer {
    match (cfg.kind, cfg.classifier_url.as_deref()) {
        (ScorerKind::Heuristic, _) => Arc::new(HeuristicScorer::new()),
        (ScorerKind::Classifier, Some(url)) => match ClassifierScorer::new(url, cfg) {
            Ok(c) => {
                tracing::info!(target: "scoring", url, timeout_secs = cfg.timeout_secs, "classifier scorer enabled");
                Arc::new(c)
            }
            Err(e) => {
                tracing::warn!(target: "scoring", error = %e, "classifier client build failed; using heuristic");
                Arc::new(HeuristicScorer::new())
            }
        },
        (ScorerKind::Classifier, None) => {
            tracing::warn!(target: "scoring", "classifier selected but no URL configured; using heuristic");
            Arc::new(HeuristicScorer::new())
        }
    }
}

/// Short stable id for a text, for logs that must not carry the raw text.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
