//! Sentiment scoring contract and the local lexicon heuristic.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

static LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let raw = include_str!("../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, i32>>(raw).expect("valid sentiment lexicon")
});

/// Words joined by apostrophes, or one emoji from the pictograph blocks.
static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9_'\x{2019}]+|[\x{1F300}-\x{1FAFF}]").expect("token regex"));

pub const POSITIVE_THRESHOLD: f64 = 0.05;
pub const NEGATIVE_THRESHOLD: f64 = -0.05;
/// Raw sum that maps to a full +/-1.0.
pub const SATURATION: f64 = 6.0;
pub const EXCLAMATION_WEIGHT: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Positive,
    Neutral,
    Negative,
}

impl Label {
    /// Threshold mapping shared by every scorer.
    pub fn from_score(score: f64) -> Self {
        if score > POSITIVE_THRESHOLD {
            Label::Positive
        } else if score < NEGATIVE_THRESHOLD {
            Label::Negative
        } else {
            Label::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    /// Always within [-1.0, 1.0].
    pub score: f64,
    pub label: Label,
}

impl Sentiment {
    pub const NEUTRAL: Sentiment = Sentiment {
        score: 0.0,
        label: Label::Neutral,
    };

    /// Clamp an arbitrary value into range; NaN/inf become neutral.
    pub fn from_score(score: f64) -> Self {
        if !score.is_finite() {
            return Self::NEUTRAL;
        }
        let score = score.clamp(-1.0, 1.0);
        Self {
            score,
            label: Label::from_score(score),
        }
    }
}

/// Text in, sentiment out. Implementations absorb their own failures.
#[async_trait]
pub trait SentimentScorer: Send + Sync {
    async fn score(&self, text: &str) -> Sentiment;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Default)]
pub struct HeuristicScorer;

impl HeuristicScorer {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn word_score(&self, w: &str) -> i32 {
        *LEXICON.get(w).unwrap_or(&0)
    }

    /// Deterministic lexicon scan.
    ///
    /// A negator flips the sign of the next non-zero contribution only; tokens
    /// that score zero do not consume it.
    pub fn score_text(&self, text: &str) -> Sentiment {
        let tokens: Vec<String> = tokenize(text).collect();
        if tokens.is_empty() {
            return Sentiment::NEUTRAL;
        }

        let mut raw = 0.0f64;
        let mut negate = false;
        for t in &tokens {
            if is_negator(t) {
                negate = true;
                continue;
            }
            let mut delta = self.word_score(t) as f64;
            if negate && delta != 0.0 {
                delta = -delta;
                negate = false;
            }
            raw += delta;
        }

        let exclam = text.chars().filter(|&c| c == '!').count();
        if exclam > 0 {
            raw *= (1.0 + EXCLAMATION_WEIGHT * exclam as f64).min(1.0);
        }

        let norm = (raw / SATURATION).clamp(-1.0, 1.0);
        Sentiment::from_score(round_dp(norm, 4))
    }
}

#[async_trait]
impl SentimentScorer for HeuristicScorer {
    async fn score(&self, text: &str) -> Sentiment {
        self.score_text(text)
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

/// Lowercased tokens; typographic apostrophes are folded to ASCII first.
pub fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    TOKEN_RE
        .find_iter(s)
        .map(|m| m.as_str().replace('\u{2019}', "'"))
        .map(|t| t.trim_matches('\'').to_lowercase())
        .filter(|t| !t.is_empty())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "hardly"
            | "barely"
            | "scarcely"
            | "isn't"
            | "wasn't"
            | "don't"
            | "doesn't"
            | "didn't"
            | "can't"
            | "won't"
    )
}

/// Round half away from zero to `dp` decimal places.
pub fn round_dp(x: f64, dp: i32) -> f64 {
    let f = 10f64.powi(dp);
    (x * f).round() / f
}
