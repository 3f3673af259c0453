use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

pub const MIN_CLASSIFIER_TIMEOUT_SECS: u64 = 6;
pub const MAX_CLASSIFIER_TIMEOUT_SECS: u64 = 25;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    #[default]
    Heuristic,
    Classifier,
}

impl FromStr for ScorerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heuristic" | "lexicon" => Ok(Self::Heuristic),
            "classifier" | "remote" => Ok(Self::Classifier),
            other => Err(format!("unknown scorer '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    pub kind: ScorerKind,
    pub classifier_url: Option<String>,
    pub classifier_api_key: String,
    pub timeout_secs: u64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            kind: ScorerKind::Heuristic,
            classifier_url: None,
            classifier_api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

impl ScorerConfig {
    pub(crate) fn sanitize(&mut self) {
        self.timeout_secs = self
            .timeout_secs
            .clamp(MIN_CLASSIFIER_TIMEOUT_SECS, MAX_CLASSIFIER_TIMEOUT_SECS);
        if self
            .classifier_url
            .as_deref()
            .is_some_and(|u| u.trim().is_empty())
        {
            self.classifier_url = None;
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
