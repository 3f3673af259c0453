use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// What the post source does when the upstream API cannot deliver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Degrade to the synthetic dataset, tagged DEMO.
    #[default]
    Fallback,
    /// Never touch the network; always DEMO.
    ForceDemo,
    /// Surface the upstream error to the caller.
    FailHard,
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fallback" => Ok(Self::Fallback),
            "force_demo" | "demo" => Ok(Self::ForceDemo),
            "fail_hard" | "strict" => Ok(Self::FailHard),
            other => Err(format!("unknown fallback policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub base_url: String,
    pub bearer_token: String,
    pub policy: FallbackPolicy,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub request_timeout_secs: u64,
    /// Language filter applied when the caller does not pass one.
    pub default_language: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.twitter.com".to_string(),
            bearer_token: String::new(),
            policy: FallbackPolicy::Fallback,
            max_attempts: 3,
            backoff_base_ms: 3_000,
            request_timeout_secs: 25,
            default_language: Some("en".to_string()),
        }
    }
}

impl SearchConfig {
    pub(crate) fn sanitize(&mut self) {
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        self.max_attempts = self.max_attempts.clamp(1, 10);
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = 25;
        }
        if self
            .default_language
            .as_deref()
            .is_some_and(|l| l.trim().is_empty())
        {
            self.default_language = None;
        }
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
