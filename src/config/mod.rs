// src/config/mod.rs
//! Process configuration.
//!
//! Everything a collaborator needs (credentials, base URLs, timeouts, policies)
//! lives in one `AppConfig` built at startup and passed in at construction time.
//! Business logic never reads the process environment.

pub mod exchange;
pub mod logging;
pub mod scorer;
pub mod search;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub use exchange::ExchangeConfig;
pub use logging::LoggingConfig;
pub use scorer::{ScorerConfig, ScorerKind};
pub use search::{FallbackPolicy, SearchConfig};

pub const DEFAULT_CONFIG_PATH: &str = "config/xsent.toml";
pub const ENV_CONFIG_PATH: &str = "XSENT_CONFIG_PATH";

fn default_scoring_budget_ms() -> u64 {
    25_000
}

/// Aggregator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Total wall-clock budget for scoring one batch.
    #[serde(default = "default_scoring_budget_ms")]
    pub scoring_budget_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scoring_budget_ms: default_scoring_budget_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub search: SearchConfig,
    pub scorer: ScorerConfig,
    pub engine: EngineConfig,
    pub exchange: ExchangeConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load using file + env fallbacks:
    /// 1) $XSENT_CONFIG_PATH (must exist when set)
    /// 2) config/xsent.toml
    /// 3) built-in defaults
    ///
    /// Environment overrides are applied last.
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => Self::load_from_file(PathBuf::from(p))?,
            Err(_) => {
                let default_p = Path::new(DEFAULT_CONFIG_PATH);
                if default_p.exists() {
                    Self::load_from_file(default_p)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&data)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let mut cfg: AppConfig = toml::from_str(s)?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Apply overrides from a key lookup (the real environment in production,
    /// a map in tests). Unknown enum values are ignored with a warning.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("X_BEARER") {
            self.search.bearer_token = v;
        }
        if let Some(v) = get("XSENT_FALLBACK") {
            match v.parse::<FallbackPolicy>() {
                Ok(p) => self.search.policy = p,
                Err(e) => tracing::warn!(error = %e, "ignoring XSENT_FALLBACK"),
            }
        }
        // Legacy switch; wins over XSENT_FALLBACK.
        if get("XSENT_FORCE_DEMO").as_deref() == Some("1") {
            self.search.policy = FallbackPolicy::ForceDemo;
        }
        if let Some(v) = get("XSENT_SCORER") {
            match v.parse::<ScorerKind>() {
                Ok(k) => self.scorer.kind = k,
                Err(e) => tracing::warn!(error = %e, "ignoring XSENT_SCORER"),
            }
        }
        if let Some(v) = get("XSENT_CLASSIFIER_URL") {
            self.scorer.classifier_url = Some(v);
        }
        if let Some(v) = get("XSENT_CLASSIFIER_KEY") {
            self.scorer.classifier_api_key = v;
        }
        if let Some(v) = get("KALSHI_HOST") {
            self.exchange.base_url = v;
        }
        if let Some(v) = get("KALSHI_API_KEY_ID") {
            self.exchange.api_key_id = v;
        }
        if let Some(v) = get("XSENT_LOG_FORMAT") {
            self.logging.format = v;
        }
    }

    /// Clamp numbers into sane ranges instead of rejecting the whole file.
    pub fn sanitize(&mut self) {
        self.search.sanitize();
        self.scorer.sanitize();
        self.exchange.sanitize();
        if self.engine.scoring_budget_ms == 0 {
            self.engine.scoring_budget_ms = default_scoring_budget_ms();
        }
    }

    /// Configuration summary safe to expose on a debug endpoint.
    pub fn masked_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "search": {
                "base_url": self.search.base_url,
                "bearer_token": mask(&self.search.bearer_token),
                "policy": self.search.policy,
                "max_attempts": self.search.max_attempts,
                "backoff_base_ms": self.search.backoff_base_ms,
            },
            "scorer": {
                "kind": self.scorer.kind,
                "classifier_url": self.scorer.classifier_url,
                "classifier_api_key": mask(&self.scorer.classifier_api_key),
                "timeout_secs": self.scorer.timeout_secs,
            },
            "engine": { "scoring_budget_ms": self.engine.scoring_budget_ms },
            "exchange": {
                "base_url": self.exchange.base_url,
                "api_key_id": mask(&self.exchange.api_key_id),
                "markets_ttl_secs": self.exchange.markets_ttl_secs,
            },
        })
    }
}

/// Keep only the first and last four characters of a secret.
pub fn mask(v: &str) -> String {
    let chars: Vec<char> = v.chars().collect();
    match chars.len() {
        0 => String::new(),
        1..=8 => "***".to_string(),
        n => {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[n - 4..].iter().collect();
            format!("{head}…{tail}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let m: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| m.get(k).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let c = AppConfig::default();
        assert_eq!(c.search.policy, FallbackPolicy::Fallback);
        assert_eq!(c.search.max_attempts, 3);
        assert_eq!(c.search.backoff_base_ms, 3_000);
        assert_eq!(c.engine.scoring_budget_ms, 25_000);
        assert_eq!(c.scorer.kind, ScorerKind::Heuristic);
        assert_eq!(c.exchange.markets_ttl_secs, 20);
    }

    #[test]
    fn toml_sections_are_optional_and_partial() {
        let c = AppConfig::from_toml_str(
            r#"
            [search]
            policy = "fail_hard"
            backoff_base_ms = 10

            [scorer]
            kind = "classifier"
            classifier_url = "http://127.0.0.1:9/classify"
            timeout_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(c.search.policy, FallbackPolicy::FailHard);
        assert_eq!(c.search.backoff_base_ms, 10);
        assert_eq!(c.search.max_attempts, 3);
        assert_eq!(c.scorer.kind, ScorerKind::Classifier);
        // clamped into the 6..=25s window
        assert_eq!(c.scorer.timeout_secs, 25);
        assert_eq!(c.engine.scoring_budget_ms, 25_000);
    }

    #[test]
    fn env_overrides_win_and_force_demo_beats_fallback_var() {
        let mut c = AppConfig::default();
        c.apply_env(lookup(&[
            ("X_BEARER", " token-123 "),
            ("XSENT_FALLBACK", "fail_hard"),
            ("XSENT_FORCE_DEMO", "1"),
            ("XSENT_SCORER", "classifier"),
            ("KALSHI_HOST", "https://demo.example"),
        ]));
        assert_eq!(c.search.bearer_token, "token-123");
        assert_eq!(c.search.policy, FallbackPolicy::ForceDemo);
        assert_eq!(c.scorer.kind, ScorerKind::Classifier);
        assert_eq!(c.exchange.base_url, "https://demo.example");
    }

    #[test]
    fn unknown_policy_value_is_ignored() {
        let mut c = AppConfig::default();
        c.apply_env(lookup(&[("XSENT_FALLBACK", "sometimes")]));
        assert_eq!(c.search.policy, FallbackPolicy::Fallback);
    }

    #[test]
    fn masked_summary_hides_secrets() {
        let mut c = AppConfig::default();
        c.search.bearer_token = "AAAAsecretsecretZZZZ".into();
        c.scorer.classifier_api_key = "short".into();
        let v = c.masked_summary();
        assert_eq!(v["search"]["bearer_token"], "AAAA…ZZZZ");
        assert_eq!(v["scorer"]["classifier_api_key"], "***");
        assert_eq!(v["exchange"]["api_key_id"], "");
    }

    #[serial_test::serial]
    #[test]
    fn load_reads_file_from_env_path() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("xsent.toml");
        fs::write(&p, "[engine]\nscoring_budget_ms = 1234\n").unwrap();
        std::env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        let c = AppConfig::load().unwrap();
        std::env::remove_var(ENV_CONFIG_PATH);
        assert_eq!(c.engine.scoring_budget_ms, 1234);
    }

    #[serial_test::serial]
    #[test]
    fn load_fails_when_env_path_is_missing() {
        std::env::set_var(ENV_CONFIG_PATH, "/definitely/not/here/xsent.toml");
        let err = AppConfig::load().unwrap_err();
        std::env::remove_var(ENV_CONFIG_PATH);
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
