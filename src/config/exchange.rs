use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub base_url: String,
    /// Identifier handed to the request signer; the key material itself never
    /// passes through this crate.
    pub api_key_id: String,
    pub markets_ttl_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elections.kalshi.com".to_string(),
            api_key_id: String::new(),
            markets_ttl_secs: 20,
            request_timeout_secs: 20,
        }
    }
}

impl ExchangeConfig {
    pub(crate) fn sanitize(&mut self) {
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        if self.markets_ttl_secs == 0 {
            self.markets_ttl_secs = 20;
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = 20;
        }
    }

    pub fn markets_ttl(&self) -> Duration {
        Duration::from_secs(self.markets_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
