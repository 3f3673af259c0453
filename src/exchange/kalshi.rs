//! Kalshi trade API v2 over HTTPS.
//!
//! Authentication headers come from a `RequestSigner`. Requests are sent once;
//! a non-2xx answer becomes `ExchangeError::Rejected` carrying the body as is.

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use std::sync::Arc;

use crate::config::ExchangeConfig;
use crate::decision::OrderTicket;
use crate::error::ExchangeError;
use crate::exchange::{Balance, Exchange, Market};

pub const MARKETS_PATH: &str = "/trade-api/v2/markets";
pub const BALANCE_PATH: &str = "/trade-api/v2/portfolio/balance";
pub const ORDERS_PATH: &str = "/trade-api/v2/portfolio/orders";

pub const ACCESS_KEY_HEADER: &str = "KALSHI-ACCESS-KEY";

/// Produces the authentication headers for one request.
///
/// `key_id` is the configured API key id; `path` is the request path without
/// the query string. The client sends `key_id` itself as `KALSHI-ACCESS-KEY`.
pub trait RequestSigner: Send + Sync {
    fn sign(
        &self,
        key_id: &str,
        method: &str,
        path: &str,
    ) -> Result<Vec<(String, String)>, ExchangeError>;
}

#[derive(Debug, Deserialize)]
struct MarketsResponse {
    #[serde(default)]
    markets: Vec<Market>,
}

pub struct KalshiClient {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    signer: Arc<dyn RequestSigner>,
}

impl KalshiClient {
    pub fn new(cfg: &ExchangeConfig, signer: Arc<dyn RequestSigner>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("xsent/", env!("CARGO_PKG_VERSION")))
            .timeout(cfg.request_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            key_id: cfg.api_key_id.trim().to_string(),
            signer,
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, ExchangeError> {
        if self.key_id.is_empty() {
            return Err(ExchangeError::NotConfigured);
        }
        let headers = self.signer.sign(&self.key_id, method.as_str(), path)?;
        let mut rb = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header("Accept", "application/json")
            .header(ACCESS_KEY_HEADER, &self.key_id);
        for (k, v) in headers {
            rb = rb.header(k, v);
        }
        Ok(rb)
    }

    async fn send(&self, rb: reqwest::RequestBuilder) -> Result<serde_json::Value, ExchangeError> {
        let resp = rb
            .send()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(ExchangeError::Rejected {
                status: status.as_u16(),
                message: body,
            });
        }
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| ExchangeError::Decode(e.to_string()))
    }
}

/// Wire body for an order. Field names follow the exchange.
pub fn order_body(ticket: &OrderTicket) -> serde_json::Value {
    serde_json::json!({
        "ticker": ticket.ticker,
        "type": "limit",
        "side": ticket.side.as_str(),
        "price": ticket.price_cents,
        "count": ticket.quantity,
        "time_in_force": "gtc",
    })
}

#[async_trait]
impl Exchange for KalshiClient {
    async fn list_open_markets(&self) -> Result<Vec<Market>, ExchangeError> {
        let rb = self
            .request(Method::GET, MARKETS_PATH)?
            .query(&[("status", "open")]);
        let v = self.send(rb).await?;
        let parsed: MarketsResponse =
            serde_json::from_value(v).map_err(|e| ExchangeError::Decode(e.to_string()))?;
        Ok(parsed.markets)
    }

    async fn get_balance(&self) -> Result<Balance, ExchangeError> {
        let rb = self.request(Method::GET, BALANCE_PATH)?;
        let v = self.send(rb).await?;
        serde_json::from_value(v).map_err(|e| ExchangeError::Decode(e.to_string()))
    }

    async fn place_order(&self, ticket: &OrderTicket) -> Result<serde_json::Value, ExchangeError> {
        let rb = self
            .request(Method::POST, ORDERS_PATH)?
            .json(&order_body(ticket));
        self.send(rb).await
    }

    fn name(&self) -> &'static str {
        "kalshi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Side;

    struct NoSigner;

    impl RequestSigner for NoSigner {
        fn sign(
            &self,
            _key_id: &str,
            _method: &str,
            _path: &str,
        ) -> Result<Vec<(String, String)>, ExchangeError> {
            Err(ExchangeError::Signing("no key loaded".into()))
        }
    }

    #[test]
    fn order_body_is_limit_gtc() {
        let t = OrderTicket::new("KXBTC-25", Side::No, 40, 3).unwrap();
        let v = order_body(&t);
        assert_eq!(v["ticker"], "KXBTC-25");
        assert_eq!(v["type"], "limit");
        assert_eq!(v["side"], "sell");
        assert_eq!(v["price"], 40);
        assert_eq!(v["count"], 3);
        assert_eq!(v["time_in_force"], "gtc");
    }

    #[tokio::test]
    async fn signing_failure_stops_before_any_request() {
        let cfg = ExchangeConfig {
            base_url: "http://127.0.0.1:9".into(),
            api_key_id: "key-id".into(),
            ..Default::default()
        };
        let client = KalshiClient::new(&cfg, Arc::new(NoSigner)).unwrap();
        let err = client.get_balance().await.unwrap_err();
        assert_eq!(err, ExchangeError::Signing("no key loaded".into()));
    }

    #[tokio::test]
    async fn missing_key_id_is_not_configured() {
        let cfg = ExchangeConfig {
            base_url: "http://127.0.0.1:9".into(),
            api_key_id: "  ".into(),
            ..Default::default()
        };
        let client = KalshiClient::new(&cfg, Arc::new(NoSigner)).unwrap();
        assert_eq!(
            client.list_open_markets().await.unwrap_err(),
            ExchangeError::NotConfigured
        );
    }
}
