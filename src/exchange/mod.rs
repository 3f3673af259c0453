//! Exchange collaborator: market listings, balance, order placement.
//!
//! Authentication is not handled here. The HTTP client asks a `RequestSigner`
//! for headers and forwards tickets unchanged.

pub mod kalshi;

use async_trait::async_trait;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::TtlCache;
use crate::decision::OrderTicket;
use crate::error::ExchangeError;

pub use kalshi::{KalshiClient, RequestSigner};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "xsent_market_cache_hits_total",
            "Market listings served from the TTL cache."
        );
        describe_counter!("xsent_orders_submitted_total", "Orders forwarded to the exchange.");
        describe_counter!("xsent_orders_failed_total", "Orders the exchange rejected or lost.");
    });
}

/// One listed market. Unknown fields are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub ticker: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Market {
    /// Human label: title, else `question`, else the ticker.
    pub fn display_title(&self) -> &str {
        if !self.title.trim().is_empty() {
            return &self.title;
        }
        self.extra
            .get("question")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.ticker)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Cents.
    pub balance: i64,
}

/// Result of an order submission. `response` is the exchange body, verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderOutcome {
    pub simulated: bool,
    pub ticket: OrderTicket,
    pub response: serde_json::Value,
}

#[async_trait]
pub trait Exchange: Send + Sync {
    async fn list_open_markets(&self) -> Result<Vec<Market>, ExchangeError>;
    async fn get_balance(&self) -> Result<Balance, ExchangeError>;
    async fn place_order(&self, ticket: &OrderTicket) -> Result<serde_json::Value, ExchangeError>;
    fn name(&self) -> &'static str;
}

/// What the service layer talks to: an exchange plus the market-listing cache.
#[derive(Clone)]
pub struct ExchangeDesk {
    exchange: Arc<dyn Exchange>,
    markets: Arc<TtlCache<String, Vec<Market>>>,
}

impl ExchangeDesk {
    pub fn new(exchange: Arc<dyn Exchange>, markets_ttl: Duration) -> Self {
        Self {
            exchange,
            markets: Arc::new(TtlCache::new(markets_ttl)),
        }
    }

    fn markets_key(&self) -> String {
        format!("{}:open_markets", self.exchange.name())
    }

    /// Open markets, served from the cache while fresh.
    pub async fn open_markets(&self) -> Result<Vec<Market>, ExchangeError> {
        ensure_metrics_described();
        let exchange = self.exchange.clone();
        let (markets, hit) = self
            .markets
            .get_or_try_fetch(self.markets_key(), || async move {
                exchange.list_open_markets().await
            })
            .await?;
        if hit {
            counter!("xsent_market_cache_hits_total").increment(1);
        }
        tracing::debug!(target: "exchange", count = markets.len(), cache_hit = hit, "open markets");
        Ok(markets)
    }

    pub fn invalidate_markets(&self) {
        self.markets.invalidate(&self.markets_key());
    }

    pub async fn balance(&self) -> Result<Balance, ExchangeError> {
        self.exchange.get_balance().await
    }

    /// Without `confirm` nothing leaves the process. With it the ticket goes
    /// out exactly once; failures come back as they are.
    pub async fn submit(
        &self,
        ticket: OrderTicket,
        confirm: bool,
    ) -> Result<OrderOutcome, ExchangeError> {
        ensure_metrics_described();
        if !confirm {
            tracing::info!(
                target: "exchange",
                ticker = %ticket.ticker,
                side = ticket.side.as_str(),
                price = ticket.price_cents,
                qty = ticket.quantity,
                "simulated order"
            );
            let response = serde_json::json!({
                "simulated": true,
                "message": format!(
                    "SIM: {} {} @ {}c on {}",
                    ticket.side.as_str(),
                    ticket.quantity,
                    ticket.price_cents,
                    ticket.ticker
                ),
            });
            return Ok(OrderOutcome {
                simulated: true,
                ticket,
                response,
            });
        }

        match self.exchange.place_order(&ticket).await {
            Ok(response) => {
                counter!("xsent_orders_submitted_total").increment(1);
                tracing::info!(
                    target: "exchange",
                    ticker = %ticket.ticker,
                    side = ticket.side.as_str(),
                    price = ticket.price_cents,
                    qty = ticket.quantity,
                    "order accepted"
                );
                Ok(OrderOutcome {
                    simulated: false,
                    ticket,
                    response,
                })
            }
            Err(e) => {
                counter!("xsent_orders_failed_total").increment(1);
                tracing::warn!(target: "exchange", ticker = %ticket.ticker, error = %e, "order failed");
                Err(e)
            }
        }
    }
}
