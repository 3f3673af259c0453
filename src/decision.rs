//! # Signal Rule
//! Pure mapping from aggregate sentiment to a trade recommendation, plus the
//! order ticket forwarded to the exchange on explicit confirmation.
//!
//! Rules implement `SignalRule`; the aggregator never sees them.

use serde::{Deserialize, Serialize};

use crate::engine::AggregateResult;
use crate::error::ExchangeError;
use crate::sentiment::round_dp;

pub const MIN_PRICE_CENTS: u32 = 1;
pub const MAX_PRICE_CENTS: u32 = 99;
pub const MAX_ORDER_QUANTITY: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Yes,
    No,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub side: Side,
    /// In [0.0, 1.0].
    pub confidence: f64,
    /// Integer cents, 1..=99.
    pub suggested_price: u32,
}

impl Recommendation {
    pub const HOLD: Recommendation = Recommendation {
        side: Side::Hold,
        confidence: 0.3,
        suggested_price: 50,
    };
}

pub trait SignalRule: Send + Sync {
    fn recommend(&self, average_score: f64, positive: usize, negative: usize) -> Recommendation;

    fn evaluate(&self, result: &AggregateResult) -> Recommendation {
        self.recommend(
            result.average_score,
            result.counts.positive,
            result.counts.negative,
        )
    }
}

/// YES when sentiment is clearly positive and positives outnumber negatives
/// at least 2:1; NO for the mirror image; HOLD otherwise.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdRule {
    pub threshold: f64,
    pub dominance: usize,
    pub max_confidence: f64,
    pub entry_price: u32,
}

impl Default for ThresholdRule {
    fn default() -> Self {
        Self {
            threshold: 0.15,
            dominance: 2,
            max_confidence: 0.99,
            entry_price: 60,
        }
    }
}

impl SignalRule for ThresholdRule {
    fn recommend(&self, average_score: f64, positive: usize, negative: usize) -> Recommendation {
        if average_score >= self.threshold && positive >= self.dominance * negative.max(1) {
            return Recommendation {
                side: Side::Yes,
                confidence: self.max_confidence.min(round_dp(average_score, 3)),
                suggested_price: self.entry_price,
            };
        }
        if average_score <= -self.threshold && negative >= self.dominance * positive.max(1) {
            return Recommendation {
                side: Side::No,
                confidence: self.max_confidence.min(round_dp(average_score.abs(), 3)),
                suggested_price: self.entry_price,
            };
        }
        Recommendation::HOLD
    }
}

/// Order side as the exchange expects it on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

impl TryFrom<Side> for OrderSide {
    type Error = ExchangeError;

    /// YES buys, NO sells. HOLD is not an order.
    fn try_from(side: Side) -> Result<Self, Self::Error> {
        match side {
            Side::Yes => Ok(OrderSide::Buy),
            Side::No => Ok(OrderSide::Sell),
            Side::Hold => Err(ExchangeError::InvalidOrder(
                "HOLD cannot be submitted as an order".to_string(),
            )),
        }
    }
}

/// What gets forwarded to the exchange, unchanged, after user confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTicket {
    pub ticker: String,
    pub side: OrderSide,
    pub price_cents: u32,
    pub quantity: u32,
}

impl OrderTicket {
    pub fn new(
        ticker: impl Into<String>,
        side: Side,
        price_cents: u32,
        quantity: u32,
    ) -> Result<Self, ExchangeError> {
        let ticker = ticker.into().trim().to_string();
        if ticker.is_empty() {
            return Err(ExchangeError::InvalidOrder("ticker must not be empty".into()));
        }
        if !(MIN_PRICE_CENTS..=MAX_PRICE_CENTS).contains(&price_cents) {
            return Err(ExchangeError::InvalidOrder(format!(
                "price {price_cents} outside {MIN_PRICE_CENTS}..={MAX_PRICE_CENTS} cents"
            )));
        }
        if !(1..=MAX_ORDER_QUANTITY).contains(&quantity) {
            return Err(ExchangeError::InvalidOrder(format!(
                "quantity {quantity} outside 1..={MAX_ORDER_QUANTITY}"
            )));
        }
        Ok(Self {
            ticker,
            side: OrderSide::try_from(side)?,
            price_cents,
            quantity,
        })
    }

    /// Ticket at the recommendation's suggested price.
    pub fn from_recommendation(
        ticker: impl Into<String>,
        rec: &Recommendation,
        quantity: u32,
    ) -> Result<Self, ExchangeError> {
        Self::new(ticker, rec.side, rec.suggested_price, quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule() -> ThresholdRule {
        ThresholdRule::default()
    }

    #[test]
    fn yes_scenario() {
        let r = rule().recommend(0.2, 5, 1);
        assert_eq!(r.side, Side::Yes);
        assert_eq!(r.confidence, 0.2);
        assert_eq!(r.suggested_price, 60);
    }

    #[test]
    fn no_scenario() {
        let r = rule().recommend(-0.3, 1, 4);
        assert_eq!(r.side, Side::No);
        assert_eq!(r.confidence, 0.3);
        assert_eq!(r.suggested_price, 60);
    }

    #[test]
    fn hold_scenario() {
        let r = rule().recommend(0.05, 3, 3);
        assert_eq!(r, Recommendation::HOLD);
        assert_eq!(r.confidence, 0.3);
        assert_eq!(r.suggested_price, 50);
    }

    #[test]
    fn zero_negatives_still_need_two_positives() {
        assert_eq!(rule().recommend(0.5, 1, 0).side, Side::Hold);
        assert_eq!(rule().recommend(0.5, 2, 0).side, Side::Yes);
        assert_eq!(rule().recommend(-0.5, 0, 1).side, Side::Hold);
        assert_eq!(rule().recommend(-0.5, 0, 2).side, Side::No);
    }

    #[test]
    fn thresholds_are_inclusive() {
        assert_eq!(rule().recommend(0.15, 2, 1).side, Side::Yes);
        assert_eq!(rule().recommend(-0.15, 1, 2).side, Side::No);
        assert_eq!(rule().recommend(0.1499, 9, 0).side, Side::Hold);
    }

    #[test]
    fn confidence_is_capped_and_rounded() {
        assert_eq!(rule().recommend(1.0, 10, 0).confidence, 0.99);
        assert_eq!(rule().recommend(0.23456, 10, 0).confidence, 0.235);
        assert_eq!(rule().recommend(-1.0, 0, 10).confidence, 0.99);
    }

    #[test]
    fn dominance_failure_holds_even_with_strong_average() {
        assert_eq!(rule().recommend(0.6, 3, 2).side, Side::Hold);
    }

    #[test]
    fn pure_function() {
        let a = rule().recommend(0.31, 7, 2);
        for _ in 0..5 {
            assert_eq!(rule().recommend(0.31, 7, 2), a);
        }
    }

    #[test]
    fn nan_average_holds() {
        assert_eq!(rule().recommend(f64::NAN, 5, 0), Recommendation::HOLD);
    }

    #[test]
    fn recommendation_serializes_uppercase_side() {
        let v = serde_json::to_value(rule().recommend(0.2, 5, 1)).unwrap();
        assert_eq!(v["side"], "YES");
        assert_eq!(v["suggested_price"], 60);
    }

    #[test]
    fn ticket_maps_yes_to_buy_and_no_to_sell() {
        let t = OrderTicket::new("KXBTC-25", Side::Yes, 60, 1).unwrap();
        assert_eq!(t.side, OrderSide::Buy);
        let t = OrderTicket::new("KXBTC-25", Side::No, 40, 3).unwrap();
        assert_eq!(t.side.as_str(), "sell");
    }

    #[test]
    fn ticket_rejects_hold_and_bad_bounds() {
        assert!(OrderTicket::new("T", Side::Hold, 50, 1).is_err());
        assert!(OrderTicket::new("  ", Side::Yes, 50, 1).is_err());
        assert!(OrderTicket::new("T", Side::Yes, 0, 1).is_err());
        assert!(OrderTicket::new("T", Side::Yes, 100, 1).is_err());
        assert!(OrderTicket::new("T", Side::Yes, 50, 0).is_err());
        assert!(OrderTicket::new("T", Side::Yes, 50, 101).is_err());
    }

    #[test]
    fn ticket_from_recommendation_uses_suggested_price() {
        let rec = rule().recommend(-0.3, 1, 4);
        let t = OrderTicket::from_recommendation("T", &rec, 2).unwrap();
        assert_eq!(t.price_cents, 60);
        assert_eq!(t.side, OrderSide::Sell);
    }
}
