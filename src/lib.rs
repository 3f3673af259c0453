// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod analyze;
pub mod api;
pub mod cache;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod exchange;
pub mod ingest;
pub mod metrics;
pub mod sentiment;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::config::AppConfig;
pub use crate::decision::{Recommendation, Side, SignalRule, ThresholdRule};
pub use crate::engine::{AggregateResult, Aggregator};
pub use crate::ingest::types::Provenance;
