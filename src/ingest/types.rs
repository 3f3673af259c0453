// src/ingest/types.rs
use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// Engagement counters as reported by the search API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMetrics {
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub quote_count: u64,
}

/// One fetched item. `id` is unique within a batch only (demo ids repeat across calls).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<PostMetrics>,
}

impl Post {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            language: None,
            created_at: None,
            author_id: None,
            metrics: None,
        }
    }
}

/// Where a batch came from. DEMO data must never pass for LIVE data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Provenance {
    Live,
    Demo,
    #[default]
    Unknown,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Live => "LIVE",
            Provenance::Demo => "DEMO",
            Provenance::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Posts in fetch order plus their provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedBatch {
    pub source: Provenance,
    pub posts: Vec<Post>,
    /// Number of provider calls made (0 for forced demo).
    pub attempts: u32,
}

/// A search backend. One call = one page of recent posts.
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        language: Option<&str>,
    ) -> Result<Vec<Post>, SearchError>;

    fn name(&self) -> &'static str;
}
