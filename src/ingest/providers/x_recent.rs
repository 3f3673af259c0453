//! X (Twitter) v2 recent search, single page per call.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::ingest::types::{Post, PostMetrics, SearchProvider};

pub const SEARCH_PATH: &str = "/2/tweets/search/recent";

/// The endpoint rejects `max_results` outside 10..=100.
const API_MIN_RESULTS: usize = 10;
const API_MAX_RESULTS: usize = 100;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Option<Vec<Tweet>>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    lang: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    author_id: Option<String>,
    #[serde(default)]
    public_metrics: Option<PostMetrics>,
}

impl From<Tweet> for Post {
    fn from(t: Tweet) -> Self {
        Post {
            id: t.id,
            text: t.text,
            language: t.lang,
            created_at: t.created_at,
            author_id: t.author_id,
            metrics: t.public_metrics,
        }
    }
}

pub struct XRecentSearch {
    http: reqwest::Client,
    url: String,
    bearer: String,
}

impl XRecentSearch {
    pub fn from_config(cfg: &SearchConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("xsent/", env!("CARGO_PKG_VERSION")))
            .timeout(cfg.request_timeout())
            .build()?;
        Ok(Self {
            http,
            url: format!("{}{}", cfg.base_url.trim_end_matches('/'), SEARCH_PATH),
            bearer: cfg.bearer_token.trim().to_string(),
        })
    }
}

/// `(<q>) lang:<lang>` when a language filter is present.
pub fn build_query(query: &str, language: Option<&str>) -> String {
    match language.map(str::trim).filter(|l| !l.is_empty()) {
        Some(lang) => format!("({query}) lang:{lang}"),
        None => query.to_string(),
    }
}

#[async_trait]
impl SearchProvider for XRecentSearch {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        language: Option<&str>,
    ) -> Result<Vec<Post>, SearchError> {
        if self.bearer.is_empty() {
            return Err(SearchError::MissingCredentials);
        }

        let page = limit.clamp(API_MIN_RESULTS, API_MAX_RESULTS).to_string();
        let q = build_query(query, language);
        let resp = self
            .http
            .get(&self.url)
            .bearer_auth(&self.bearer)
            .query(&[
                ("query", q.as_str()),
                ("max_results", page.as_str()),
                ("tweet.fields", "lang,created_at,author_id,public_metrics"),
            ])
            .send()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::RateLimited);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SearchError::Unauthorized {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status: status.as_u16(),
                body: body.chars().take(300).collect(),
            });
        }

        let body: SearchResponse = resp
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;
        let mut posts: Vec<Post> = body
            .data
            .unwrap_or_default()
            .into_iter()
            .map(Post::from)
            .collect();
        posts.truncate(limit);
        Ok(posts)
    }

    fn name(&self) -> &'static str {
        "x_recent"
    }
}
