//! News/context source adapter.
//!
//! [`NewsAdapter`] answers a free-text query from either the Google Custom
//! Search API or a fixed list of RSS feeds. [`NewsProxyClient`] asks a running
//! `news-proxy` for the same results over HTTP so that search credentials stay
//! on the server. Both, and the grounded Gemini search, implement
//! [`ContextSearch`] so the context aggregator can use any of them.

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::{AssistantError, Result};
use crate::feeds::FeedAggregator;
use crate::google_search::GoogleSearchClient;
use crate::models::{SearchDigest, SourceResult};

/// Search step used while aggregating context.
#[async_trait]
pub trait ContextSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<SearchDigest>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMethod {
    #[default]
    Google,
    Rss,
}

impl SearchMethod {
    /// Read a `method` request parameter. Only `rss` selects the feeds;
    /// anything else falls back to Google.
    pub fn from_param(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("rss") {
            SearchMethod::Rss
        } else {
            SearchMethod::Google
        }
    }
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMethod::Google => f.write_str("google"),
            SearchMethod::Rss => f.write_str("rss"),
        }
    }
}

/// Wire body of a successful `GET /search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SourceResult>,
}

/// Wire body of a failed `GET /search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub struct NewsAdapter {
    feeds: FeedAggregator,
    google: Option<GoogleSearchClient>,
    default_method: SearchMethod,
}

impl NewsAdapter {
    pub fn new(feeds: FeedAggregator, google: Option<GoogleSearchClient>) -> Self {
        Self {
            feeds,
            google,
            default_method: SearchMethod::default(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            FeedAggregator::from_config(config)?,
            GoogleSearchClient::from_config(config)?,
        ))
    }

    /// Method used by the [`ContextSearch`] implementation.
    pub fn with_default_method(mut self, method: SearchMethod) -> Self {
        self.default_method = method;
        self
    }

    pub fn google_enabled(&self) -> bool {
        self.google.is_some()
    }

    pub async fn fetch_sources(
        &self,
        query: &str,
        method: SearchMethod,
    ) -> Result<Vec<SourceResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AssistantError::InvalidInput(
                "the \"query\" parameter is required".to_string(),
            ));
        }

        debug!(%query, %method, "fetching news sources");

        match method {
            SearchMethod::Rss => Ok(self.feeds.fetch_sources(query).await),
            SearchMethod::Google => match &self.google {
                Some(google) => google.search(query).await,
                None => Err(AssistantError::configuration(
                    "GOOGLE_CSE_ID or GOOGLE_API_KEY is not configured",
                )),
            },
        }
    }
}

#[async_trait]
impl ContextSearch for NewsAdapter {
    async fn search(&self, query: &str) -> Result<SearchDigest> {
        let results = self.fetch_sources(query, self.default_method).await?;
        Ok(digest_from_results(query, results))
    }
}

/// Turn raw news hits into a digest with a plain listing as its summary.
pub fn digest_from_results(query: &str, results: Vec<SourceResult>) -> SearchDigest {
    let summary = if results.is_empty() {
        format!("No news items matched \"{}\".", query.trim())
    } else {
        let mut summary = format!(
            "Found {} news items matching \"{}\":",
            results.len(),
            query.trim()
        );
        for item in &results {
            summary.push_str(&format!(
                "\n- {} ({}): {}",
                item.title, item.source, item.snippet
            ));
        }
        summary
    };

    SearchDigest {
        summary,
        sources: results,
        ai_generated: false,
    }
}

/// Talks to a running `news-proxy`.
pub struct NewsProxyClient {
    client: Client,
    base_url: String,
    method: Option<SearchMethod>,
}

impl NewsProxyClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().build().map_err(|e| {
            AssistantError::configuration(format!("failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            method: None,
        })
    }

    pub fn with_method(mut self, method: SearchMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub async fn fetch_sources(&self, query: &str) -> Result<Vec<SourceResult>> {
        let mut url = format!(
            "{}/search?query={}",
            self.base_url,
            urlencoding::encode(query)
        );
        if let Some(method) = self.method {
            url.push_str(&format!("&method={}", method));
        }

        let response = self.client.get(&url).send().await.map_err(|e| {
            AssistantError::SearchFailed(format!("failed to reach news proxy: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .map(|e| e.error)
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(AssistantError::SearchFailed(format!(
                "news proxy returned {}: {}",
                status, message
            )));
        }

        let body = response.json::<SearchResponse>().await.map_err(|e| {
            AssistantError::SearchFailed(format!("failed to parse news proxy response: {}", e))
        })?;

        Ok(body.results)
    }
}

#[async_trait]
impl ContextSearch for NewsProxyClient {
    async fn search(&self, query: &str) -> Result<SearchDigest> {
        let results = self.fetch_sources(query).await?;
        Ok(digest_from_results(query, results))
    }
}
