use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::{Config, GoogleSearchCredentials};
use crate::error::{AssistantError, Result};
use crate::models::{hostname_of, SourceResult};

#[derive(Debug, Deserialize)]
struct SearchItem {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CustomSearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
    error: Option<CustomSearchError>,
}

#[derive(Debug, Deserialize)]
struct CustomSearchError {
    message: Option<String>,
}

/// Client for the Google Programmable Search (Custom Search JSON) API.
pub struct GoogleSearchClient {
    client: Client,
    base_url: String,
    credentials: GoogleSearchCredentials,
    num: u8,
    language: String,
}

impl GoogleSearchClient {
    pub fn new(credentials: GoogleSearchCredentials, base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().build().map_err(|e| {
            AssistantError::configuration(format!("failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            credentials,
            num: 5,
            language: "lang_es".to_string(),
        })
    }

    /// `None` when the engine id or API key is not configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        config
            .google_search
            .clone()
            .map(|creds| Self::new(creds, config.google_search_url.clone()))
            .transpose()
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SourceResult>> {
        let url = format!(
            "{}?q={}&cx={}&key={}&num={}&lr={}",
            self.base_url,
            urlencoding::encode(query),
            urlencoding::encode(&self.credentials.engine_id),
            urlencoding::encode(&self.credentials.api_key),
            self.num,
            self.language
        );

        debug!(%query, "google custom search");

        let response = self.client.get(&url).send().await.map_err(|e| {
            AssistantError::SearchFailed(format!("failed to reach Google Custom Search: {}", e))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AssistantError::SearchFailed(format!("failed to read search response: {}", e))
        })?;

        let parsed = serde_json::from_str::<CustomSearchResponse>(&body);

        if let Ok(CustomSearchResponse {
            error: Some(error), ..
        }) = &parsed
        {
            return Err(AssistantError::SearchFailed(format!(
                "Google Custom Search API error: {}",
                error.message.as_deref().unwrap_or("unknown")
            )));
        }

        if !status.is_success() {
            return Err(AssistantError::SearchFailed(format!(
                "Google Custom Search returned {}: {}",
                status, body
            )));
        }

        let parsed = parsed.map_err(|e| {
            AssistantError::SearchFailed(format!("failed to parse search response: {}", e))
        })?;

        Ok(parsed
            .items
            .into_iter()
            .filter_map(|item| {
                let link = item.link?;
                Some(SourceResult {
                    title: item.title.unwrap_or_else(|| "Untitled".to_string()),
                    source: hostname_of(&link),
                    snippet: item.snippet.unwrap_or_default(),
                    link,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GoogleSearchClient {
        GoogleSearchClient::new(
            GoogleSearchCredentials {
                engine_id: "engine".to_string(),
                api_key: "secret".to_string(),
            },
            format!("{}/customsearch/v1", server.uri()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_search_maps_items() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .and(query_param("q", "tasa de cambio"))
            .and(query_param("cx", "engine"))
            .and(query_param("key", "secret"))
            .and(query_param("num", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    { "title": "Rate update", "link": "https://www.bcv.org.ve/x", "snippet": "The rate..." },
                    { "title": "No link" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let results = client_for(&server).search("tasa de cambio").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Rate update");
        assert_eq!(results[0].source, "www.bcv.org.ve");
        assert_eq!(results[0].snippet, "The rate...");
    }

    #[tokio::test]
    async fn test_no_items_is_empty_not_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "kind": "customsearch#search" })))
            .mount(&server)
            .await;

        assert!(client_for(&server).search("q").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_api_error_is_search_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": { "code": 403, "message": "API key not valid" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).search("q").await.unwrap_err();
        assert!(matches!(err, AssistantError::SearchFailed(_)));
        assert!(err.to_string().contains("API key not valid"));
    }
}
