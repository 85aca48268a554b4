use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{Config, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
use crate::error::{AssistantError, Result};
use crate::models::{hostname_of, SearchDigest, SourceResult};
use crate::news::ContextSearch;

/// Anything that turns a prompt into plain text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(&self, prompt: &str, system_instruction: Option<&str>)
        -> Result<String>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Tool {
    google_search: GoogleSearchTool,
}

#[derive(Serialize)]
struct GoogleSearchTool {}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingChunk {
    web: Option<WebReference>,
    retrieved_context: Option<WebReference>,
}

#[derive(Debug, Deserialize)]
struct WebReference {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
}

/// Outcome of one generateContent call, before it becomes a `Result`.
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    Success {
        text: String,
        sources: Vec<SourceResult>,
    },
    Failure {
        message: String,
    },
}

impl Generation {
    fn from_response(response: GenerateContentResponse) -> Self {
        if let Some(message) = response.error.and_then(|e| e.message) {
            return Generation::Failure { message };
        }

        let Some(candidate) = response.candidates.into_iter().next() else {
            return Generation::Failure {
                message: "response contained no candidates".to_string(),
            };
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            let message = match candidate.finish_reason {
                Some(reason) => format!("response contained no text (finish reason: {})", reason),
                None => "response contained no text".to_string(),
            };
            return Generation::Failure { message };
        }

        // Citations are optional; anything malformed is simply dropped.
        let sources = candidate
            .grounding_metadata
            .map(|m| {
                m.grounding_chunks
                    .into_iter()
                    .filter_map(|chunk| chunk.web.or(chunk.retrieved_context))
                    .filter_map(citation_to_source)
                    .collect()
            })
            .unwrap_or_default();

        Generation::Success { text, sources }
    }

    pub fn into_result(self) -> Result<(String, Vec<SourceResult>)> {
        match self {
            Generation::Success { text, sources } => Ok((text, sources)),
            Generation::Failure { message } => Err(AssistantError::GenerationFailed(message)),
        }
    }
}

fn citation_to_source(reference: WebReference) -> Option<SourceResult> {
    let uri = reference.uri.filter(|u| !u.is_empty())?;
    let title = reference.title.filter(|t| !t.is_empty());
    let snippet = format!(
        "Information retrieved from {}",
        title.as_deref().unwrap_or(&uri)
    );
    let title = title.unwrap_or_else(|| "Untitled source".to_string());
    Some(SourceResult {
        snippet,
        source: hostname_of(&uri),
        title,
        link: uri,
    })
}

/// Truncate to at most `max` bytes, respecting UTF-8 boundaries.
fn preview(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder().build().map_err(|e| {
            AssistantError::configuration(format!("failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.require_gemini_key()?)?
            .with_model(&config.gemini_model)
            .with_base_url(&config.gemini_base_url))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Plain completion, optionally steered by a system instruction.
    pub async fn generate_text(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
    ) -> Result<String> {
        debug!(prompt = %preview(prompt, 100), "generating text");
        if let Some(instruction) = system_instruction {
            debug!(%instruction, "with system instruction");
        }

        let request = GenerateContentRequest {
            contents: vec![user_content(prompt)],
            system_instruction: system_instruction.map(|text| Content {
                role: None,
                parts: vec![Part { text }],
            }),
            tools: Vec::new(),
        };

        let (text, _) = self.send(&request).await.into_result()?;
        debug!("text generation response received");
        Ok(text)
    }

    /// Web-grounded answer plus the sources the model cited.
    pub async fn search_and_summarize(&self, query: &str) -> Result<SearchDigest> {
        debug!(%query, "grounded search");

        let request = GenerateContentRequest {
            contents: vec![user_content(query)],
            system_instruction: None,
            tools: vec![Tool {
                google_search: GoogleSearchTool {},
            }],
        };

        let (summary, sources) = self.send(&request).await.into_result()?;
        debug!(sources = sources.len(), "grounded search response received");
        Ok(SearchDigest {
            summary,
            sources,
            ai_generated: true,
        })
    }

    async fn send(&self, request: &GenerateContentRequest<'_>) -> Generation {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response = match self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return Generation::Failure {
                    message: format!("failed to reach Gemini API: {}", e),
                }
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Generation::Failure {
                    message: format!("failed to read Gemini response: {}", e),
                }
            }
        };

        let parsed = serde_json::from_str::<GenerateContentResponse>(&body);

        if !status.is_success() {
            let message = parsed
                .ok()
                .and_then(|r| r.error)
                .and_then(|e| e.message)
                .unwrap_or(body);
            return Generation::Failure {
                message: format!("Gemini API error ({}): {}", status, message),
            };
        }

        match parsed {
            Ok(parsed) => Generation::from_response(parsed),
            Err(e) => Generation::Failure {
                message: format!("failed to parse Gemini response: {}", e),
            },
        }
    }
}

fn user_content(text: &str) -> Content<'_> {
    Content {
        role: Some("user"),
        parts: vec![Part { text }],
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate_text(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
    ) -> Result<String> {
        GeminiClient::generate_text(self, prompt, system_instruction).await
    }
}

#[async_trait]
impl ContextSearch for GeminiClient {
    async fn search(&self, query: &str) -> Result<SearchDigest> {
        self.search_and_summarize(query).await
    }
}
