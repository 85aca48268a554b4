use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What produced a history item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    ContextAnalysis,
    PressNote,
    NewsSummary,
    ResponseSuggestions,
}

impl ContentCategory {
    /// Human label used in prompts, listings and export titles.
    pub fn label(&self) -> &'static str {
        match self {
            ContentCategory::ContextAnalysis => "General Context Analysis",
            ContentCategory::PressNote => "Press Note Draft",
            ContentCategory::NewsSummary => "News Summary",
            ContentCategory::ResponseSuggestions => "Response Suggestions",
        }
    }
}

impl std::fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One AI output kept in the session history. Never edited after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContentItem {
    pub category: ContentCategory,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl GeneratedContentItem {
    pub fn new(category: ContentCategory, content: impl Into<String>) -> Self {
        Self {
            category,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// A single search hit or feed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub source: String,
}

/// Synthesized text plus the sources it was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchDigest {
    pub summary: String,
    pub sources: Vec<SourceResult>,
    /// Set when a model wrote `summary`; a plain result listing leaves it unset.
    pub ai_generated: bool,
}

/// Hostname of `link`, or an empty string when it does not parse.
pub fn hostname_of(link: &str) -> String {
    url::Url::parse(link)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}
