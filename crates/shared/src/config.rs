use std::env;

use crate::error::{AssistantError, Result};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GOOGLE_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";
pub const DEFAULT_INSTITUTION: &str = "Banco Central de Venezuela";
pub const DEFAULT_LANGUAGE: &str = "Spanish";
pub const DEFAULT_PER_FEED_LIMIT: usize = 3;
pub const DEFAULT_PROXY_BIND: &str = "127.0.0.1:3000";

pub const DEFAULT_FEEDS: &[&str] = &[
    "https://www.ultimasnoticias.com.ve/feed/",
    "https://www.eluniversal.com/feed/",
    "https://efectococuyo.com/feed/",
    "https://www.bancaynegocios.com/feed/",
    "https://www.bcv.org.ve/rss",
];

/// Credentials for the Google Programmable Search API.
#[derive(Debug, Clone)]
pub struct GoogleSearchCredentials {
    pub engine_id: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub google_search: Option<GoogleSearchCredentials>,
    pub google_search_url: String,
    pub feeds: Vec<String>,
    pub per_feed_limit: usize,
    pub news_proxy_url: Option<String>,
    pub institution: String,
    /// Language every generated text is written in.
    pub language: String,
    pub proxy_bind: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let google_search = match (non_empty("GOOGLE_CSE_ID"), non_empty("GOOGLE_API_KEY")) {
            (Some(engine_id), Some(api_key)) => Some(GoogleSearchCredentials { engine_id, api_key }),
            _ => None,
        };

        let feeds = match non_empty("NEWS_FEEDS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            None => DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect(),
        };

        let per_feed_limit = match non_empty("NEWS_PER_FEED_LIMIT") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                AssistantError::configuration(format!(
                    "NEWS_PER_FEED_LIMIT must be a positive integer, got {:?}",
                    raw
                ))
            })?,
            None => DEFAULT_PER_FEED_LIMIT,
        };

        Ok(Self {
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            gemini_model: non_empty("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.into()),
            gemini_base_url: non_empty("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.into()),
            google_search,
            google_search_url: non_empty("GOOGLE_SEARCH_URL")
                .unwrap_or_else(|| DEFAULT_GOOGLE_SEARCH_URL.into()),
            feeds,
            per_feed_limit,
            news_proxy_url: non_empty("NEWS_PROXY_URL"),
            institution: non_empty("ASSISTANT_INSTITUTION")
                .unwrap_or_else(|| DEFAULT_INSTITUTION.into()),
            language: non_empty("ASSISTANT_LANGUAGE").unwrap_or_else(|| DEFAULT_LANGUAGE.into()),
            proxy_bind: non_empty("NEWS_PROXY_BIND").unwrap_or_else(|| DEFAULT_PROXY_BIND.into()),
        })
    }

    /// The Gemini key, or a configuration error explaining how to set it.
    pub fn require_gemini_key(&self) -> Result<&str> {
        self.gemini_api_key.as_deref().ok_or_else(|| {
            AssistantError::configuration(
                "GEMINI_API_KEY not found.\n\n\
                To fix this, create ~/.config/content-assistant/.env with:\n  \
                GEMINI_API_KEY=your_key_here\n\n\
                Get a Gemini API key from: https://aistudio.google.com/app/apikey",
            )
        })
    }

    fn try_load_dotenv() {
        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/content-assistant/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("content-assistant").join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }

        // If none found, that's okay - environment variables might be set system-wide
    }
}
