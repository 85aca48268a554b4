use futures::stream::{self, StreamExt};
use reqwest::Client;
use scraper::Html;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AssistantError, Result};
use crate::models::{hostname_of, SourceResult};

const FEED_CONCURRENCY: usize = 5;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<FeedEntry>,
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    /// `<content:encoded>`; the deserializer matches local names.
    #[serde(rename = "encoded")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    // Required by Atom; keeps arbitrary XML from passing as an empty feed.
    #[allow(dead_code)]
    title: AtomText,
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
}

/// Atom text constructs carry a `type` attribute next to their text.
#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

impl From<AtomEntry> for FeedEntry {
    fn from(entry: AtomEntry) -> Self {
        let link = entry
            .links
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| entry.links.first())
            .and_then(|l| l.href.clone());

        FeedEntry {
            title: entry.title.map(|t| t.value),
            link,
            description: entry.summary.map(|t| t.value),
            content: entry.content.map(|t| t.value),
        }
    }
}

/// Entries of an RSS 2.0 or Atom document.
fn parse_feed(xml: &str) -> std::result::Result<Vec<FeedEntry>, quick_xml::de::DeError> {
    match quick_xml::de::from_str::<Rss>(xml) {
        Ok(rss) => Ok(rss.channel.items),
        Err(rss_err) => match quick_xml::de::from_str::<AtomFeed>(xml) {
            Ok(atom) => Ok(atom.entries.into_iter().map(FeedEntry::from).collect()),
            Err(_) => Err(rss_err),
        },
    }
}

/// Reduce an HTML fragment to single-spaced plain text.
fn plain_text(fragment: &str) -> String {
    let html = Html::parse_fragment(fragment);
    let text: String = html.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fans a keyword query out over a fixed list of RSS feeds.
pub struct FeedAggregator {
    client: Client,
    feeds: Vec<String>,
    per_feed_limit: usize,
}

impl FeedAggregator {
    pub fn new(feeds: Vec<String>, per_feed_limit: usize) -> Result<Self> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (compatible; ContentAssistant/1.0)")
            .build()
            .map_err(|e| {
                AssistantError::configuration(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            feeds,
            per_feed_limit,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.feeds.clone(), config.per_feed_limit)
    }

    /// Matching entries from every feed that could be read, in feed order.
    ///
    /// A feed that cannot be fetched or parsed is logged and skipped; this
    /// never fails as a whole.
    pub async fn fetch_sources(&self, query: &str) -> Vec<SourceResult> {
        let needle = query.trim().to_lowercase();

        let per_feed: Vec<Vec<SourceResult>> = stream::iter(self.feeds.iter().cloned())
            .map(|feed_url| {
                let needle = needle.clone();
                async move {
                    match self.fetch_feed(&feed_url, &needle).await {
                        Ok(matches) => {
                            debug!(feed = %feed_url, matches = matches.len(), "feed searched");
                            matches
                        }
                        Err(e) => {
                            warn!(feed = %feed_url, error = %e, "skipping feed");
                            Vec::new()
                        }
                    }
                }
            })
            .buffered(FEED_CONCURRENCY)
            .collect()
            .await;

        per_feed.into_iter().flatten().collect()
    }

    async fn fetch_feed(&self, feed_url: &str, needle: &str) -> Result<Vec<SourceResult>> {
        let response = self
            .client
            .get(feed_url)
            .send()
            .await
            .map_err(|e| AssistantError::SearchFailed(format!("failed to fetch feed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssistantError::SearchFailed(format!(
                "feed returned HTTP {}",
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AssistantError::SearchFailed(format!("failed to read feed: {}", e)))?;

        let entries = parse_feed(&body)
            .map_err(|e| AssistantError::SearchFailed(format!("failed to parse feed: {}", e)))?;

        let source = hostname_of(feed_url);
        Ok(select_matches(entries, needle, self.per_feed_limit, &source))
    }
}

fn select_matches(
    entries: Vec<FeedEntry>,
    needle: &str,
    limit: usize,
    source: &str,
) -> Vec<SourceResult> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let title = entry.title.map(|t| plain_text(&t)).filter(|t| !t.is_empty());
            let description = entry
                .description
                .map(|d| plain_text(&d))
                .filter(|d| !d.is_empty());
            let content = entry
                .content
                .map(|c| plain_text(&c))
                .filter(|c| !c.is_empty());

            let contains = |text: &Option<String>| {
                text.as_deref()
                    .is_some_and(|t| t.to_lowercase().contains(needle))
            };
            if !(contains(&title) || contains(&description) || contains(&content)) {
                return None;
            }
            let snippet = description.or(content);

            Some(SourceResult {
                title: title.unwrap_or_else(|| "Untitled".to_string()),
                link: entry
                    .link
                    .map(|l| l.trim().to_string())
                    .filter(|l| !l.is_empty())
                    .unwrap_or_else(|| "#".to_string()),
                snippet: snippet.unwrap_or_else(|| "No summary available.".to_string()),
                source: source.to_string(),
            })
        })
        .take(limit)
        .collect()
}
