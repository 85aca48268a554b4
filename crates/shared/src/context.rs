//! Context aggregation: merges the user's inputs into one block of text and
//! wraps it in the analysis prompt.

use serde::{Deserialize, Serialize};

use crate::error::{AssistantError, Result};
use crate::models::SearchDigest;
use crate::news::ContextSearch;

pub const FILE_HEADER: &str = "Uploaded file content:";
pub const PASTED_HEADER: &str = "External text to analyze:";
pub const SOURCES_HEADER: &str = "Sources found:";

/// Raw inputs for one context run. Blank strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextInputs {
    pub file_text: Option<String>,
    pub pasted_text: Option<String>,
    pub search_query: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl ContextInputs {
    pub fn file_text(&self) -> Option<&str> {
        present(&self.file_text)
    }

    pub fn pasted_text(&self) -> Option<&str> {
        present(&self.pasted_text)
    }

    pub fn search_query(&self) -> Option<&str> {
        present(&self.search_query).map(str::trim)
    }

    pub fn is_empty(&self) -> bool {
        self.file_text().is_none() && self.pasted_text().is_none() && self.search_query().is_none()
    }
}

/// Build the composite context block: file, then pasted text, then search.
///
/// The search collaborator is only called when a query is present; if it
/// fails the whole aggregation fails.
pub async fn aggregate(inputs: &ContextInputs, search: &dyn ContextSearch) -> Result<String> {
    if inputs.is_empty() {
        return Err(AssistantError::MissingInput);
    }

    let mut sections = Vec::new();

    if let Some(text) = inputs.file_text() {
        sections.push(format!("{}\n{}", FILE_HEADER, text));
    }
    if let Some(text) = inputs.pasted_text() {
        sections.push(format!("{}\n{}", PASTED_HEADER, text));
    }
    if let Some(query) = inputs.search_query() {
        let digest = search.search(query).await?;
        sections.push(search_section(query, &digest));
    }

    Ok(sections.join("\n\n"))
}

pub fn search_header(query: &str, ai_generated: bool) -> String {
    if ai_generated {
        format!("AI summary of the search \"{}\":", query)
    } else {
        format!("Search results for \"{}\":", query)
    }
}

pub fn search_section(query: &str, digest: &SearchDigest) -> String {
    let header = search_header(query, digest.ai_generated);
    let mut section = format!("{}\n{}", header, digest.summary.trim_end());

    if !digest.sources.is_empty() {
        section.push_str("\n\n");
        section.push_str(SOURCES_HEADER);
        for source in &digest.sources {
            section.push_str(&format!("\nTitle: {}\nLink: {}\n", source.title, source.link));
        }
        // Drop the blank line after the last source
        section.truncate(section.trim_end().len());
    }

    section
}

pub fn analysis_prompt(context: &str) -> String {
    format!(
        "Analyze and summarize the following content, extracting the key points relevant to \
         an institutional economic and financial context. Be concise and objective:\n\n{}",
        context
    )
}
