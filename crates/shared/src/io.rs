use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::warn;

use crate::error::{AssistantError, Result};
use crate::models::GeneratedContentItem;

/// Get the default directory for storing session files
pub fn get_default_sessions_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .ok_or_else(|| AssistantError::Persistence("could not determine local data directory".into()))?
        .join("content-assistant")
        .join("sessions");

    fs::create_dir_all(&data_dir).map_err(|e| {
        AssistantError::Persistence(format!("failed to create sessions directory: {}", e))
    })?;

    Ok(data_dir)
}

/// Append-only JSON Lines file holding one session's history.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Store for a file at an explicit path; used to resume a session.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Fresh session file in the default sessions directory.
    pub fn new_session() -> Result<Self> {
        let dir = get_default_sessions_dir()?;
        let filename = format!("session-{}.jsonl", Utc::now().format("%Y%m%d-%H%M%S"));
        Ok(Self::at(dir.join(filename)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, item: &GeneratedContentItem) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AssistantError::Persistence(format!(
                    "failed to create {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let line = serde_json::to_string(item)
            .map_err(|e| AssistantError::Persistence(format!("failed to serialize item: {}", e)))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                AssistantError::Persistence(format!(
                    "failed to open {}: {}",
                    self.path.display(),
                    e
                ))
            })?;

        writeln!(file, "{}", line).map_err(|e| {
            AssistantError::Persistence(format!("failed to write {}: {}", self.path.display(), e))
        })
    }
}

/// Load a session's history from a JSON Lines file
pub fn load_history(path: &Path) -> Result<Vec<GeneratedContentItem>> {
    if !path.exists() {
        return Err(AssistantError::Persistence(format!(
            "session file not found: {}",
            path.display()
        )));
    }

    let content = fs::read_to_string(path).map_err(|e| {
        AssistantError::Persistence(format!("failed to read {}: {}", path.display(), e))
    })?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| {
                AssistantError::Persistence(format!(
                    "{} line {} is not a valid history item ({}). The file may be corrupted.",
                    path.display(),
                    index + 1,
                    e
                ))
            })
        })
        .collect()
}

/// List session files in `dir` with their history, newest first
pub fn list_sessions(dir: &Path) -> Result<Vec<(PathBuf, Vec<GeneratedContentItem>)>> {
    let mut sessions = Vec::new();

    if !dir.exists() {
        return Ok(sessions);
    }

    let entries = fs::read_dir(dir).map_err(|e| {
        AssistantError::Persistence(format!("failed to read {}: {}", dir.display(), e))
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("jsonl") {
            continue;
        }
        match load_history(&path) {
            Ok(items) if !items.is_empty() => sessions.push((path, items)),
            Ok(_) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "skipping session file"),
        }
    }

    // Sort by most recent item (newest first)
    sessions.sort_by(|a, b| {
        let time_a = a.1.last().map(|i| i.created_at);
        let time_b = b.1.last().map(|i| i.created_at);
        time_b.cmp(&time_a)
    });

    Ok(sessions)
}
