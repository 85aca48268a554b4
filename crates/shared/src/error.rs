//! Error type shared by every content-assistant operation.
//!
//! Binaries wrap these in `anyhow` for reporting; the proxy maps them onto
//! HTTP status codes.

/// Broad classes used to decide how an error is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed credentials/settings. Blocks the feature.
    Configuration,
    /// The user supplied nothing usable. Recoverable by fixing input.
    Input,
    /// The AI or search upstream failed. Recoverable by retrying.
    Upstream,
    /// Another operation is already running in this session.
    Conflict,
    /// Local persistence or export failed.
    Storage,
}

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("please provide at least one context source (file, pasted text or search query)")]
    MissingInput,

    #[error("process some context first before generating content")]
    NoContextAvailable,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("generation failed: {0}")]
    GenerationFailed(String),

    #[error("search failed: {0}")]
    SearchFailed(String),

    #[error("another operation is already running: {0}")]
    Busy(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("export error: {0}")]
    Export(String),
}

pub type Result<T> = std::result::Result<T, AssistantError>;

impl AssistantError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::MissingInput | Self::NoContextAvailable | Self::InvalidInput(_) => {
                ErrorKind::Input
            }
            Self::GenerationFailed(_) | Self::SearchFailed(_) => ErrorKind::Upstream,
            Self::Busy(_) => ErrorKind::Conflict,
            Self::Persistence(_) | Self::Export(_) => ErrorKind::Storage,
        }
    }
}
