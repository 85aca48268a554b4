// Public modules
pub mod assistant;
pub mod config;
pub mod context;
pub mod error;
pub mod export;
pub mod feeds;
pub mod gemini;
pub mod google_search;
pub mod io;
pub mod models;
pub mod news;
pub mod pipeline;
pub mod session;

// Re-export commonly used types
pub use assistant::Assistant;
pub use config::{Config, GoogleSearchCredentials};
pub use context::ContextInputs;
pub use error::{AssistantError, ErrorKind, Result};
pub use export::DocumentExporter;
pub use feeds::FeedAggregator;
pub use gemini::{GeminiClient, TextGenerator};
pub use google_search::GoogleSearchClient;
pub use io::{get_default_sessions_dir, list_sessions, load_history, HistoryStore};
pub use models::{ContentCategory, GeneratedContentItem, SearchDigest, SourceResult};
pub use news::{ContextSearch, ErrorResponse, NewsAdapter, NewsProxyClient, SearchMethod, SearchResponse};
pub use pipeline::GenerationTask;
pub use session::{Activity, SessionEvent, SessionState};
