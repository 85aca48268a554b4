use anyhow::{Context, Result};
use chrono::Local;
use clap::{ArgAction, Parser, ValueEnum};
use shared::{
    list_sessions, load_history, Assistant, Config, ContextInputs, ContextSearch,
    DocumentExporter, GeminiClient, GeneratedContentItem, GenerationTask, HistoryStore,
    NewsAdapter, NewsProxyClient, SearchMethod,
};
use std::io::{self as stdio, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SearchBackend {
    /// Gemini with Google Search grounding
    Grounded,
    /// Google Custom Search API, called directly
    Google,
    /// Configured RSS feeds, called directly
    Rss,
    /// A running news-proxy (NEWS_PROXY_URL)
    Proxy,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Task {
    PressNote,
    NewsSummary,
    Suggestions,
}

impl From<Task> for GenerationTask {
    fn from(task: Task) -> Self {
        match task {
            Task::PressNote => GenerationTask::PressNote,
            Task::NewsSummary => GenerationTask::NewsSummary,
            Task::Suggestions => GenerationTask::ResponseSuggestions,
        }
    }
}

#[derive(Parser)]
#[command(name = "content-assistant")]
#[command(about = "Turn files, pasted text and news searches into institutional communications drafts")]
struct Args {
    /// Text file to use as context
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Pasted text to use as context
    #[arg(short, long)]
    text: Option<String>,

    /// Web/news search query to use as context
    #[arg(short, long)]
    query: Option<String>,

    /// Backend used for the search query
    #[arg(long, value_enum, default_value = "grounded")]
    search: SearchBackend,

    /// Generate content without the interactive menu (repeatable, runs in order)
    #[arg(short, long, value_enum)]
    generate: Vec<Task>,

    /// Directory for exported documents (default: your Documents folder)
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Continue a saved session file
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Do not save the session history
    #[arg(long)]
    no_save: bool,

    /// List saved sessions and exit
    #[arg(long)]
    sessions: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(stdio::stderr)
        .init();
}

fn build_search(
    backend: SearchBackend,
    config: &Config,
    gemini: &Arc<GeminiClient>,
) -> Result<Arc<dyn ContextSearch>> {
    let search: Arc<dyn ContextSearch> = match backend {
        SearchBackend::Grounded => gemini.clone(),
        SearchBackend::Google => {
            let adapter = NewsAdapter::from_config(config)?;
            if !adapter.google_enabled() {
                anyhow::bail!(
                    "--search google needs GOOGLE_CSE_ID and GOOGLE_API_KEY to be set"
                );
            }
            Arc::new(adapter.with_default_method(SearchMethod::Google))
        }
        SearchBackend::Rss => {
            Arc::new(NewsAdapter::from_config(config)?.with_default_method(SearchMethod::Rss))
        }
        SearchBackend::Proxy => {
            let url = config
                .news_proxy_url
                .as_deref()
                .context("--search proxy needs NEWS_PROXY_URL to be set")?;
            Arc::new(NewsProxyClient::new(url)?)
        }
    };
    Ok(search)
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    stdio::stdout().flush()?;

    let mut input = String::new();
    stdio::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn print_item(item: &GeneratedContentItem) {
    println!(
        "\n── {} ({}) ──",
        item.category.label(),
        item.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );
    println!("{}", item.content);
}

fn report_warning(assistant: &Assistant) {
    if let Some(warning) = assistant.snapshot().warning {
        println!("⚠ History not saved: {}", warning);
    }
}

async fn run_task(assistant: &Assistant, task: GenerationTask) -> Result<GeneratedContentItem> {
    println!("\n🤖 {}", task.status_message());
    let item = assistant.generate(task).await?;
    print_item(&item);
    report_warning(assistant);
    Ok(item)
}

fn export_dir(args: &Args) -> PathBuf {
    args.export_dir
        .clone()
        .or_else(dirs::document_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn export_item(item: &GeneratedContentItem, dir: &Path, print_view: bool) -> Result<PathBuf> {
    let title = item.category.label();
    let date = Local::now().date_naive();
    let path = if print_view {
        DocumentExporter::save_print_view(&item.content, title, dir, date)?
    } else {
        DocumentExporter::save_document(&item.content, title, dir, date)?
    };
    Ok(path)
}

/// Read the optional file and bundle it with the other inputs.
fn read_inputs(
    file: Option<&Path>,
    text: Option<String>,
    query: Option<String>,
) -> Result<ContextInputs> {
    let file_text = match file {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        None => None,
    };
    Ok(ContextInputs {
        file_text,
        pasted_text: text,
        search_query: query,
    })
}

async fn analyze(assistant: &Assistant, inputs: ContextInputs) -> Result<()> {
    if let Some(query) = inputs.search_query() {
        println!("\n🔎 Searching the web for: \"{}\"", query);
    }
    println!("\n🤖 Analyzing and summarizing the context...");
    assistant.set_inputs(inputs);
    let item = assistant.process_context().await?;
    print_item(&item);
    report_warning(assistant);
    Ok(())
}

fn prompt_inputs() -> Result<ContextInputs> {
    let optional = |answer: String| (!answer.is_empty()).then_some(answer);

    let file = optional(prompt_line("File to analyze (blank to skip): ")?);
    let text = optional(prompt_line("Text to analyze (blank to skip): ")?);
    let query = optional(prompt_line("Search query (blank to skip): ")?);
    read_inputs(file.as_deref().map(Path::new), text, query)
}

fn choose_item(assistant: &Assistant) -> Result<Option<GeneratedContentItem>> {
    let state = assistant.snapshot();
    if state.history.is_empty() {
        println!("Nothing generated yet.");
        return Ok(None);
    }

    let shown: Vec<&GeneratedContentItem> = state.history_for_display().collect();
    for (i, item) in shown.iter().enumerate() {
        let first_line = item.content.lines().next().unwrap_or("");
        println!("  {}) {} - {}", i + 1, item.category.label(), first_line);
    }

    let choice = prompt_line(&format!("\nWhich item (1-{}): ", shown.len()))?;
    match choice.parse::<usize>() {
        Ok(n) if (1..=shown.len()).contains(&n) => Ok(Some(shown[n - 1].clone())),
        _ => {
            println!("Invalid selection.");
            Ok(None)
        }
    }
}

async fn interactive(assistant: &Assistant, dir: &Path) -> Result<()> {
    loop {
        println!("\nWhat next?");
        println!("  1) Process new context");
        println!("  2) Generate press note");
        println!("  3) Generate news summary");
        println!("  4) Generate response suggestions");
        println!("  5) Show history");
        println!("  6) Export an item as a document");
        println!("  7) Save a print view of an item");
        println!("  8) Quit");

        let choice = prompt_line("\nEnter your choice (1-8): ")?;
        let task = match choice.as_str() {
            "2" => Some(GenerationTask::PressNote),
            "3" => Some(GenerationTask::NewsSummary),
            "4" => Some(GenerationTask::ResponseSuggestions),
            _ => None,
        };

        if let Some(task) = task {
            if let Err(e) = run_task(assistant, task).await {
                println!("✗ {}", e);
            }
            continue;
        }

        match choice.as_str() {
            "1" => {
                let result = match prompt_inputs() {
                    Ok(inputs) => analyze(assistant, inputs).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = result {
                    println!("✗ {:#}", e);
                }
            }
            "5" => {
                let state = assistant.snapshot();
                if state.history.is_empty() {
                    println!("Nothing generated yet.");
                }
                for item in state.history_for_display() {
                    print_item(item);
                }
            }
            "6" | "7" => {
                if let Some(item) = choose_item(assistant)? {
                    match export_item(&item, dir, choice == "7") {
                        Ok(path) => println!("✓ Saved to: {}", path.display()),
                        Err(e) => println!("✗ {}", e),
                    }
                }
            }
            "8" | "q" | "" => return Ok(()),
            _ => println!("Invalid selection. Please choose 1-8."),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    let config = Config::from_env()?;

    if args.sessions {
        let dir = shared::get_default_sessions_dir()?;
        let sessions = list_sessions(&dir)?;
        if sessions.is_empty() {
            println!("No saved sessions in {}", dir.display());
        }
        for (path, items) in sessions {
            println!("{} ({} items)", path.display(), items.len());
        }
        return Ok(());
    }

    let gemini = Arc::new(GeminiClient::from_config(&config)?);
    let search = build_search(args.search, &config, &gemini)?;

    let (history, store) = match &args.resume {
        Some(path) => {
            let history = load_history(path).context("Failed to resume session")?;
            println!("✓ Resumed {} items from {}", history.len(), path.display());
            (history, Some(HistoryStore::at(path)))
        }
        None => (Vec::new(), None),
    };
    let store = match (store, args.no_save) {
        (_, true) => None,
        (Some(store), false) => Some(store),
        (None, false) => Some(HistoryStore::new_session()?),
    };

    let mut assistant = Assistant::new(gemini, search)
        .with_language(&config.language)
        .with_institution(&config.institution)
        .with_history(history);
    if let Some(store) = store {
        println!("✓ Session history: {}", store.path().display());
        assistant = assistant.with_store(store);
    }

    let inputs = read_inputs(args.file.as_deref(), args.text.clone(), args.query.clone())?;

    // A resumed session can go straight to generation.
    if !inputs.is_empty() || assistant.history().is_empty() {
        analyze(&assistant, inputs)
            .await
            .context("Failed to process context")?;
    }

    let dir = export_dir(&args);

    if args.generate.is_empty() {
        return interactive(&assistant, &dir).await;
    }

    for task in &args.generate {
        let item = run_task(&assistant, (*task).into()).await?;
        if args.export_dir.is_some() {
            let path = export_item(&item, &dir, false)?;
            println!("✓ Saved to: {}", path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_read_inputs_loads_file_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "Reservas internacionales al alza.").unwrap();

        let inputs = read_inputs(Some(&path), None, Some("reservas".to_string())).unwrap();

        assert_eq!(
            inputs.file_text.as_deref(),
            Some("Reservas internacionales al alza.")
        );
        assert!(inputs.pasted_text.is_none());
        assert_eq!(inputs.search_query(), Some("reservas"));
    }

    #[test]
    fn test_read_inputs_reports_unreadable_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.txt");

        let err = read_inputs(Some(&missing), Some("text".to_string()), None).unwrap_err();

        assert!(err.to_string().contains("missing.txt"));
    }

    #[test]
    fn test_read_inputs_without_file() {
        let inputs = read_inputs(None, Some("pasted".to_string()), None).unwrap();
        assert!(inputs.file_text.is_none());
        assert!(!inputs.is_empty());
    }
}
