//! Session orchestration.
//!
//! [`Assistant`] owns one session: the state behind a mutex, the AI client,
//! the context search and an optional history store. Operations are
//! single-flight: while one is running every other one fails with
//! [`AssistantError::Busy`] and leaves the state alone.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{info, warn};

use crate::config::{DEFAULT_INSTITUTION, DEFAULT_LANGUAGE};
use crate::context::{aggregate, analysis_prompt, ContextInputs};
use crate::error::{AssistantError, Result};
use crate::gemini::TextGenerator;
use crate::io::HistoryStore;
use crate::models::{ContentCategory, GeneratedContentItem};
use crate::news::ContextSearch;
use crate::pipeline::{history_context, system_instruction, GenerationTask};
use crate::session::{SessionEvent, SessionState};

const ANALYZING_MESSAGE: &str = "Analyzing and summarizing the context...";

pub struct Assistant {
    generator: Arc<dyn TextGenerator>,
    search: Arc<dyn ContextSearch>,
    store: Option<HistoryStore>,
    institution: String,
    language: String,
    system_instruction: String,
    state: Mutex<SessionState>,
}

impl Assistant {
    pub fn new(generator: Arc<dyn TextGenerator>, search: Arc<dyn ContextSearch>) -> Self {
        Self {
            generator,
            search,
            store: None,
            institution: DEFAULT_INSTITUTION.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            system_instruction: system_instruction(DEFAULT_INSTITUTION, DEFAULT_LANGUAGE),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn with_store(mut self, store: HistoryStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_institution(mut self, institution: impl Into<String>) -> Self {
        self.institution = institution.into();
        self.system_instruction = system_instruction(&self.institution, &self.language);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self.system_instruction = system_instruction(&self.institution, &self.language);
        self
    }

    /// Seed the history, e.g. from a resumed session file.
    pub fn with_history(self, history: Vec<GeneratedContentItem>) -> Self {
        *self.lock() = SessionState::with_history(history);
        self
    }

    pub fn snapshot(&self) -> SessionState {
        self.lock().clone()
    }

    pub fn history(&self) -> Vec<GeneratedContentItem> {
        self.lock().history.clone()
    }

    pub fn set_inputs(&self, inputs: ContextInputs) {
        self.update(SessionEvent::InputsChanged(inputs));
    }

    /// Aggregate the current inputs, analyze them and append the analysis.
    pub async fn process_context(&self) -> Result<GeneratedContentItem> {
        let message = {
            let state = self.lock();
            match state.inputs.search_query() {
                Some(query) => format!("Searching the web for: \"{}\"", query),
                None => ANALYZING_MESSAGE.to_string(),
            }
        };

        let (flight, snapshot) = self.begin(message)?;

        let result: Result<String> = async {
            let context = aggregate(&snapshot.inputs, self.search.as_ref()).await?;
            flight.progress(ANALYZING_MESSAGE);
            let prompt = analysis_prompt(&context);
            self.generator
                .generate_text(&prompt, Some(&self.system_instruction))
                .await
        }
        .await;

        flight.finish(result.map(|text| {
            GeneratedContentItem::new(ContentCategory::ContextAnalysis, text)
        }))
    }

    /// Run one follow-up task over the whole history.
    pub async fn generate(&self, task: GenerationTask) -> Result<GeneratedContentItem> {
        let (flight, snapshot) = self.begin(task.status_message().to_string())?;

        let result: Result<String> = async {
            let context = history_context(&snapshot.history)?;
            let prompt = task.prompt(&context, &self.institution);
            self.generator
                .generate_text(&prompt, Some(&self.system_instruction))
                .await
        }
        .await;

        flight.finish(result.map(|text| GeneratedContentItem::new(task.category(), text)))
    }

    pub async fn generate_press_note(&self) -> Result<GeneratedContentItem> {
        self.generate(GenerationTask::PressNote).await
    }

    pub async fn generate_news_summary(&self) -> Result<GeneratedContentItem> {
        self.generate(GenerationTask::NewsSummary).await
    }

    pub async fn generate_response_suggestions(&self) -> Result<GeneratedContentItem> {
        self.generate(GenerationTask::ResponseSuggestions).await
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update(&self, event: SessionEvent) {
        let mut guard = self.lock();
        let state = std::mem::take(&mut *guard);
        *guard = state.apply(event);
    }

    /// Mark the session as running, or refuse if something already is.
    fn begin(&self, message: String) -> Result<(Flight<'_>, SessionState)> {
        let mut guard = self.lock();
        if let Some(current) = guard.activity.message() {
            return Err(AssistantError::Busy(current.to_string()));
        }
        let state = std::mem::take(&mut *guard);
        *guard = state.apply(SessionEvent::Started(message));
        let snapshot = guard.clone();
        drop(guard);

        Ok((
            Flight {
                assistant: self,
                finished: false,
            },
            snapshot,
        ))
    }

    fn persist(&self, item: &GeneratedContentItem) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.append(item) {
            warn!(path = %store.path().display(), error = %e, "failed to persist history item");
            self.update(SessionEvent::PersistenceFailed(e.to_string()));
        }
    }
}

/// The running operation. Dropping it unfinished returns the session to idle.
struct Flight<'a> {
    assistant: &'a Assistant,
    finished: bool,
}

impl Flight<'_> {
    fn progress(&self, message: &str) {
        self.assistant
            .update(SessionEvent::Progress(message.to_string()));
    }

    fn finish(
        mut self,
        result: Result<GeneratedContentItem>,
    ) -> Result<GeneratedContentItem> {
        self.finished = true;
        match result {
            Ok(item) => {
                self.assistant
                    .update(SessionEvent::Completed(item.clone()));
                info!(category = %item.category, chars = item.content.len(), "content generated");
                self.assistant.persist(&item);
                Ok(item)
            }
            Err(e) => {
                warn!(error = %e, "operation failed");
                self.assistant.update(SessionEvent::Failed(e.to_string()));
                Err(e)
            }
        }
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.assistant.update(SessionEvent::Failed(
                "operation abandoned before completion".to_string(),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SearchDigest, SourceResult};
    use crate::session::Activity;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingGenerator {
        prompts: Mutex<Vec<String>>,
        instructions: Mutex<Vec<Option<String>>>,
        failures: Mutex<VecDeque<String>>,
    }

    impl RecordingGenerator {
        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }

        fn fail_next(&self, message: &str) {
            self.failures.lock().unwrap().push_back(message.to_string());
        }
    }

    #[async_trait]
    impl TextGenerator for RecordingGenerator {
        async fn generate_text(
            &self,
            prompt: &str,
            system_instruction: Option<&str>,
        ) -> Result<String> {
            let n = {
                let mut prompts = self.prompts.lock().unwrap();
                prompts.push(prompt.to_string());
                prompts.len()
            };
            self.instructions
                .lock()
                .unwrap()
                .push(system_instruction.map(str::to_string));
            if let Some(message) = self.failures.lock().unwrap().pop_front() {
                return Err(AssistantError::GenerationFailed(message));
            }
            Ok(format!("generated #{}", n))
        }
    }

    struct StubSearch {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ContextSearch for StubSearch {
        async fn search(&self, _query: &str) -> Result<SearchDigest> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AssistantError::GenerationFailed(
                    "simulated transport error".into(),
                ));
            }
            Ok(SearchDigest {
                summary: "Inflation eased.".to_string(),
                sources: vec![SourceResult {
                    title: "Report".to_string(),
                    link: "https://news.example/r".to_string(),
                    snippet: String::new(),
                    source: "news.example".to_string(),
                }],
                ai_generated: true,
            })
        }
    }

    fn assistant_with(
        search_fails: bool,
    ) -> (Assistant, Arc<RecordingGenerator>, Arc<StubSearch>) {
        let generator = Arc::new(RecordingGenerator::default());
        let search = Arc::new(StubSearch {
            calls: AtomicUsize::new(0),
            fail: search_fails,
        });
        let assistant = Assistant::new(generator.clone(), search.clone());
        (assistant, generator, search)
    }

    fn inputs(file: &str, pasted: &str, query: &str) -> ContextInputs {
        ContextInputs {
            file_text: Some(file.to_string()),
            pasted_text: Some(pasted.to_string()),
            search_query: Some(query.to_string()),
        }
    }

    #[tokio::test]
    async fn test_file_only_context_calls_generator_once() {
        let (assistant, generator, search) = assistant_with(false);
        assistant.set_inputs(inputs("Q1 GDP grew 2%.", "", ""));

        let item = assistant.process_context().await.unwrap();

        assert_eq!(item.category, ContentCategory::ContextAnalysis);
        assert_eq!(generator.calls(), 1);
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);

        let prompt = generator.last_prompt();
        assert!(prompt.ends_with("\n\nUploaded file content:\nQ1 GDP grew 2%."));
        assert!(!prompt.contains("External text to analyze:"));
        assert!(!prompt.contains("AI summary of the search"));

        let state = assistant.snapshot();
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.activity, Activity::Idle);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_system_instruction_names_institution() {
        let (assistant, generator, _) = assistant_with(false);
        let assistant = assistant.with_institution("Central Bank of Testland");
        assistant.set_inputs(inputs("text", "", ""));
        assistant.process_context().await.unwrap();

        let instructions = generator.instructions.lock().unwrap();
        let instruction = instructions[0].as_deref().unwrap();
        assert!(instruction.contains("Central Bank of Testland"));
        assert!(instruction.contains("Write every response in Spanish"));
    }

    #[tokio::test]
    async fn test_language_is_sent_with_every_request() {
        let (assistant, generator, _) = assistant_with(false);
        let assistant = assistant
            .with_language("Portuguese")
            .with_institution("Banco Central do Brasil");
        assistant.set_inputs(inputs("text", "", ""));
        assistant.process_context().await.unwrap();
        assistant.generate(GenerationTask::PressNote).await.unwrap();

        let instructions = generator.instructions.lock().unwrap();
        assert_eq!(instructions.len(), 2);
        for instruction in instructions.iter() {
            let instruction = instruction.as_deref().unwrap();
            assert!(instruction.contains("Write every response in Portuguese"));
            assert!(instruction.contains("Banco Central do Brasil"));
        }
    }

    #[tokio::test]
    async fn test_empty_inputs_fail_without_network_calls() {
        let (assistant, generator, search) = assistant_with(false);
        assistant.set_inputs(inputs("", "", ""));

        let err = assistant.process_context().await.unwrap_err();

        assert_eq!(err.kind(), crate::ErrorKind::Input);
        assert_eq!(generator.calls(), 0);
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);

        let state = assistant.snapshot();
        assert!(state.history.is_empty());
        assert_eq!(state.activity, Activity::Idle);
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn test_failed_search_aborts_context_run() {
        let (assistant, generator, search) = assistant_with(true);
        assistant.set_inputs(inputs("file text", "pasted text", "inflation"));

        let err = assistant.process_context().await.unwrap_err();

        assert_eq!(err.kind(), crate::ErrorKind::Upstream);
        assert_eq!(search.calls.load(Ordering::SeqCst), 1);
        assert_eq!(generator.calls(), 0);
        assert!(assistant.history().is_empty());
        assert!(assistant
            .snapshot()
            .error
            .unwrap()
            .contains("simulated transport error"));
    }

    #[tokio::test]
    async fn test_search_results_feed_analysis_prompt() {
        let (assistant, generator, _) = assistant_with(false);
        assistant.set_inputs(inputs("", "", "inflation"));

        assistant.process_context().await.unwrap();

        let prompt = generator.last_prompt();
        assert!(prompt.contains("AI summary of the search \"inflation\":\nInflation eased."));
        assert!(prompt.contains("Title: Report\nLink: https://news.example/r"));
    }

    #[tokio::test]
    async fn test_pipeline_requires_history() {
        let (assistant, generator, _) = assistant_with(false);

        for task in GenerationTask::ALL {
            let err = assistant.generate(task).await.unwrap_err();
            assert!(matches!(err, AssistantError::NoContextAvailable));
        }

        assert_eq!(generator.calls(), 0);
        assert!(assistant.history().is_empty());
    }

    #[tokio::test]
    async fn test_press_note_uses_prior_history() {
        let (assistant, generator, _) = assistant_with(false);
        let assistant = assistant.with_history(vec![GeneratedContentItem::new(
            ContentCategory::ContextAnalysis,
            "GDP rose.",
        )]);

        let item = assistant.generate_press_note().await.unwrap();

        assert_eq!(item.category, ContentCategory::PressNote);
        assert_eq!(generator.calls(), 1);
        assert!(generator.last_prompt().contains("GDP rose."));

        let history = assistant.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].category, ContentCategory::PressNote);
    }

    #[tokio::test]
    async fn test_history_grows_in_call_order() {
        let (assistant, generator, _) = assistant_with(false);
        assistant.set_inputs(inputs("", "Central bank holds rates.", ""));

        assistant.process_context().await.unwrap();
        assistant.generate_press_note().await.unwrap();
        assistant.generate_news_summary().await.unwrap();
        assistant.generate_response_suggestions().await.unwrap();
        assistant.generate_press_note().await.unwrap();

        let categories: Vec<_> = assistant.history().iter().map(|i| i.category).collect();
        assert_eq!(
            categories,
            vec![
                ContentCategory::ContextAnalysis,
                ContentCategory::PressNote,
                ContentCategory::NewsSummary,
                ContentCategory::ResponseSuggestions,
                ContentCategory::PressNote,
            ]
        );

        // The last call saw every earlier output, in order.
        let prompt = generator.last_prompt();
        let first = prompt.find("generated #1").unwrap();
        let fourth = prompt.find("generated #4").unwrap();
        assert!(first < fourth);
    }

    #[tokio::test]
    async fn test_generation_failure_leaves_history_untouched() {
        let (assistant, generator, _) = assistant_with(false);
        let assistant = assistant.with_history(vec![GeneratedContentItem::new(
            ContentCategory::ContextAnalysis,
            "GDP rose.",
        )]);
        generator.fail_next("503 unavailable");

        let err = assistant.generate_news_summary().await.unwrap_err();

        assert_eq!(err.kind(), crate::ErrorKind::Upstream);
        let state = assistant.snapshot();
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.activity, Activity::Idle);
        assert!(state.error.unwrap().contains("503 unavailable"));

        // The same action can simply be retried.
        assistant.generate_news_summary().await.unwrap();
        assert_eq!(assistant.history().len(), 2);
    }

    #[tokio::test]
    async fn test_second_operation_is_rejected_while_running() {
        let (assistant, generator, _) = assistant_with(false);
        let assistant = assistant.with_history(vec![GeneratedContentItem::new(
            ContentCategory::ContextAnalysis,
            "GDP rose.",
        )]);

        let (flight, _) = assistant.begin("Generating press note...".to_string()).unwrap();

        let err = assistant.generate_news_summary().await.unwrap_err();
        assert!(matches!(err, AssistantError::Busy(ref m) if m == "Generating press note..."));
        assert_eq!(generator.calls(), 0);
        assert_eq!(assistant.history().len(), 1);

        drop(flight);
        let state = assistant.snapshot();
        assert_eq!(state.activity, Activity::Idle);
        assert_eq!(
            state.error.as_deref(),
            Some("operation abandoned before completion")
        );

        assistant.generate_news_summary().await.unwrap();
        assert_eq!(assistant.history().len(), 2);
    }

    #[tokio::test]
    async fn test_items_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::at(dir.path().join("session.jsonl"));
        let (assistant, _, _) = assistant_with(false);
        let assistant = assistant.with_store(store.clone());
        assistant.set_inputs(inputs("text", "", ""));

        assistant.process_context().await.unwrap();
        assistant.generate_press_note().await.unwrap();

        let saved = crate::io::load_history(store.path()).unwrap();
        assert_eq!(saved, assistant.history());
    }

    #[tokio::test]
    async fn test_persistence_failure_is_only_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();

        let (assistant, _, _) = assistant_with(false);
        let assistant = assistant.with_store(HistoryStore::at(blocker.join("s.jsonl")));
        assistant.set_inputs(inputs("text", "", ""));

        let item = assistant.process_context().await.unwrap();

        let state = assistant.snapshot();
        assert_eq!(state.history, vec![item]);
        assert!(state.error.is_none());
        assert!(state.warning.is_some());
    }
}
