//! Prompt templates for the follow-up generation steps.

use crate::error::{AssistantError, Result};
use crate::models::{ContentCategory, GeneratedContentItem};

pub const CONTEXT_DIVIDER: &str = "\n\n---\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationTask {
    PressNote,
    NewsSummary,
    ResponseSuggestions,
}

impl GenerationTask {
    pub const ALL: [GenerationTask; 3] = [
        GenerationTask::PressNote,
        GenerationTask::NewsSummary,
        GenerationTask::ResponseSuggestions,
    ];

    pub fn category(self) -> ContentCategory {
        match self {
            GenerationTask::PressNote => ContentCategory::PressNote,
            GenerationTask::NewsSummary => ContentCategory::NewsSummary,
            GenerationTask::ResponseSuggestions => ContentCategory::ResponseSuggestions,
        }
    }

    pub fn status_message(self) -> &'static str {
        match self {
            GenerationTask::PressNote => "Generating press note...",
            GenerationTask::NewsSummary => "Generating news summary...",
            GenerationTask::ResponseSuggestions => "Generating response suggestions...",
        }
    }

    pub fn prompt(self, context: &str, institution: &str) -> String {
        match self {
            GenerationTask::PressNote => format!(
                "Draft an official Press Note for the {}, based on the following context. \
                 The draft must be formal, objective, and aligned with institutional \
                 communication:\n\n{}",
                institution, context
            ),
            GenerationTask::NewsSummary => format!(
                "Write a concise and objective news summary from the following context. \
                 Focus on verifiable facts and institutional actions:\n\n{}",
                context
            ),
            GenerationTask::ResponseSuggestions => format!(
                "Provide key points and message lines for addressing sensitive topics in \
                 public communications, based on the following context. The suggestions \
                 must be institutional, neutral and constructive, formatted as a list:\n\n{}",
                context
            ),
        }
    }
}

/// Every history item, oldest first, labelled and joined by a divider.
pub fn history_context(history: &[GeneratedContentItem]) -> Result<String> {
    if history.is_empty() {
        return Err(AssistantError::NoContextAvailable);
    }

    Ok(history
        .iter()
        .map(|item| format!("Previous context ({}):\n{}", item.category.label(), item.content))
        .collect::<Vec<_>>()
        .join(CONTEXT_DIVIDER))
}

/// Role and tone constraints sent with every generation request.
pub fn system_instruction(institution: &str, language: &str) -> String {
    format!(
        "You are a communications assistant for the {}. Write every response in {}, in a \
         formal, neutral and institutional register. Do not speculate beyond the supplied \
         context and do not invent figures or quotations.",
        institution, language
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(category: ContentCategory, content: &str) -> GeneratedContentItem {
        GeneratedContentItem::new(category, content)
    }

    #[test]
    fn test_empty_history_has_no_context() {
        assert!(matches!(
            history_context(&[]),
            Err(AssistantError::NoContextAvailable)
        ));
    }

    #[test]
    fn test_history_context_is_chronological_and_labelled() {
        let history = vec![
            item(ContentCategory::ContextAnalysis, "GDP rose."),
            item(ContentCategory::PressNote, "The Bank announces..."),
        ];
        let context = history_context(&history).unwrap();
        assert_eq!(
            context,
            "Previous context (General Context Analysis):\nGDP rose.\n\n---\n\n\
             Previous context (Press Note Draft):\nThe Bank announces..."
        );
    }

    #[test]
    fn test_each_task_prompt_embeds_context() {
        for task in GenerationTask::ALL {
            let prompt = task.prompt("CONTEXT-BLOCK", "Banco Central de Venezuela");
            assert!(prompt.ends_with("\n\nCONTEXT-BLOCK"), "{:?}", task);
        }
    }

    #[test]
    fn test_task_prompts_are_distinct() {
        let prompts: std::collections::HashSet<String> = GenerationTask::ALL
            .iter()
            .map(|t| t.prompt("ctx", "Bank"))
            .collect();
        assert_eq!(prompts.len(), 3);
        assert!(GenerationTask::PressNote
            .prompt("ctx", "Central Bank of Testland")
            .contains("Central Bank of Testland"));
    }

    #[test]
    fn test_system_instruction_sets_response_language() {
        let instruction = system_instruction("Banco Central de Venezuela", "Spanish");
        assert!(instruction.contains("Banco Central de Venezuela"));
        assert!(instruction.contains("Write every response in Spanish"));
    }

    #[test]
    fn test_task_categories() {
        assert_eq!(GenerationTask::PressNote.category(), ContentCategory::PressNote);
        assert_eq!(GenerationTask::NewsSummary.category(), ContentCategory::NewsSummary);
        assert_eq!(
            GenerationTask::ResponseSuggestions.category(),
            ContentCategory::ResponseSuggestions
        );
    }
}
