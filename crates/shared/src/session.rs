//! Session state and its transitions.
//!
//! Every change goes through [`SessionState::apply`], a pure
//! `(state, event) -> state` function, so the orchestration code in
//! [`crate::assistant`] only decides *which* event happens.

use crate::context::ContextInputs;
use crate::models::GeneratedContentItem;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Activity {
    #[default]
    Idle,
    Running {
        message: String,
    },
}

impl Activity {
    pub fn is_running(&self) -> bool {
        matches!(self, Activity::Running { .. })
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Activity::Idle => None,
            Activity::Running { message } => Some(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    InputsChanged(ContextInputs),
    Started(String),
    Progress(String),
    Completed(GeneratedContentItem),
    Failed(String),
    PersistenceFailed(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub inputs: ContextInputs,
    pub history: Vec<GeneratedContentItem>,
    pub activity: Activity,
    pub error: Option<String>,
    pub warning: Option<String>,
}

impl SessionState {
    pub fn with_history(history: Vec<GeneratedContentItem>) -> Self {
        Self {
            history,
            ..Self::default()
        }
    }

    pub fn apply(mut self, event: SessionEvent) -> Self {
        match event {
            SessionEvent::InputsChanged(inputs) => {
                self.inputs = inputs;
            }
            SessionEvent::Started(message) => {
                self.activity = Activity::Running { message };
                self.error = None;
                self.warning = None;
            }
            SessionEvent::Progress(message) => {
                if self.activity.is_running() {
                    self.activity = Activity::Running { message };
                }
            }
            SessionEvent::Completed(item) => {
                self.history.push(item);
                self.activity = Activity::Idle;
            }
            SessionEvent::Failed(message) => {
                self.error = Some(message);
                self.activity = Activity::Idle;
            }
            SessionEvent::PersistenceFailed(message) => {
                self.warning = Some(message);
            }
        }
        self
    }

    /// History newest first, the order it is shown to the user.
    pub fn history_for_display(&self) -> impl Iterator<Item = &GeneratedContentItem> {
        self.history.iter().rev()
    }
}
