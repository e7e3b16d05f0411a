//! Agent-to-agent wire and lifecycle types

use super::errors::TaskError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Well-known path every remote task endpoint publishes its card at
pub const AGENT_CARD_PATH: &str = "/.well-known/agent-card.json";

/// Content types the shopper agents accept and produce
pub const TEXT_CONTENT_TYPES: &[&str] = &["text", "text/plain"];

/// Capability flags advertised in an agent card
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCapabilities {
    #[serde(default)]
    pub streaming: bool,
}

/// One skill advertised by an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}

/// Static descriptor served at [`AGENT_CARD_PATH`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    /// Address task requests are POSTed to
    pub url: String,
    pub version: String,
    #[serde(default)]
    pub default_input_modes: Vec<String>,
    #[serde(default)]
    pub default_output_modes: Vec<String>,
    #[serde(default)]
    pub capabilities: AgentCapabilities,
    #[serde(default)]
    pub skills: Vec<AgentSkill>,
}

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskState {
    Submitted,
    Working,
    Completed,
    Failed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }

    /// `working` may repeat; nothing leaves a terminal state.
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        match (self, next) {
            (TaskState::Submitted, TaskState::Submitted) => false,
            (TaskState::Submitted, _) => true,
            (TaskState::Working, TaskState::Submitted) => false,
            (TaskState::Working, _) => true,
            (TaskState::Completed | TaskState::Failed, _) => false,
        }
    }
}

/// A unit of text output attached to a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub artifact_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub text: String,
}

impl Artifact {
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            artifact_id: Uuid::new_v4().to_string(),
            name: Some(name.into()),
            text: text.into(),
        }
    }
}

/// Typed lifecycle event emitted by a task executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    Submitted,
    Working { message: String },
    Completed { artifact: Artifact },
    Failed { error: String },
}

impl TaskEvent {
    pub fn working(message: impl Into<String>) -> Self {
        TaskEvent::Working {
            message: message.into(),
        }
    }

    pub fn completed(task_id: &str, text: impl Into<String>) -> Self {
        TaskEvent::Completed {
            artifact: Artifact::text(format!("output_{}", task_id), text),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        TaskEvent::Failed {
            error: error.into(),
        }
    }

    pub fn state(&self) -> TaskState {
        match self {
            TaskEvent::Submitted => TaskState::Submitted,
            TaskEvent::Working { .. } => TaskState::Working,
            TaskEvent::Completed { .. } => TaskState::Completed,
            TaskEvent::Failed { .. } => TaskState::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// Text carried by the event, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            TaskEvent::Submitted => None,
            TaskEvent::Working { message } => Some(message),
            TaskEvent::Completed { artifact } => Some(&artifact.text),
            TaskEvent::Failed { error } => Some(error),
        }
    }
}

/// Task request parameters as received on the wire.
///
/// Every field is optional here so that malformed requests can be rejected
/// with a precise message by [`TaskRequest::validate`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
}

impl TaskRequest {
    pub fn new(
        query_text: impl Into<String>,
        task_id: impl Into<String>,
        context_id: impl Into<String>,
    ) -> Self {
        Self {
            query_text: Some(query_text.into()),
            task_id: Some(task_id.into()),
            context_id: Some(context_id.into()),
        }
    }

    pub fn validate(&self) -> Result<ValidatedRequest, TaskError> {
        let task_id = non_blank(&self.task_id)
            .ok_or_else(|| TaskError::InvalidParams("request must have a task_id".to_string()))?;
        let context_id = non_blank(&self.context_id).ok_or_else(|| {
            TaskError::InvalidParams("request must have a context_id".to_string())
        })?;
        let query = non_blank(&self.query_text)
            .ok_or_else(|| TaskError::InvalidParams("request must have a message".to_string()))?;

        Ok(ValidatedRequest {
            query: query.to_string(),
            task_id: task_id.to_string(),
            context_id: context_id.to_string(),
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// A task request that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub query: String,
    pub task_id: String,
    pub context_id: String,
}

/// Parameters for `tasks/get` and `tasks/cancel`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskIdParams {
    #[serde(default)]
    pub task_id: Option<String>,
}

/// Snapshot of one task as held by an executor's store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub context_id: String,
    pub state: TaskState,
    /// Progress messages received while working
    #[serde(default)]
    pub messages: Vec<String>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(id: impl Into<String>, context_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            context_id: context_id.into(),
            state: TaskState::Submitted,
            messages: Vec::new(),
            artifacts: Vec::new(),
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn invalid_transition(&self, to: TaskState) -> TaskError {
        TaskError::InvalidTransition {
            task_id: self.id.clone(),
            from: self.state,
            to,
        }
    }

    /// Apply a lifecycle event, rejecting illegal transitions.
    ///
    /// A task is created in the `submitted` state, so a `Submitted` event is
    /// never valid here.
    pub fn apply(&mut self, event: &TaskEvent) -> Result<(), TaskError> {
        let next = event.state();
        if !self.state.can_transition_to(next) {
            return Err(self.invalid_transition(next));
        }

        match event {
            TaskEvent::Submitted => return Err(self.invalid_transition(next)),
            TaskEvent::Working { message } => self.messages.push(message.clone()),
            TaskEvent::Completed { artifact } => self.artifacts.push(artifact.clone()),
            TaskEvent::Failed { error } => {
                self.artifacts.push(Artifact::text("error", error.clone()));
                self.error = Some(error.clone());
            }
        }
        self.state = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Text of the last artifact, which is the answer for completed tasks
    pub fn result_text(&self) -> Option<&str> {
        self.artifacts.last().map(|a| a.text.as_str())
    }
}

/// Status update as streamed on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatusUpdate {
    pub task_id: String,
    pub context_id: String,
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
    #[serde(rename = "final", default)]
    pub is_final: bool,
}

impl TaskStatusUpdate {
    pub fn from_event(task_id: &str, context_id: &str, event: &TaskEvent) -> Self {
        let (message, artifacts) = match event {
            TaskEvent::Submitted => (None, Vec::new()),
            TaskEvent::Working { message } => (Some(message.clone()), Vec::new()),
            TaskEvent::Completed { artifact } => (None, vec![artifact.clone()]),
            TaskEvent::Failed { error } => (
                Some(error.clone()),
                vec![Artifact::text("error", error.clone())],
            ),
        };
        Self {
            task_id: task_id.to_string(),
            context_id: context_id.to_string(),
            state: event.state(),
            message,
            artifacts,
            is_final: event.is_terminal(),
        }
    }

    /// Rebuild the typed event from a wire update
    pub fn into_event(self) -> TaskEvent {
        match self.state {
            TaskState::Submitted => TaskEvent::Submitted,
            TaskState::Working => TaskEvent::Working {
                message: self.message.unwrap_or_default(),
            },
            TaskState::Completed => match self.artifacts.into_iter().last() {
                Some(artifact) => TaskEvent::Completed { artifact },
                None => TaskEvent::Completed {
                    artifact: Artifact::text(
                        format!("output_{}", self.task_id),
                        self.message.unwrap_or_default(),
                    ),
                },
            },
            TaskState::Failed => TaskEvent::Failed {
                error: self
                    .message
                    .or_else(|| self.artifacts.into_iter().last().map(|a| a.text))
                    .unwrap_or_else(|| "Error: task failed".to_string()),
            },
        }
    }
}

/// An event on an executor's queue, addressed to one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskUpdate {
    pub task_id: String,
    pub context_id: String,
    pub event: TaskEvent,
}

impl TaskUpdate {
    pub fn to_wire(&self) -> TaskStatusUpdate {
        TaskStatusUpdate::from_event(&self.task_id, &self.context_id, &self.event)
    }
}
