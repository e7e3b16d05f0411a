//! Pluggable per-agent logic behind each task executor
//!
//! A capability answers a single free-form query. It either returns the
//! answer in one call or streams progress chunks followed by a final one.

pub mod llm;
pub mod scripted;

pub use llm::LlmCapability;
pub use scripted::ScriptedCapability;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Query handed to a capability
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityRequest {
    pub query: String,
    /// Conversation the query belongs to
    pub context_id: String,
}

impl CapabilityRequest {
    pub fn new(query: impl Into<String>, context_id: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            context_id: context_id.into(),
        }
    }
}

/// One item of a streamed answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityChunk {
    pub is_final: bool,
    pub text: String,
}

impl CapabilityChunk {
    pub fn progress(text: impl Into<String>) -> Self {
        Self {
            is_final: false,
            text: text.into(),
        }
    }

    pub fn final_answer(text: impl Into<String>) -> Self {
        Self {
            is_final: true,
            text: text.into(),
        }
    }
}

/// Receiving side is owned by the executor
pub type ChunkSink = mpsc::UnboundedSender<CapabilityChunk>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("request failed: {0}")]
    Http(String),

    #[error("provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("provider returned an empty response")]
    EmptyResponse,

    #[error("{0}")]
    Failed(String),
}

impl From<reqwest::Error> for CapabilityError {
    fn from(err: reqwest::Error) -> Self {
        CapabilityError::Http(err.to_string())
    }
}

#[async_trait]
pub trait Capability: Send + Sync {
    /// Message emitted with the first `working` event
    fn processing_message(&self) -> String {
        "Processing request...".to_string()
    }

    async fn answer(&self, request: &CapabilityRequest) -> Result<String, CapabilityError>;

    /// Stream chunks into `chunks`; the last one sent should be final.
    async fn stream(
        &self,
        request: &CapabilityRequest,
        chunks: &ChunkSink,
    ) -> Result<(), CapabilityError> {
        let text = self.answer(request).await?;
        // The executor holds the receiver for as long as the call runs.
        let _ = chunks.send(CapabilityChunk::final_answer(text));
        Ok(())
    }
}
