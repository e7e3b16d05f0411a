use super::{Capability, CapabilityChunk, CapabilityError, CapabilityRequest, ChunkSink};
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    /// Answer with a prefix followed by the query itself
    Echo(String),
    Fail(String),
}

/// Canned capability for offline runs of the pipeline.
///
/// Emits its progress messages, waits for the configured delay, then answers
/// with fixed text, echoes the query, or fails.
#[derive(Debug, Clone)]
pub struct ScriptedCapability {
    processing_message: String,
    progress: Vec<String>,
    delay: Duration,
    reply: Reply,
}

impl ScriptedCapability {
    fn with_reply(reply: Reply) -> Self {
        Self {
            processing_message: "Processing request...".to_string(),
            progress: Vec::new(),
            delay: Duration::ZERO,
            reply,
        }
    }

    pub fn answering(text: impl Into<String>) -> Self {
        Self::with_reply(Reply::Text(text.into()))
    }

    pub fn echoing(prefix: impl Into<String>) -> Self {
        Self::with_reply(Reply::Echo(prefix.into()))
    }

    pub fn failing(error: impl Into<String>) -> Self {
        Self::with_reply(Reply::Fail(error.into()))
    }

    pub fn with_processing_message(mut self, message: impl Into<String>) -> Self {
        self.processing_message = message.into();
        self
    }

    pub fn with_progress(mut self, messages: &[&str]) -> Self {
        self.progress = messages.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Capability for ScriptedCapability {
    fn processing_message(&self) -> String {
        self.processing_message.clone()
    }

    async fn answer(&self, request: &CapabilityRequest) -> Result<String, CapabilityError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Echo(prefix) => Ok(format!("{}{}", prefix, request.query)),
            Reply::Fail(error) => Err(CapabilityError::Failed(error.clone())),
        }
    }

    async fn stream(
        &self,
        request: &CapabilityRequest,
        chunks: &ChunkSink,
    ) -> Result<(), CapabilityError> {
        for message in &self.progress {
            let _ = chunks.send(CapabilityChunk::progress(message.clone()));
        }
        let text = self.answer(request).await?;
        let _ = chunks.send(CapabilityChunk::final_answer(text));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_stream_sends_progress_then_final() {
        let cap = ScriptedCapability::answering("Galaxy F54").with_progress(&["Searching..."]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        cap.stream(&CapabilityRequest::new("phones", "ctx"), &tx)
            .await
            .unwrap();
        drop(tx);

        assert_eq!(rx.recv().await, Some(CapabilityChunk::progress("Searching...")));
        assert_eq!(rx.recv().await, Some(CapabilityChunk::final_answer("Galaxy F54")));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_echo_and_fail() {
        let req = CapabilityRequest::new("F54 vs M34", "ctx");
        let echo = ScriptedCapability::echoing("Summary: ");
        assert_eq!(echo.answer(&req).await.unwrap(), "Summary: F54 vs M34");

        let fail = ScriptedCapability::failing("boom");
        assert_eq!(
            fail.answer(&req).await,
            Err(CapabilityError::Failed("boom".to_string()))
        );
    }
}
