use crate::a2a::{TaskEvent, TaskRequest};
use crate::client::A2aClient;
use crate::executor::TaskExecutor;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// How the graph reaches one agent.
///
/// An implementation sends the agent's lifecycle events into `events` in
/// emission order, ending with a single terminal event. Dropping `events`
/// before a terminal event is treated as a failure by the caller.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn invoke(&self, context_id: &str, input: &str, events: mpsc::UnboundedSender<TaskEvent>);
}

/// Agent behind a remote task endpoint
pub struct RemoteAgent {
    card_url: String,
    client: Arc<A2aClient>,
}

impl RemoteAgent {
    pub fn new(card_url: impl Into<String>, client: Arc<A2aClient>) -> Self {
        Self {
            card_url: card_url.into(),
            client,
        }
    }
}

#[async_trait]
impl AgentInvoker for RemoteAgent {
    async fn invoke(
        &self,
        context_id: &str,
        input: &str,
        events: mpsc::UnboundedSender<TaskEvent>,
    ) {
        self.client
            .stream(&self.card_url, input, context_id, &events)
            .await;
    }
}

/// Agent running in-process behind its own executor
pub struct LocalAgent {
    executor: Arc<TaskExecutor>,
}

impl LocalAgent {
    pub fn new(executor: Arc<TaskExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl AgentInvoker for LocalAgent {
    async fn invoke(
        &self,
        context_id: &str,
        input: &str,
        events: mpsc::UnboundedSender<TaskEvent>,
    ) {
        let request = TaskRequest::new(input, Uuid::new_v4().to_string(), context_id);
        let admitted = match self.executor.admit(&request) {
            Ok(admitted) => admitted,
            Err(e) => {
                let _ = events.send(TaskEvent::failed(format!("Error: {}", e)));
                return;
            }
        };

        let (queue, mut updates) = mpsc::unbounded_channel();
        let run = self.executor.run(admitted, queue);
        let forward = async {
            while let Some(update) = updates.recv().await {
                let _ = events.send(update.event);
            }
        };

        let (outcome, ()) = tokio::join!(run, forward);
        if let Err(e) = outcome {
            log::warn!("[ORCHESTRATOR] {} run ended early: {}", self.executor.name(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::TaskState;
    use crate::capabilities::ScriptedCapability;

    #[tokio::test]
    async fn test_local_agent_forwards_lifecycle() {
        let executor = Arc::new(TaskExecutor::new(
            "e_commerce_personal_shopper",
            Arc::new(ScriptedCapability::answering("Buy the F54")),
        ));
        let agent = LocalAgent::new(executor);
        let (tx, mut rx) = mpsc::unbounded_channel();
        agent.invoke("ctx", "compare", tx).await;

        let mut states = Vec::new();
        while let Some(event) = rx.recv().await {
            states.push(event.state());
        }
        assert_eq!(
            states,
            vec![TaskState::Submitted, TaskState::Working, TaskState::Completed]
        );
    }

    #[tokio::test]
    async fn test_local_agent_blank_input_fails() {
        let executor = Arc::new(TaskExecutor::new(
            "synth",
            Arc::new(ScriptedCapability::answering("x")),
        ));
        let (tx, mut rx) = mpsc::unbounded_channel();
        LocalAgent::new(executor).invoke("ctx", "  ", tx).await;
        assert!(matches!(rx.recv().await, Some(TaskEvent::Failed { .. })));
    }
}
