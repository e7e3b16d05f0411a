//! Explicit per-process and per-run state passed to the pipeline

use crate::client::A2aClient;
use crate::orchestration::{AgentIdentity, AgentRef, GraphError, RemoteAgent};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Shared handles the orchestrator needs to reach agents
#[derive(Clone)]
pub struct OrchestrationContext {
    client: Arc<A2aClient>,
}

impl OrchestrationContext {
    pub fn new(client: Arc<A2aClient>) -> Self {
        Self { client }
    }

    /// Reference to an agent reached through its card URL
    pub fn remote_agent(
        &self,
        identity: &str,
        description: &str,
        card_url: &str,
    ) -> Result<AgentRef, GraphError> {
        Ok(AgentRef::new(
            AgentIdentity::new(identity)?,
            description,
            Arc::new(RemoteAgent::new(card_url, self.client.clone())),
        ))
    }
}

/// One top-level query travelling through the graph
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    /// Shared by every task the run creates
    pub context_id: String,
    pub query: String,
    pub started_at: DateTime<Utc>,
}

impl RunContext {
    /// Start a run; without a session id the run gets its own context.
    pub fn new(query: impl Into<String>, session_id: Option<&str>) -> Self {
        let run_id = Uuid::new_v4().to_string();
        let context_id = session_id
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| run_id.clone());
        Self {
            run_id,
            context_id,
            query: query.into(),
            started_at: Utc::now(),
        }
    }
}
