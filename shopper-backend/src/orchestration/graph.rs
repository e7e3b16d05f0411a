use super::{AgentIdentity, AgentInvoker};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("agent identity must not be empty")]
    EmptyIdentity,

    #[error("graph has no stages")]
    EmptyGraph,

    #[error("parallel group at stage {stage} has no members")]
    EmptyGroup { stage: usize },

    #[error("agent {0} appears more than once")]
    DuplicateAgent(String),

    #[error("agents {first} and {second} share the label \"{label}\"")]
    LabelCollision {
        label: String,
        first: String,
        second: String,
    },
}

/// One agent as seen by the graph
#[derive(Clone)]
pub struct AgentRef {
    pub identity: AgentIdentity,
    pub description: String,
    pub invoker: Arc<dyn AgentInvoker>,
}

impl AgentRef {
    pub fn new(
        identity: AgentIdentity,
        description: impl Into<String>,
        invoker: Arc<dyn AgentInvoker>,
    ) -> Self {
        Self {
            identity,
            description: description.into(),
            invoker,
        }
    }
}

impl fmt::Debug for AgentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentRef")
            .field("identity", &self.identity)
            .field("description", &self.description)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum Stage {
    Single(AgentRef),
    /// Members run concurrently; the stage ends when all have finished
    Parallel(Vec<AgentRef>),
}

impl Stage {
    pub fn members(&self) -> &[AgentRef] {
        match self {
            Stage::Single(agent) => std::slice::from_ref(agent),
            Stage::Parallel(agents) => agents,
        }
    }
}

/// Ordered, immutable sequence of stages
#[derive(Debug, Clone)]
pub struct OrchestrationGraph {
    name: String,
    stages: Vec<Stage>,
}

impl OrchestrationGraph {
    pub fn builder(name: impl Into<String>) -> GraphBuilder {
        GraphBuilder {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Total number of agents across all stages
    pub fn agent_count(&self) -> usize {
        self.stages.iter().map(|s| s.members().len()).sum()
    }

    pub fn identities(&self) -> Vec<AgentIdentity> {
        self.stages
            .iter()
            .flat_map(|s| s.members().iter().map(|a| a.identity.clone()))
            .collect()
    }
}

pub struct GraphBuilder {
    name: String,
    stages: Vec<Stage>,
}

impl GraphBuilder {
    pub fn then(mut self, agent: AgentRef) -> Self {
        self.stages.push(Stage::Single(agent));
        self
    }

    pub fn parallel(mut self, agents: Vec<AgentRef>) -> Self {
        self.stages.push(Stage::Parallel(agents));
        self
    }

    /// Validate and freeze the graph.
    ///
    /// Identities must be unique and map to distinct labels, since the
    /// delegation record is addressed by label.
    pub fn build(self) -> Result<OrchestrationGraph, GraphError> {
        if self.stages.is_empty() {
            return Err(GraphError::EmptyGraph);
        }

        let mut labels: HashMap<String, AgentIdentity> = HashMap::new();
        for (index, stage) in self.stages.iter().enumerate() {
            if stage.members().is_empty() {
                return Err(GraphError::EmptyGroup { stage: index });
            }
            for agent in stage.members() {
                let label = agent.identity.label();
                if let Some(first) = labels.get(&label) {
                    if *first == agent.identity {
                        return Err(GraphError::DuplicateAgent(agent.identity.to_string()));
                    }
                    return Err(GraphError::LabelCollision {
                        label,
                        first: first.to_string(),
                        second: agent.identity.to_string(),
                    });
                }
                labels.insert(label, agent.identity.clone());
            }
        }

        Ok(OrchestrationGraph {
            name: self.name,
            stages: self.stages,
        })
    }
}
