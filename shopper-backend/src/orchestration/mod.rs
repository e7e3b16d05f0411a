//! Orchestration graph: sequential stages and parallel groups of agents
//!
//! Each stage's successful outputs are merged with the user query and fed
//! forward as the next stage's input.

pub mod graph;
pub mod identity;
pub mod invoker;
pub mod runner;

pub use graph::{AgentRef, GraphBuilder, GraphError, OrchestrationGraph, Stage};
pub use identity::AgentIdentity;
pub use invoker::{AgentInvoker, LocalAgent, RemoteAgent};
pub use runner::{compose_stage_input, DelegateEvent, OrchestrationEvent, Orchestrator, StageOutput};
