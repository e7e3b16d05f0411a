//! Agent-to-agent task protocol
//!
//! Shared contract between the remote task endpoints and the invocation
//! client: agent cards served at a well-known path, JSON-RPC task requests,
//! and the `submitted → working → completed | failed` lifecycle.

pub mod errors;
pub mod protocol;
pub mod types;

pub use errors::TaskError;
pub use protocol::{A2aMethod, RpcError, RpcRequest, RpcResponse};
pub use types::{
    AgentCapabilities, AgentCard, AgentSkill, Artifact, Task, TaskEvent, TaskIdParams,
    TaskRequest, TaskState, TaskStatusUpdate, TaskUpdate, ValidatedRequest, AGENT_CARD_PATH,
    TEXT_CONTENT_TYPES,
};
