//! Task-level error taxonomy

use super::protocol::RpcError;
use super::types::TaskState;
use thiserror::Error;

/// Errors raised by a task executor before or instead of a lifecycle event.
///
/// Capability failures are not in here: they become `failed` events.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// Malformed request, rejected before any task exists
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Operation the endpoint refuses to perform (cancellation)
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task {task_id} cannot move from {from} to {to}")]
    InvalidTransition {
        task_id: String,
        from: TaskState,
        to: TaskState,
    },
}

impl TaskError {
    pub fn to_rpc_error(&self) -> RpcError {
        match self {
            TaskError::InvalidParams(msg) => RpcError::invalid_params(msg.clone()),
            TaskError::UnsupportedOperation(msg) => RpcError::unsupported_operation(msg.clone()),
            TaskError::TaskNotFound(id) => RpcError::task_not_found(id),
            TaskError::InvalidTransition { .. } => RpcError::internal_error(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::protocol::{INVALID_PARAMS, TASK_NOT_FOUND, UNSUPPORTED_OPERATION};

    #[test]
    fn test_rpc_codes() {
        assert_eq!(
            TaskError::InvalidParams("x".into()).to_rpc_error().code,
            INVALID_PARAMS
        );
        assert_eq!(
            TaskError::UnsupportedOperation("cancel".into()).to_rpc_error().code,
            UNSUPPORTED_OPERATION
        );
        assert_eq!(
            TaskError::TaskNotFound("t1".into()).to_rpc_error().code,
            TASK_NOT_FOUND
        );
    }
}
