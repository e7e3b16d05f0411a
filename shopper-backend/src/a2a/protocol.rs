use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};

pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
pub const TASK_NOT_FOUND: i32 = -32001;
pub const UNSUPPORTED_OPERATION: i32 = -32004;

/// Methods a remote task endpoint answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
pub enum A2aMethod {
    /// Run a task and return the final snapshot
    #[strum(serialize = "message/send")]
    Send,
    /// Run a task and stream status updates as server-sent events
    #[strum(serialize = "message/stream")]
    Stream,
    #[strum(serialize = "tasks/get")]
    GetTask,
    #[strum(serialize = "tasks/cancel")]
    CancelTask,
}

fn default_version() -> String {
    JSONRPC_VERSION.to_string()
}

/// JSON-RPC request from client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl RpcRequest {
    pub fn new(id: impl Into<Value>, method: A2aMethod, params: Value) -> Self {
        Self {
            jsonrpc: default_version(),
            id: id.into(),
            method: method.to_string(),
            params,
        }
    }
}

/// JSON-RPC response to client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(PARSE_ERROR, "Parse error")
    }

    pub fn invalid_request() -> Self {
        Self::new(INVALID_REQUEST, "Invalid request")
    }

    pub fn method_not_found() -> Self {
        Self::new(METHOD_NOT_FOUND, "Method not found")
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, message)
    }

    pub fn task_not_found(task_id: &str) -> Self {
        Self::new(TASK_NOT_FOUND, format!("Task not found: {}", task_id))
    }

    pub fn unsupported_operation(message: impl Into<String>) -> Self {
        Self::new(UNSUPPORTED_OPERATION, message)
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_method_names() {
        assert_eq!(A2aMethod::from_str("message/send").unwrap(), A2aMethod::Send);
        assert_eq!(A2aMethod::from_str("message/stream").unwrap(), A2aMethod::Stream);
        assert_eq!(A2aMethod::CancelTask.to_string(), "tasks/cancel");
        assert!(A2aMethod::from_str("tasks/resubscribe").is_err());
    }

    #[test]
    fn test_error_response_omits_result() {
        let resp = RpcResponse::error(Value::from(7), RpcError::method_not_found());
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["error"]["code"], METHOD_NOT_FOUND);
        assert!(json.get("result").is_none());
    }

    #[test]
    fn test_request_defaults_version() {
        let req: RpcRequest =
            serde_json::from_str(r#"{"id": "1", "method": "tasks/get"}"#).unwrap();
        assert_eq!(req.jsonrpc, "2.0");
        assert!(req.params.is_null());
    }
}
