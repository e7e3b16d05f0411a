use super::{Capability, CapabilityError, CapabilityRequest};
use crate::config::LlmSettings;
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Capability backed by an OpenAI-compatible chat completions endpoint
/// (Ollama, vLLM, OpenAI).
#[derive(Clone)]
pub struct LlmCapability {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    instruction: String,
    processing_message: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl LlmCapability {
    pub fn new(
        settings: &LlmSettings,
        instruction: impl Into<String>,
        processing_message: impl Into<String>,
    ) -> Result<Self, CapabilityError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            instruction: instruction.into(),
            processing_message: processing_message.into(),
        })
    }

    fn build_request(&self, query: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: self.instruction.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: query.to_string(),
                },
            ],
            temperature: 0.0,
            stream: false,
        }
    }
}

/// Pull the answer text out of a completion body
fn extract_content(body: &str) -> Result<String, CapabilityError> {
    let response: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| CapabilityError::Failed(format!("Failed to parse completion: {}", e)))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(CapabilityError::EmptyResponse)
}

/// Best-effort error message from a non-2xx body
fn extract_error(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(500).collect())
}

#[async_trait]
impl Capability for LlmCapability {
    fn processing_message(&self) -> String {
        self.processing_message.clone()
    }

    async fn answer(&self, request: &CapabilityRequest) -> Result<String, CapabilityError> {
        log::debug!(
            "[LLM] Sending query to {} (model={}, context={})",
            self.endpoint,
            self.model,
            request.context_id
        );

        let mut http = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&self.build_request(&request.query));
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            http = http.header(header::AUTHORIZATION, format!("Bearer {}", key));
        }

        let response = http.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            log::warn!("[LLM] {} returned {}", self.endpoint, status);
            return Err(CapabilityError::Provider {
                status: status.as_u16(),
                message: extract_error(&body),
            });
        }

        extract_content(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> LlmSettings {
        LlmSettings {
            endpoint: "http://localhost:11434/v1/chat/completions".to_string(),
            model: "llama3.1-cpu-custom".to_string(),
            api_key: None,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_build_request_puts_instruction_first() {
        let cap = LlmCapability::new(&settings(), "Fetch product names", "Working...").unwrap();
        let req = cap.build_request("Galaxy F54");
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, "system");
        assert_eq!(req.messages[0].content, "Fetch product names");
        assert_eq!(req.messages[1].content, "Galaxy F54");
        assert_eq!(req.temperature, 0.0);
        assert_eq!(cap.processing_message(), "Working...");
    }

    #[test]
    fn test_extract_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  Galaxy M34  "}}]}"#;
        assert_eq!(extract_content(body).unwrap(), "Galaxy M34");

        let empty = r#"{"choices":[{"message":{"role":"assistant","content":""}}]}"#;
        assert_eq!(extract_content(empty), Err(CapabilityError::EmptyResponse));

        let none = r#"{"choices":[]}"#;
        assert_eq!(extract_content(none), Err(CapabilityError::EmptyResponse));

        assert!(matches!(
            extract_content("not json"),
            Err(CapabilityError::Failed(_))
        ));
    }

    #[test]
    fn test_extract_error() {
        assert_eq!(
            extract_error(r#"{"error":{"message":"model not found"}}"#),
            "model not found"
        );
        assert_eq!(extract_error("Bad Gateway"), "Bad Gateway");
    }
}
