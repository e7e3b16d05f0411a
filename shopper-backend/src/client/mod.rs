//! Agent invocation client
//!
//! Calls remote task endpoints by agent-card URL. Streaming agents are read
//! as server-sent events; non-streaming agents are normalized into a
//! `working` then terminal pair so callers see one event shape either way.
//! Failures are never retried.

pub mod cards;

pub use cards::{card_url, CardResolver};

use crate::a2a::{
    A2aMethod, AgentCard, RpcError, RpcRequest, RpcResponse, Task, TaskEvent, TaskIdParams,
    TaskRequest, TaskState, TaskStatusUpdate,
};
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("invalid agent url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("agent returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{0}")]
    Rpc(RpcError),

    #[error("malformed response: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Http(err.to_string())
    }
}

pub struct A2aClient {
    http: Client,
    cards: CardResolver,
}

impl A2aClient {
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            cards: CardResolver::new(http.clone()),
            http,
        })
    }

    pub async fn card(&self, card_url: &str) -> Result<AgentCard, ClientError> {
        self.cards.resolve(card_url).await
    }

    /// Run one query to completion and return the final task snapshot
    pub async fn send(
        &self,
        card_url: &str,
        query: &str,
        context_id: &str,
    ) -> Result<Task, ClientError> {
        let card = self.card(card_url).await?;
        self.send_to(&card, query, context_id).await
    }

    pub async fn get_task(&self, card_url: &str, task_id: &str) -> Result<Task, ClientError> {
        let card = self.card(card_url).await?;
        self.call(&card.url, A2aMethod::GetTask, task_params(task_id))
            .await
    }

    /// Ask an agent to cancel a task. Endpoints refuse this, so the result is
    /// the agent's unsupported-operation error.
    pub async fn cancel_task(&self, card_url: &str, task_id: &str) -> Result<Task, ClientError> {
        let card = self.card(card_url).await?;
        self.call(&card.url, A2aMethod::CancelTask, task_params(task_id))
            .await
    }

    /// Run one query and forward every lifecycle event into `events`.
    ///
    /// Always ends with exactly one terminal event, which is also returned.
    /// Transport and protocol errors surface as a `failed` event.
    pub async fn stream(
        &self,
        card_url: &str,
        query: &str,
        context_id: &str,
        events: &mpsc::UnboundedSender<TaskEvent>,
    ) -> TaskEvent {
        let terminal = match self.card(card_url).await {
            Ok(card) if card.capabilities.streaming => {
                self.stream_events(&card, query, context_id, events).await
            }
            Ok(card) => {
                let _ = events.send(TaskEvent::working(format!("Waiting for {}...", card.name)));
                self.send_to(&card, query, context_id)
                    .await
                    .map(terminal_event)
            }
            Err(e) => Err(e),
        }
        .unwrap_or_else(|e| {
            log::warn!("[A2A_CLIENT] Call to {} failed: {}", card_url, e);
            TaskEvent::failed(format!("Error: {}", e))
        });

        let _ = events.send(terminal.clone());
        terminal
    }

    async fn send_to(
        &self,
        card: &AgentCard,
        query: &str,
        context_id: &str,
    ) -> Result<Task, ClientError> {
        let params = new_task_params(query, context_id)?;
        self.call(&card.url, A2aMethod::Send, params).await
    }

    /// Stream until a terminal event arrives; non-terminal events are
    /// forwarded, the terminal one is returned.
    async fn stream_events(
        &self,
        card: &AgentCard,
        query: &str,
        context_id: &str,
        events: &mpsc::UnboundedSender<TaskEvent>,
    ) -> Result<TaskEvent, ClientError> {
        let params = new_task_params(query, context_id)?;
        let response = self
            .post(&card.url, A2aMethod::Stream, params)
            .await?;

        let is_event_stream = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/event-stream"));
        if !is_event_stream {
            // Request rejected before streaming began
            let body = response.text().await?;
            return match parse_rpc::<Value>(&body) {
                Ok(_) => Err(ClientError::Protocol(
                    "expected an event stream".to_string(),
                )),
                Err(e) => Err(e),
            };
        }

        let mut frames = std::pin::pin!(response.bytes_stream().eventsource());
        while let Some(frame) = frames.next().await {
            let frame = frame.map_err(|e| ClientError::Protocol(format!("event stream: {}", e)))?;
            if frame.data.trim().is_empty() {
                continue;
            }
            if let Some(terminal) = forward_payload(&frame.data, events)? {
                return Ok(terminal);
            }
        }

        Err(ClientError::Protocol(format!(
            "stream from {} ended without a final event",
            card.name
        )))
    }

    async fn post(
        &self,
        endpoint: &str,
        method: A2aMethod,
        params: Value,
    ) -> Result<reqwest::Response, ClientError> {
        let request = RpcRequest::new(Uuid::new_v4().to_string(), method, params);
        log::debug!("[A2A_CLIENT] {} -> {}", method, endpoint);

        let response = self.http.post(endpoint).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        method: A2aMethod,
        params: Value,
    ) -> Result<T, ClientError> {
        let body = self.post(endpoint, method, params).await?.text().await?;
        parse_rpc(&body)
    }
}

fn new_task_params(query: &str, context_id: &str) -> Result<Value, ClientError> {
    let request = TaskRequest::new(query, Uuid::new_v4().to_string(), context_id);
    serde_json::to_value(&request).map_err(|e| ClientError::Protocol(e.to_string()))
}

fn task_params(task_id: &str) -> Value {
    serde_json::to_value(TaskIdParams {
        task_id: Some(task_id.to_string()),
    })
    .unwrap_or(Value::Null)
}

fn parse_rpc<T: DeserializeOwned>(body: &str) -> Result<T, ClientError> {
    let response: RpcResponse = serde_json::from_str(body)
        .map_err(|e| ClientError::Protocol(format!("invalid JSON-RPC response: {}", e)))?;
    if let Some(error) = response.error {
        return Err(ClientError::Rpc(error));
    }
    let result = response
        .result
        .ok_or_else(|| ClientError::Protocol("response has neither result nor error".to_string()))?;
    serde_json::from_value(result).map_err(|e| ClientError::Protocol(e.to_string()))
}

fn forward_payload(
    payload: &str,
    events: &mpsc::UnboundedSender<TaskEvent>,
) -> Result<Option<TaskEvent>, ClientError> {
    let update: TaskStatusUpdate = match serde_json::from_str(payload) {
        Ok(update) => update,
        // An error object instead of an update ends the stream
        Err(_) => return parse_rpc::<Value>(payload).map(|_| None),
    };
    let event = update.into_event();
    if event.is_terminal() {
        return Ok(Some(event));
    }
    let _ = events.send(event);
    Ok(None)
}

/// Map a finished snapshot onto the event a streaming agent would have sent
fn terminal_event(task: Task) -> TaskEvent {
    match task.state {
        TaskState::Completed => match task.artifacts.into_iter().last() {
            Some(artifact) => TaskEvent::Completed { artifact },
            None => TaskEvent::failed("Error: agent completed without an answer"),
        },
        TaskState::Failed => TaskEvent::failed(
            task.error
                .unwrap_or_else(|| "Error: agent reported failure".to_string()),
        ),
        state => TaskEvent::failed(format!("Error: agent returned a {} task", state)),
    }
}
