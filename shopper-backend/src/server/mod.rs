//! Remote task endpoint: agent card plus the JSON-RPC task route

use crate::a2a::protocol::JSONRPC_VERSION;
use crate::a2a::{
    A2aMethod, AgentCard, RpcError, RpcRequest, RpcResponse, TaskIdParams, TaskRequest,
    TaskUpdate, AGENT_CARD_PATH,
};
use crate::agents::AgentKind;
use crate::capabilities::Capability;
use crate::controllers::health::VERSION;
use crate::executor::TaskExecutor;
use actix_web::{web, HttpResponse, Responder};
use futures_util::stream;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct AgentServerState {
    pub card: AgentCard,
    pub executor: Arc<TaskExecutor>,
}

impl AgentServerState {
    pub fn new(card: AgentCard, executor: Arc<TaskExecutor>) -> Self {
        Self { card, executor }
    }

    /// State for one of the shopper agents, answering with `capability`
    pub fn for_kind(
        kind: AgentKind,
        host: &str,
        port: u16,
        capability: Arc<dyn Capability>,
    ) -> Self {
        Self::new(
            kind.agent_card(host, port),
            Arc::new(TaskExecutor::new(kind.identity(), capability)),
        )
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource(AGENT_CARD_PATH).route(web::get().to(get_agent_card)));
    cfg.service(web::resource("/").route(web::post().to(handle_rpc)));
    cfg.service(web::resource("/api/health").route(web::get().to(health_check)));
}

async fn health_check(state: web::Data<AgentServerState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "version": VERSION,
        "agent": state.card.name,
        "streaming": state.card.capabilities.streaming,
        "tasks": state.executor.tasks().len(),
    }))
}

async fn get_agent_card(state: web::Data<AgentServerState>) -> impl Responder {
    HttpResponse::Ok().json(&state.card)
}

async fn handle_rpc(state: web::Data<AgentServerState>, body: web::Bytes) -> HttpResponse {
    let request = match parse_request(&body) {
        Ok(request) => request,
        Err((id, error)) => return rpc_reply(RpcResponse::error(id, error)),
    };
    let id = request.id.clone();

    let method = match A2aMethod::from_str(&request.method) {
        Ok(method) => method,
        Err(_) => {
            log::warn!("[AGENT_SERVER] Unknown method {}", request.method);
            return rpc_reply(RpcResponse::error(id, RpcError::method_not_found()));
        }
    };
    log::debug!("[AGENT_SERVER] {} {}", state.card.name, method);

    let executor = state.executor.clone();
    match method {
        A2aMethod::Send => {
            let params: TaskRequest = match parse_params(request.params) {
                Ok(params) => params,
                Err(error) => return rpc_reply(RpcResponse::error(id, error)),
            };
            // Nobody listens on a blocking send; the snapshot carries the result
            let (queue, _updates) = mpsc::unbounded_channel();
            match executor.execute(&params, queue).await {
                Ok(task) => rpc_result(id, &task),
                Err(e) => rpc_reply(RpcResponse::error(id, e.to_rpc_error())),
            }
        }
        A2aMethod::Stream => {
            let params: TaskRequest = match parse_params(request.params) {
                Ok(params) => params,
                Err(error) => return rpc_reply(RpcResponse::error(id, error)),
            };
            let admitted = match executor.admit(&params) {
                Ok(admitted) => admitted,
                Err(e) => return rpc_reply(RpcResponse::error(id, e.to_rpc_error())),
            };

            let (queue, updates) = mpsc::unbounded_channel();
            tokio::spawn(async move {
                if let Err(e) = executor.run(admitted, queue).await {
                    log::warn!("[AGENT_SERVER] Streamed task ended early: {}", e);
                }
            });
            event_stream(updates)
        }
        A2aMethod::GetTask => {
            let task_id = match parse_task_id(request.params) {
                Ok(task_id) => task_id,
                Err(error) => return rpc_reply(RpcResponse::error(id, error)),
            };
            match executor.get_task(&task_id) {
                Ok(task) => rpc_result(id, &task),
                Err(e) => rpc_reply(RpcResponse::error(id, e.to_rpc_error())),
            }
        }
        A2aMethod::CancelTask => {
            let params: TaskIdParams = parse_params(request.params).unwrap_or_default();
            match executor.cancel(params.task_id.as_deref()) {
                Ok(task) => rpc_result(id, &task),
                Err(e) => rpc_reply(RpcResponse::error(id, e.to_rpc_error())),
            }
        }
    }
}

fn parse_request(body: &[u8]) -> Result<RpcRequest, (Value, RpcError)> {
    let raw: Value =
        serde_json::from_slice(body).map_err(|_| (Value::Null, RpcError::parse_error()))?;
    let id = raw.get("id").cloned().unwrap_or(Value::Null);
    let request: RpcRequest =
        serde_json::from_value(raw).map_err(|_| (id.clone(), RpcError::invalid_request()))?;
    if request.jsonrpc != JSONRPC_VERSION {
        return Err((id, RpcError::invalid_request()));
    }
    Ok(request)
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, RpcError> {
    serde_json::from_value(params).map_err(|e| RpcError::invalid_params(e.to_string()))
}

fn parse_task_id(params: Value) -> Result<String, RpcError> {
    let params: TaskIdParams = parse_params(params)?;
    params
        .task_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| RpcError::invalid_params("request must have a task_id"))
}

fn rpc_result(id: Value, result: &impl serde::Serialize) -> HttpResponse {
    match serde_json::to_value(result) {
        Ok(value) => rpc_reply(RpcResponse::success(id, value)),
        Err(e) => rpc_reply(RpcResponse::error(id, RpcError::internal_error(e.to_string()))),
    }
}

fn rpc_reply(response: RpcResponse) -> HttpResponse {
    HttpResponse::Ok().json(response)
}

/// One server-sent event per task update; the body ends with the queue.
fn event_stream(updates: mpsc::UnboundedReceiver<TaskUpdate>) -> HttpResponse {
    let body = stream::unfold(updates, |mut updates| async move {
        let update = updates.recv().await?;
        Some((Ok::<_, actix_web::Error>(web::Bytes::from(sse_frame(&update))), updates))
    });

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(body)
}

fn sse_frame(update: &TaskUpdate) -> String {
    match serde_json::to_string(&update.to_wire()) {
        Ok(json) => format!("data: {}\n\n", json),
        Err(e) => {
            log::error!("[AGENT_SERVER] Failed to encode update: {}", e);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::protocol::{
        INVALID_PARAMS, METHOD_NOT_FOUND, PARSE_ERROR, TASK_NOT_FOUND, UNSUPPORTED_OPERATION,
    };
    use crate::a2a::{Task, TaskState, TaskStatusUpdate};
    use crate::capabilities::ScriptedCapability;
    use eventsource_stream::Eventsource;
    use futures_util::StreamExt;
    use std::convert::Infallible;
    use actix_web::{test, App};
    use serde_json::json;

    fn state(capability: ScriptedCapability) -> web::Data<AgentServerState> {
        web::Data::new(AgentServerState::for_kind(
            AgentKind::PriceTracker,
            "localhost",
            10001,
            Arc::new(capability.with_processing_message("Fetching live prices...")),
        ))
    }

    fn rpc(method: &str, params: Value) -> Value {
        json!({"jsonrpc": "2.0", "id": "req-1", "method": method, "params": params})
    }

    #[actix_web::test]
    async fn test_serves_agent_card() {
        let app = test::init_service(
            App::new()
                .app_data(state(ScriptedCapability::answering("x")))
                .configure(config),
        )
        .await;
        let req = test::TestRequest::get().uri(AGENT_CARD_PATH).to_request();
        let card: AgentCard = test::call_and_read_body_json(&app, req).await;
        assert_eq!(card.name, "price_tracker_agent");
        assert_eq!(card.url, "http://localhost:10001/");
    }

    #[actix_web::test]
    async fn test_health_reports_agent() {
        let app = test::init_service(
            App::new()
                .app_data(state(ScriptedCapability::answering("x")))
                .configure(config),
        )
        .await;
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["agent"], "price_tracker_agent");
        assert_eq!(body["streaming"], false);
        assert_eq!(body["tasks"], 0);
    }

    #[actix_web::test]
    async fn test_message_send_returns_completed_task() {
        let app = test::init_service(
            App::new()
                .app_data(state(ScriptedCapability::answering("Galaxy F54: 22,999")))
                .configure(config),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/")
            .set_json(rpc(
                "message/send",
                json!({"query_text": "price of F54", "task_id": "t1", "context_id": "ctx"}),
            ))
            .to_request();
        let resp: RpcResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.id, json!("req-1"));
        let task: Task = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(task.state, TaskState::Completed);
        assert_eq!(task.result_text(), Some("Galaxy F54: 22,999"));

        let req = test::TestRequest::post()
            .uri("/")
            .set_json(rpc("tasks/get", json!({"task_id": "t1"})))
            .to_request();
        let resp: RpcResponse = test::call_and_read_body_json(&app, req).await;
        assert!(resp.error.is_none());
    }

    #[actix_web::test]
    async fn test_message_stream_emits_lifecycle_events() {
        let app = test::init_service(
            App::new()
                .app_data(state(ScriptedCapability::answering("22,999")))
                .configure(config),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/")
            .set_json(rpc(
                "message/stream",
                json!({"query_text": "price of F54", "task_id": "t1", "context_id": "ctx"}),
            ))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "text/event-stream"
        );
        let body = test::read_body(resp).await;

        let frames: Vec<_> = stream::iter([Ok::<_, Infallible>(body)])
            .eventsource()
            .collect()
            .await;
        let updates: Vec<TaskStatusUpdate> = frames
            .into_iter()
            .map(|frame| serde_json::from_str(&frame.unwrap().data).unwrap())
            .collect();
        let states: Vec<TaskState> = updates.iter().map(|u| u.state).collect();
        assert_eq!(
            states,
            vec![TaskState::Submitted, TaskState::Working, TaskState::Completed]
        );
        assert_eq!(updates[1].message.as_deref(), Some("Fetching live prices..."));
        assert!(updates[2].is_final);
        assert_eq!(updates.iter().filter(|u| u.is_final).count(), 1);
    }

    #[actix_web::test]
    async fn test_rpc_errors() {
        let app = test::init_service(
            App::new()
                .app_data(state(ScriptedCapability::answering("x")))
                .configure(config),
        )
        .await;

        let cases = vec![
            (rpc("message/send", json!({"query_text": "q", "context_id": "ctx"})), INVALID_PARAMS),
            (rpc("message/stream", json!({"task_id": "t1", "context_id": "ctx"})), INVALID_PARAMS),
            (rpc("tasks/get", json!({"task_id": "missing"})), TASK_NOT_FOUND),
            (rpc("tasks/cancel", json!({"task_id": "missing"})), UNSUPPORTED_OPERATION),
            (rpc("tasks/resubscribe", json!({})), METHOD_NOT_FOUND),
        ];
        for (payload, code) in cases {
            let req = test::TestRequest::post().uri("/").set_json(payload).to_request();
            let resp: RpcResponse = test::call_and_read_body_json(&app, req).await;
            assert_eq!(resp.error.unwrap().code, code);
        }

        let req = test::TestRequest::post()
            .uri("/")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp: RpcResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.error.unwrap().code, PARSE_ERROR);
    }
}
