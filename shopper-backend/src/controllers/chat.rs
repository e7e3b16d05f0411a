use actix_web::{web, HttpResponse};
use futures_util::stream;
use serde::{Deserialize, Serialize};

use crate::gateway::{ChatTurn, FrontendUpdate};
use crate::AppState;

pub const SESSION_HEADER: &str = "X-Session-Id";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/chat").route(web::post().to(chat)));
}

/// Streams one JSON `FrontendUpdate` per line until the run finishes
async fn chat(state: web::Data<AppState>, body: web::Json<ChatRequest>) -> HttpResponse {
    let request = body.into_inner();
    let message = request.message.trim();
    if message.is_empty() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "message must not be empty".to_string(),
        });
    }

    let (session_id, updates) =
        state
            .gateway
            .handle_message(request.session_id.as_deref(), message, request.history);

    let body = stream::unfold(updates, |mut updates| async move {
        let update = updates.recv().await?;
        Some((Ok::<_, actix_web::Error>(web::Bytes::from(ndjson_line(&update))), updates))
    });

    HttpResponse::Ok()
        .content_type("application/x-ndjson")
        .insert_header((SESSION_HEADER, session_id))
        .streaming(body)
}

fn ndjson_line(update: &FrontendUpdate) -> String {
    match serde_json::to_string(update) {
        Ok(json) => format!("{}\n", json),
        Err(e) => {
            log::error!("[ORCHESTRATOR] Failed to encode update: {}", e);
            String::new()
        }
    }
}
