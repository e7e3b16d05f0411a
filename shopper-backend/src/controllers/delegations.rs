use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub session_id: String,
    pub label: String,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/delegations/select").route(web::post().to(select_delegation)));
}

/// Show one delegate's output next to the query, without calling any agent
async fn select_delegation(
    state: web::Data<AppState>,
    body: web::Json<SelectRequest>,
) -> impl Responder {
    let turn = state.gateway.select(&body.session_id, &body.label);
    HttpResponse::Ok().json(turn)
}
