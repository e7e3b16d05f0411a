//! Remote shopper agent
//!
//! Serves one agent (chosen by `AGENT_KIND`) behind its card and JSON-RPC
//! task route. Set `AGENT_OFFLINE=1` to answer with an echo instead of the LLM.
//!
//! Usage:
//!   AGENT_KIND=price_tracker AGENT_PORT=10001 cargo run --bin agent_server

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::env;
use std::sync::Arc;

use shopper_backend::capabilities::{Capability, ScriptedCapability};
use shopper_backend::config::AgentServerConfig;
use shopper_backend::server::{self, AgentServerState};

fn other_error(e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = AgentServerConfig::from_env().map_err(other_error)?;
    let kind = config.kind;
    let offline = matches!(env::var("AGENT_OFFLINE").as_deref(), Ok("1") | Ok("true"));

    let capability: Arc<dyn Capability> = if offline {
        log::warn!("[AGENT_SERVER] {} running offline, replies are echoes", kind.identity());
        Arc::new(
            ScriptedCapability::echoing(format!("[{}] ", kind.identity()))
                .with_processing_message(kind.processing_message()),
        )
    } else {
        Arc::new(kind.llm_capability(&config.llm).map_err(other_error)?)
    };

    let state = web::Data::new(AgentServerState::for_kind(
        kind,
        &config.host,
        config.port,
        capability,
    ));
    log::info!(
        "[AGENT_SERVER] Starting {} at {} (streaming: {})",
        state.card.name,
        state.card.url,
        state.card.capabilities.streaming
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .configure(server::config)
    })
    .bind(("0.0.0.0", config.port))?
    .run()
    .await
}
