use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;
use strum::IntoEnumIterator;

use shopper_backend::agents::{personal_shopper_graph, synthesizer_capability, AgentKind};
use shopper_backend::client::A2aClient;
use shopper_backend::config::Config;
use shopper_backend::context::OrchestrationContext;
use shopper_backend::controllers;
use shopper_backend::gateway::Gateway;
use shopper_backend::orchestration::Orchestrator;
use shopper_backend::AppState;

fn other_error(e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env().map_err(other_error)?;
    let port = config.port;

    log::info!("Initializing agent invocation client");
    let client = A2aClient::new(Duration::from_secs(config.llm.timeout_secs)).map_err(other_error)?;
    let ctx = OrchestrationContext::new(Arc::new(client));

    log::info!("Building personal shopper graph");
    let synthesizer = synthesizer_capability(&config.llm).map_err(other_error)?;
    let graph = personal_shopper_graph(&ctx, &config, Arc::new(synthesizer)).map_err(other_error)?;
    for kind in AgentKind::iter() {
        log::info!("  {} -> {}", kind.identity(), config.card_url(kind));
    }
    log::info!(
        "Graph {} has {} stages and {} agents",
        graph.name(),
        graph.stages().len(),
        graph.agent_count()
    );

    let gateway = Arc::new(Gateway::new(Orchestrator::new(graph)));

    log::info!("Starting orchestrator on port {}", port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(AppState {
                config: config.clone(),
                gateway: Arc::clone(&gateway),
            }))
            .wrap(Logger::default())
            .wrap(cors)
            .configure(controllers::health::config)
            .configure(controllers::chat::config)
            .configure(controllers::delegations::config)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
