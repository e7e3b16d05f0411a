//! Query Test Fixture
//!
//! Runs one query through the personal shopper graph without booting the
//! HTTP front end, printing every delegate event as it arrives.
//!
//! Usage:
//!   TEST_QUERY="Compare Samsung Galaxy F54 and M34" \
//!   cargo run --bin query_test
//!
//! With `TEST_OFFLINE=1` every agent runs in-process with canned replies, so
//! neither the agent servers nor the LLM endpoint need to be up.

use dotenv::dotenv;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use strum::IntoEnumIterator;

use shopper_backend::a2a::TaskEvent;
use shopper_backend::agents::{
    personal_shopper_graph, synthesizer_capability, AgentKind, GRAPH_NAME, SYNTHESIZER_DESCRIPTION,
    SYNTHESIZER_IDENTITY,
};
use shopper_backend::capabilities::ScriptedCapability;
use shopper_backend::client::A2aClient;
use shopper_backend::config::Config;
use shopper_backend::context::{OrchestrationContext, RunContext};
use shopper_backend::delegation::DelegationAggregator;
use shopper_backend::executor::TaskExecutor;
use shopper_backend::orchestration::{
    AgentIdentity, AgentRef, GraphError, LocalAgent, OrchestrationEvent, OrchestrationGraph,
    Orchestrator,
};

const DEFAULT_QUERY: &str = "Compare Samsung Galaxy F54 and M34";

fn local_agent(
    identity: &str,
    description: &str,
    capability: ScriptedCapability,
) -> Result<AgentRef, GraphError> {
    Ok(AgentRef::new(
        AgentIdentity::new(identity)?,
        description,
        Arc::new(LocalAgent::new(Arc::new(TaskExecutor::new(
            identity,
            Arc::new(capability),
        )))),
    ))
}

fn offline_graph() -> Result<OrchestrationGraph, GraphError> {
    let scripted = |kind: AgentKind| {
        local_agent(
            kind.identity(),
            kind.description(),
            ScriptedCapability::echoing(format!("[{}] ", kind.identity()))
                .with_processing_message(kind.processing_message())
                .with_delay(Duration::from_millis(200)),
        )
    };

    OrchestrationGraph::builder(GRAPH_NAME)
        .then(scripted(AgentKind::ProductRecommender)?)
        .parallel(vec![
            scripted(AgentKind::PriceTracker)?,
            scripted(AgentKind::ReviewAnalysis)?,
        ])
        .then(local_agent(
            SYNTHESIZER_IDENTITY,
            SYNTHESIZER_DESCRIPTION,
            ScriptedCapability::echoing("Recommendation based on: "),
        )?)
        .build()
}

fn live_graph() -> Result<OrchestrationGraph, String> {
    let config = Config::from_env().map_err(|e| e.to_string())?;
    for kind in AgentKind::iter() {
        println!("   {} -> {}", kind.identity(), config.card_url(kind));
    }
    let client = A2aClient::new(Duration::from_secs(config.llm.timeout_secs))
        .map_err(|e| e.to_string())?;
    let ctx = OrchestrationContext::new(Arc::new(client));
    let synthesizer = synthesizer_capability(&config.llm).map_err(|e| e.to_string())?;
    personal_shopper_graph(&ctx, &config, Arc::new(synthesizer)).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let query = env::var("TEST_QUERY").unwrap_or_else(|_| DEFAULT_QUERY.to_string());
    let offline = matches!(env::var("TEST_OFFLINE").as_deref(), Ok("1") | Ok("true"));

    println!("==========================================================");
    println!("🛒 Query: {}", query);
    println!("   Mode: {}", if offline { "offline" } else { "live" });
    println!("==========================================================");

    let graph = if offline {
        offline_graph().map_err(|e| e.to_string())
    } else {
        live_graph()
    };
    let graph = match graph {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!("❌ Could not build graph: {}", e);
            std::process::exit(1);
        }
    };

    let mut aggregator = DelegationAggregator::new(graph.agent_count());
    aggregator.reset(&query);
    let orchestrator = Orchestrator::new(graph);
    let run = RunContext::new(query.as_str(), None);
    let mut events = orchestrator.run(&run);

    let mut final_answer = String::new();
    while let Some(event) = events.recv().await {
        match event {
            OrchestrationEvent::StageStarted { index, agents } => {
                let names: Vec<String> = agents.iter().map(|a| a.label()).collect();
                println!("\n▶️  Stage {}: {}", index + 1, names.join(", "));
            }
            OrchestrationEvent::Delegate(delegate) => {
                if let TaskEvent::Working { message } = &delegate.event {
                    println!("   ⏳ {}: {}", delegate.author.label(), message);
                }
                let observed = aggregator.observe_event(&delegate.author, &delegate.event);
                if let Some(observation) = observed {
                    let status = match delegate.event {
                        TaskEvent::Completed { .. } => "✅",
                        _ => "❌",
                    };
                    println!(
                        "   {} {} ({}%)",
                        status,
                        observation.label,
                        aggregator.progress().percent()
                    );
                    println!("      {}", delegate.event.text().unwrap_or_default());
                }
            }
            OrchestrationEvent::StageCompleted { index, outputs } => {
                let ok = outputs.iter().filter(|o| o.succeeded).count();
                println!("   Stage {} done: {}/{} succeeded", index + 1, ok, outputs.len());
            }
            OrchestrationEvent::Finished { final_answer: answer } => {
                aggregator.finish();
                final_answer = answer;
            }
        }
    }

    println!("\n==========================================================");
    println!("📊 Delegations: {}", aggregator.labels().join(", "));
    println!("🎯 Final answer:");
    println!("{}", final_answer);
    println!("==========================================================");
}
