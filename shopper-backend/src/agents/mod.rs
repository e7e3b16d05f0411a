//! Static profiles of the shopper agents and the graph that wires them

use crate::a2a::{AgentCapabilities, AgentCard, AgentSkill, AGENT_CARD_PATH, TEXT_CONTENT_TYPES};
use crate::capabilities::{Capability, CapabilityError, LlmCapability};
use crate::config::{Config, LlmSettings};
use crate::context::OrchestrationContext;
use crate::executor::TaskExecutor;
use crate::orchestration::{AgentIdentity, AgentRef, GraphError, LocalAgent, OrchestrationGraph};
use std::sync::Arc;
use strum::{AsRefStr, Display, EnumIter, EnumString};

pub const AGENT_VERSION: &str = "1.0.0";

/// In-process agent that merges every delegate output into one answer
pub const SYNTHESIZER_IDENTITY: &str = "e_commerce_personal_shopper";
pub const SYNTHESIZER_DESCRIPTION: &str = "Provides personalized suggestion";
pub const SYNTHESIZER_INSTRUCTION: &str = "Based on the inputs, provide which is better. \
Also share the link to purchase ONLY from the input obtained.";
pub const SYNTHESIZER_PROCESSING_MESSAGE: &str = "Comparing the options...";

pub const GRAPH_NAME: &str = "personal_shopper";

/// The remote agents, one process each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum AgentKind {
    ProductRecommender,
    PriceTracker,
    ReviewAnalysis,
}

impl AgentKind {
    /// Name on the agent card and author of every event it produces
    pub fn identity(&self) -> &'static str {
        match self {
            AgentKind::ProductRecommender => "product_recommender_agent",
            AgentKind::PriceTracker => "price_tracker_agent",
            AgentKind::ReviewAnalysis => "review_analysis_agent",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AgentKind::ProductRecommender => "Suggest products based on the user specifications",
            AgentKind::PriceTracker => "Fetch the price details of products",
            AgentKind::ReviewAnalysis => "Fetches customer reviews for the products",
        }
    }

    pub fn tags(&self) -> &'static [&'static str] {
        match self {
            AgentKind::ProductRecommender => &["suggest", "feature", "idea"],
            AgentKind::PriceTracker => &["price fetcher", "price", "amazon"],
            AgentKind::ReviewAnalysis => &["review", "customer feedback", "ratings"],
        }
    }

    pub fn examples(&self) -> &'static [&'static str] {
        match self {
            AgentKind::ProductRecommender => &[
                "I want a smartphone under ₹25,000 with a great camera and good battery. I prefer Samsung.",
            ],
            AgentKind::PriceTracker => &["Fetch the price of Samsung Galaxy F54 5G"],
            AgentKind::ReviewAnalysis => &["Share the reviews of Samsung Galaxy F54 5G."],
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            AgentKind::PriceTracker => 10001,
            AgentKind::ReviewAnalysis => 10002,
            AgentKind::ProductRecommender => 10003,
        }
    }

    pub fn default_card_url(&self) -> String {
        format!("http://localhost:{}{}", self.default_port(), AGENT_CARD_PATH)
    }

    pub fn processing_message(&self) -> &'static str {
        match self {
            AgentKind::ProductRecommender => "Finding matching products...",
            AgentKind::PriceTracker => "Fetching live prices...",
            AgentKind::ReviewAnalysis => "Analyzing data...",
        }
    }

    /// Whether the endpoint advertises `message/stream` on its card
    pub fn streaming(&self) -> bool {
        !matches!(self, AgentKind::PriceTracker)
    }

    pub fn instruction(&self) -> &'static str {
        match self {
            AgentKind::ProductRecommender => {
                "Suggest products that match the user's specifications. \
                 Return the product names with their key features. Don't fetch prices or reviews."
            }
            AgentKind::PriceTracker => {
                "Identify the product names in the query. \
                 Return the title and price of each product. DON'T respond with your opinion."
            }
            AgentKind::ReviewAnalysis => {
                "Identify the products in the query and fetch the product reviews for each product. \
                 DON'T provide SUGGESTION. Just fetch the reviews."
            }
        }
    }

    pub fn agent_card(&self, host: &str, port: u16) -> AgentCard {
        let modes: Vec<String> = TEXT_CONTENT_TYPES.iter().map(|m| m.to_string()).collect();
        AgentCard {
            name: self.identity().to_string(),
            description: self.description().to_string(),
            url: format!("http://{}:{}/", host, port),
            version: AGENT_VERSION.to_string(),
            default_input_modes: modes.clone(),
            default_output_modes: modes,
            capabilities: AgentCapabilities {
                streaming: self.streaming(),
            },
            skills: vec![AgentSkill {
                id: self.identity().to_string(),
                name: self.identity().to_string(),
                description: self.description().to_string(),
                tags: self.tags().iter().map(|t| t.to_string()).collect(),
                examples: self.examples().iter().map(|e| e.to_string()).collect(),
            }],
        }
    }

    pub fn llm_capability(&self, llm: &LlmSettings) -> Result<LlmCapability, CapabilityError> {
        LlmCapability::new(llm, self.instruction(), self.processing_message())
    }
}

pub fn synthesizer_capability(llm: &LlmSettings) -> Result<LlmCapability, CapabilityError> {
    LlmCapability::new(llm, SYNTHESIZER_INSTRUCTION, SYNTHESIZER_PROCESSING_MESSAGE)
}

/// recommender -> {price tracker, review analysis} -> synthesizer
pub fn personal_shopper_graph(
    ctx: &OrchestrationContext,
    config: &Config,
    synthesizer: Arc<dyn Capability>,
) -> Result<OrchestrationGraph, GraphError> {
    let remote = |kind: AgentKind| {
        ctx.remote_agent(kind.identity(), kind.description(), config.card_url(kind))
    };

    let synthesizer = AgentRef::new(
        AgentIdentity::new(SYNTHESIZER_IDENTITY)?,
        SYNTHESIZER_DESCRIPTION,
        Arc::new(LocalAgent::new(Arc::new(TaskExecutor::new(
            SYNTHESIZER_IDENTITY,
            synthesizer,
        )))),
    );

    OrchestrationGraph::builder(GRAPH_NAME)
        .then(remote(AgentKind::ProductRecommender)?)
        .parallel(vec![
            remote(AgentKind::PriceTracker)?,
            remote(AgentKind::ReviewAnalysis)?,
        ])
        .then(synthesizer)
        .build()
}
