//! Personal shopper backend
//!
//! Remote agents answer narrow questions behind JSON-RPC task endpoints; the
//! orchestrator runs them as a graph of sequential and parallel stages and
//! merges their outputs into one recommendation.

pub mod a2a;
pub mod agents;
pub mod capabilities;
pub mod client;
pub mod config;
pub mod context;
pub mod controllers;
pub mod delegation;
pub mod executor;
pub mod gateway;
pub mod orchestration;
pub mod server;

use config::Config;
use gateway::Gateway;
use std::sync::Arc;

/// Orchestrator state shared by the front-end controllers
pub struct AppState {
    pub config: Config,
    pub gateway: Arc<Gateway>,
}
