use crate::agents::AgentKind;
use std::env;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8081;
pub const DEFAULT_LLM_ENDPOINT: &str = "http://localhost:11434/v1/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "llama3.1-cpu-custom";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{key} must be a valid number, got {value:?}")]
    InvalidNumber { key: String, value: String },

    #[error("AGENT_KIND must be one of product_recommender, price_tracker, review_analysis; got {0:?}")]
    InvalidAgentKind(String),
}

/// OpenAI-compatible chat completions endpoint shared by every agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmSettings {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl LlmSettings {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: lookup("LLM_ENDPOINT").unwrap_or_else(|| DEFAULT_LLM_ENDPOINT.to_string()),
            model: lookup("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            api_key: lookup("LLM_API_KEY").filter(|k| !k.is_empty()),
            timeout_secs: parse_or(lookup, "REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
        })
    }
}

/// Orchestrator process settings
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub product_recommender_card_url: String,
    pub price_tracker_card_url: String,
    pub review_analysis_card_url: String,
    pub llm: LlmSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let card_url = |key: &str, kind: AgentKind| {
            lookup(key).unwrap_or_else(|| kind.default_card_url())
        };

        Ok(Self {
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            product_recommender_card_url: card_url(
                "PRODUCT_RECOMMENDER_CARD_URL",
                AgentKind::ProductRecommender,
            ),
            price_tracker_card_url: card_url("PRICE_TRACKER_CARD_URL", AgentKind::PriceTracker),
            review_analysis_card_url: card_url(
                "REVIEW_ANALYSIS_CARD_URL",
                AgentKind::ReviewAnalysis,
            ),
            llm: LlmSettings::from_lookup(&lookup)?,
        })
    }

    pub fn card_url(&self, kind: AgentKind) -> &str {
        match kind {
            AgentKind::ProductRecommender => &self.product_recommender_card_url,
            AgentKind::PriceTracker => &self.price_tracker_card_url,
            AgentKind::ReviewAnalysis => &self.review_analysis_card_url,
        }
    }
}

/// Settings for one remote agent process
#[derive(Debug, Clone)]
pub struct AgentServerConfig {
    pub kind: AgentKind,
    pub host: String,
    pub port: u16,
    pub llm: LlmSettings,
}

impl AgentServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_kind = lookup("AGENT_KIND").unwrap_or_else(|| "product_recommender".to_string());
        let kind = AgentKind::from_str(raw_kind.trim())
            .map_err(|_| ConfigError::InvalidAgentKind(raw_kind.clone()))?;

        Ok(Self {
            kind,
            host: lookup("AGENT_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: parse_or(&lookup, "AGENT_PORT", kind.default_port())?,
            llm: LlmSettings::from_lookup(&lookup)?,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
            key: key.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_orchestrator_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(
            config.price_tracker_card_url,
            "http://localhost:10001/.well-known/agent-card.json"
        );
        assert_eq!(
            config.card_url(AgentKind::ProductRecommender),
            "http://localhost:10003/.well-known/agent-card.json"
        );
        assert_eq!(config.llm.model, DEFAULT_LLM_MODEL);
        assert_eq!(config.llm.timeout_secs, 120);
        assert_eq!(config.llm.api_key, None);
    }

    #[test]
    fn test_orchestrator_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "9000"),
            ("REVIEW_ANALYSIS_CARD_URL", "http://reviews:8000"),
            ("LLM_API_KEY", "sk-test"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.review_analysis_card_url, "http://reviews:8000");
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_invalid_port() {
        let err = Config::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                key: "PORT".to_string(),
                value: "eighty".to_string()
            }
        );
    }

    #[test]
    fn test_agent_server_port_follows_kind() {
        let config =
            AgentServerConfig::from_lookup(lookup(&[("AGENT_KIND", "price_tracker")])).unwrap();
        assert_eq!(config.kind, AgentKind::PriceTracker);
        assert_eq!(config.port, 10001);
        assert_eq!(config.host, "localhost");

        assert!(matches!(
            AgentServerConfig::from_lookup(lookup(&[("AGENT_KIND", "weather")])),
            Err(ConfigError::InvalidAgentKind(_))
        ));
    }
}
