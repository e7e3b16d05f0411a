use super::ClientError;
use crate::a2a::{AgentCard, AGENT_CARD_PATH};
use dashmap::DashMap;
use reqwest::Client;
use url::Url;

/// Normalize an agent address to the URL of its card.
///
/// Accepts either the card URL itself or the agent's base URL.
pub fn card_url(raw: &str) -> Result<String, ClientError> {
    let mut url = Url::parse(raw.trim()).map_err(|e| ClientError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {}", url.scheme()),
        });
    }

    if !url.path().ends_with(AGENT_CARD_PATH) {
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{}{}", base, AGENT_CARD_PATH));
    }
    Ok(url.to_string())
}

/// Fetches agent cards once and keeps them for the life of the client
pub struct CardResolver {
    http: Client,
    cache: DashMap<String, AgentCard>,
}

impl CardResolver {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            cache: DashMap::new(),
        }
    }

    pub async fn resolve(&self, raw_url: &str) -> Result<AgentCard, ClientError> {
        let url = card_url(raw_url)?;
        if let Some(card) = self.cache.get(&url) {
            return Ok(card.clone());
        }

        log::debug!("[A2A_CLIENT] Fetching agent card from {}", url);
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let card: AgentCard = response
            .json()
            .await
            .map_err(|e| ClientError::Protocol(format!("invalid agent card: {}", e)))?;
        log::info!(
            "[A2A_CLIENT] Resolved agent card {} -> {} (streaming={})",
            url,
            card.url,
            card.capabilities.streaming
        );
        self.cache.insert(url, card.clone());
        Ok(card)
    }
}
