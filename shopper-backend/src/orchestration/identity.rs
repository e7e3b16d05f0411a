use super::GraphError;
use crate::delegation::humanize;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable name of one agent, unique within a graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgentIdentity(String);

impl AgentIdentity {
    pub fn new(name: impl Into<String>) -> Result<Self, GraphError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(GraphError::EmptyIdentity);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable label, e.g. `price_tracker_agent` -> `Price Tracker Agent`
    pub fn label(&self) -> String {
        humanize(&self.0)
    }
}

impl TryFrom<String> for AgentIdentity {
    type Error = GraphError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AgentIdentity> for String {
    fn from(identity: AgentIdentity) -> Self {
        identity.0
    }
}

impl AsRef<str> for AgentIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_identity_is_rejected() {
        assert_eq!(AgentIdentity::new(""), Err(GraphError::EmptyIdentity));
        assert_eq!(AgentIdentity::new("   "), Err(GraphError::EmptyIdentity));
        assert!(serde_json::from_str::<AgentIdentity>(r#""""#).is_err());
    }

    #[test]
    fn test_identity_label() {
        let id = AgentIdentity::new("review_analysis_agent").unwrap();
        assert_eq!(id.label(), "Review Analysis Agent");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""review_analysis_agent""#);
    }
}
