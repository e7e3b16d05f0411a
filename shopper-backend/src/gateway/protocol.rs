use crate::delegation::{DelegationAggregator, DelegationRecord};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

pub const PROCESSING_PLACEHOLDER: &str = "Processing...";
pub const NEXT_QUESTION_PLACEHOLDER: &str = "Type your next question here...";
pub const PROCESSING_STATUS: &str = "Processing User Query...";
pub const DONE_STATUS: &str = "Response Generated Successfully!";

/// One user/assistant exchange as shown in the chat transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub user: String,
    pub assistant: String,
}

impl ChatTurn {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProgressState {
    Idle,
    Running,
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressDisplay {
    pub value: f64,
    pub percent: u8,
    pub status: String,
    pub state: ProgressState,
}

impl ProgressDisplay {
    pub fn idle() -> Self {
        Self {
            value: 0.0,
            percent: 0,
            status: String::new(),
            state: ProgressState::Idle,
        }
    }

    pub fn running(aggregator: &DelegationAggregator, status: impl Into<String>) -> Self {
        let progress = aggregator.progress();
        Self {
            value: progress.value(),
            percent: progress.percent(),
            status: status.into(),
            state: ProgressState::Running,
        }
    }

    pub fn done(aggregator: &DelegationAggregator) -> Self {
        let progress = aggregator.progress();
        Self {
            value: progress.value(),
            percent: progress.percent(),
            status: DONE_STATUS.to_string(),
            state: ProgressState::Done,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputBoxState {
    pub value: String,
    pub interactive: bool,
    pub placeholder: String,
}

impl InputBoxState {
    pub fn busy() -> Self {
        Self {
            value: String::new(),
            interactive: false,
            placeholder: PROCESSING_PLACEHOLDER.to_string(),
        }
    }

    pub fn ready() -> Self {
        Self {
            value: String::new(),
            interactive: true,
            placeholder: NEXT_QUESTION_PLACEHOLDER.to_string(),
        }
    }
}

/// Everything the front end needs to redraw after one pipeline step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontendUpdate {
    pub session_id: String,
    /// Labels in first-arrival order
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_label: Option<String>,
    pub chat: Vec<ChatTurn>,
    pub progress: ProgressDisplay,
    pub input: InputBoxState,
    pub delegations: DelegationRecord,
    pub delegation_log: String,
}

impl FrontendUpdate {
    pub fn from_aggregator(
        session_id: &str,
        aggregator: &DelegationAggregator,
        chat: Vec<ChatTurn>,
        progress: ProgressDisplay,
        input: InputBoxState,
    ) -> Self {
        Self {
            session_id: session_id.to_string(),
            labels: aggregator.labels().to_vec(),
            selected_label: aggregator.labels().last().cloned(),
            chat,
            progress,
            input,
            delegations: aggregator.record().clone(),
            delegation_log: aggregator.log_text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::AgentIdentity;

    #[test]
    fn test_update_reflects_aggregator() {
        let mut agg = DelegationAggregator::new(4);
        agg.reset("Compare F54 and M34");
        agg.observe(&AgentIdentity::new("price_tracker_agent").unwrap(), "22,999");

        let update = FrontendUpdate::from_aggregator(
            "s1",
            &agg,
            vec![ChatTurn::new("Compare F54 and M34", "22,999")],
            ProgressDisplay::running(&agg, "Received Response from Price Tracker Agent..."),
            InputBoxState::busy(),
        );
        assert_eq!(update.labels, vec!["Price Tracker Agent"]);
        assert_eq!(update.selected_label.as_deref(), Some("Price Tracker Agent"));
        assert_eq!(update.progress.percent, 35);

        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["progress"]["state"], "running");
        assert_eq!(json["input"]["placeholder"], PROCESSING_PLACEHOLDER);
        assert_eq!(
            json["delegations"]["outputs"]["price_tracker_agent"],
            "22,999"
        );
    }
}
