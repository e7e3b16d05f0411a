use crate::a2a::TaskEvent;
use crate::orchestration::AgentIdentity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PROGRESS_BASELINE: f64 = 0.1;
pub const NO_RESPONSE_PLACEHOLDER: &str = "No response found.";
pub const NO_QUERY_PLACEHOLDER: &str = "User query not recorded.";

/// Turn an agent identity into a display label.
///
/// Separators (`_`, `-`, `.`, whitespace) become single spaces and every word
/// is title-cased.
pub fn humanize(identity: &str) -> String {
    identity
        .split(|c: char| c == '_' || c == '-' || c == '.' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Run progress in `[0, 1]` that only moves forward
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    value: f64,
    increment: f64,
}

impl Progress {
    pub fn new(agent_count: usize) -> Self {
        Self {
            value: PROGRESS_BASELINE,
            increment: 1.0 / agent_count.max(1) as f64,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn percent(&self) -> u8 {
        (self.value * 100.0).round() as u8
    }

    pub fn advance(&mut self) -> f64 {
        self.value = (self.value + self.increment).min(1.0);
        self.value
    }

    pub fn complete(&mut self) {
        self.value = 1.0;
    }

    pub fn reset(&mut self) {
        self.value = PROGRESS_BASELINE;
    }
}

/// What one query has produced so far, keyed by agent identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationRecord {
    pub query: Option<String>,
    /// identity -> latest text
    pub outputs: BTreeMap<String, String>,
    /// label -> identity
    pub label_map: BTreeMap<String, AgentIdentity>,
    /// Labels in first-arrival order
    pub seen_agents: Vec<String>,
}

/// Result of one accepted observation
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub label: String,
    /// True the first time this label shows up for the current query
    pub new_label: bool,
    pub progress: f64,
}

/// Sole owner of the delegation record for the current query
#[derive(Debug, Clone)]
pub struct DelegationAggregator {
    record: DelegationRecord,
    progress: Progress,
    log: Vec<String>,
}

impl DelegationAggregator {
    pub fn new(agent_count: usize) -> Self {
        Self {
            record: DelegationRecord::default(),
            progress: Progress::new(agent_count),
            log: Vec::new(),
        }
    }

    /// Start a new top-level query
    pub fn reset(&mut self, query: &str) {
        self.record = DelegationRecord {
            query: Some(query.to_string()),
            ..DelegationRecord::default()
        };
        self.progress.reset();
        self.log.clear();
    }

    /// Record one agent's terminal text.
    ///
    /// Progress advances on every call; empty text is otherwise ignored and
    /// yields `None`.
    pub fn observe(&mut self, identity: &AgentIdentity, text: &str) -> Option<Observation> {
        let progress = self.progress.advance();
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        self.record
            .outputs
            .insert(identity.as_str().to_string(), text.to_string());

        let label = identity.label();
        self.record.label_map.insert(label.clone(), identity.clone());
        let new_label = !self.record.seen_agents.contains(&label);
        if new_label {
            self.record.seen_agents.push(label.clone());
            self.log.push(format!("⚙️ Delegated To: {}", label));
            log::info!("[DELEGATION] Delegated To: {}", label);
        }

        Some(Observation {
            label,
            new_label,
            progress,
        })
    }

    /// Feed a lifecycle event; only terminal events are recorded.
    pub fn observe_event(
        &mut self,
        author: &AgentIdentity,
        event: &TaskEvent,
    ) -> Option<Observation> {
        if !event.is_terminal() {
            return None;
        }
        self.observe(author, event.text().unwrap_or_default())
    }

    /// `(query, text)` for a label, answered from the record alone.
    ///
    /// An unknown label is looked up as an identity before falling back to
    /// the placeholder.
    pub fn render(&self, label: &str) -> (String, String) {
        let query = self
            .record
            .query
            .clone()
            .unwrap_or_else(|| NO_QUERY_PLACEHOLDER.to_string());
        let identity = self
            .record
            .label_map
            .get(label)
            .map(|id| id.as_str())
            .unwrap_or(label);
        let text = self
            .record
            .outputs
            .get(identity)
            .cloned()
            .unwrap_or_else(|| NO_RESPONSE_PLACEHOLDER.to_string());
        (query, text)
    }

    pub fn finish(&mut self) {
        self.progress.complete();
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn record(&self) -> &DelegationRecord {
        &self.record
    }

    pub fn labels(&self) -> &[String] {
        &self.record.seen_agents
    }

    pub fn log_text(&self) -> String {
        self.log.join("\n")
    }
}
