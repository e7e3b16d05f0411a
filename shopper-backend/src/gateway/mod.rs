//! Front-end gateway: runs queries for chat sessions and turns pipeline
//! events into redraw updates

pub mod protocol;

pub use protocol::{ChatTurn, FrontendUpdate, InputBoxState, ProgressDisplay, ProgressState};

use crate::a2a::TaskEvent;
use crate::context::RunContext;
use crate::delegation::{DelegationAggregator, NO_RESPONSE_PLACEHOLDER};
use crate::orchestration::{DelegateEvent, OrchestrationEvent, Orchestrator};
use dashmap::DashMap;
use parking_lot::Mutex;
use protocol::PROCESSING_STATUS;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Chat sessions remembered for `select` before the least recently used is dropped
pub const DEFAULT_MAX_SESSIONS: usize = 200;

/// Owns the delegation aggregator of each session's latest run.
///
/// Every message gets a fresh aggregator, so overlapping runs on one session
/// never write into each other's record; `select` reads the newest one.
pub struct Gateway {
    orchestrator: Orchestrator,
    sessions: DashMap<String, Arc<Mutex<DelegationAggregator>>>,
    recent: Mutex<VecDeque<String>>,
    max_sessions: usize,
}

impl Gateway {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self::with_session_capacity(orchestrator, DEFAULT_MAX_SESSIONS)
    }

    pub fn with_session_capacity(orchestrator: Orchestrator, max_sessions: usize) -> Self {
        Self {
            orchestrator,
            sessions: DashMap::new(),
            recent: Mutex::new(VecDeque::new()),
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// New aggregator for a run, replacing the session's previous one
    fn start_run(&self, session_id: &str) -> Arc<Mutex<DelegationAggregator>> {
        let agent_count = self.orchestrator.graph().agent_count();
        let aggregator = Arc::new(Mutex::new(DelegationAggregator::new(agent_count)));
        self.sessions
            .insert(session_id.to_string(), Arc::clone(&aggregator));

        let evicted: Vec<String> = {
            let mut recent = self.recent.lock();
            recent.retain(|id| id != session_id);
            recent.push_back(session_id.to_string());
            let excess = recent.len().saturating_sub(self.max_sessions);
            recent.drain(..excess).collect()
        };
        for id in evicted {
            self.sessions.remove(&id);
            log::debug!("[ORCHESTRATOR] Dropped idle session {}", id);
        }
        aggregator
    }

    /// Run one user message through the graph.
    ///
    /// Returns the session id in use and a stream of updates that ends after
    /// the final update.
    pub fn handle_message(
        &self,
        session_id: Option<&str>,
        message: &str,
        history: Vec<ChatTurn>,
    ) -> (String, mpsc::UnboundedReceiver<FrontendUpdate>) {
        let session_id = session_id
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let aggregator = self.start_run(&session_id);
        let run = RunContext::new(message, Some(&session_id));
        let (tx, rx) = mpsc::unbounded_channel();

        log::info!("[ORCHESTRATOR] Session {} query: {}", session_id, message);

        // Input locks immediately, before any agent is called
        {
            let agg = aggregator.lock();
            let mut chat = history.clone();
            chat.push(ChatTurn::new(message, ""));
            let _ = tx.send(FrontendUpdate {
                labels: Vec::new(),
                selected_label: None,
                delegations: Default::default(),
                delegation_log: String::new(),
                ..FrontendUpdate::from_aggregator(
                    &session_id,
                    &agg,
                    chat,
                    ProgressDisplay::idle(),
                    InputBoxState::busy(),
                )
            });
        }

        let events = self.orchestrator.run(&run);
        let session = session_id.clone();
        tokio::spawn(async move {
            relay(session, run, history, aggregator, events, tx).await;
        });

        (session_id, rx)
    }

    /// `(query, text)` for a label from the session's stored record
    pub fn select(&self, session_id: &str, label: &str) -> ChatTurn {
        let (query, text) = match self.sessions.get(session_id) {
            Some(aggregator) => aggregator.lock().render(label),
            None => DelegationAggregator::new(1).render(label),
        };
        ChatTurn::new(query, text)
    }
}

async fn relay(
    session_id: String,
    run: RunContext,
    history: Vec<ChatTurn>,
    aggregator: Arc<Mutex<DelegationAggregator>>,
    mut events: mpsc::UnboundedReceiver<OrchestrationEvent>,
    tx: mpsc::UnboundedSender<FrontendUpdate>,
) {
    let turn = |answer: &str| {
        let mut chat = history.clone();
        chat.push(ChatTurn::new(run.query.clone(), answer));
        chat
    };

    {
        let mut agg = aggregator.lock();
        agg.reset(&run.query);
        let _ = tx.send(FrontendUpdate::from_aggregator(
            &session_id,
            &agg,
            history.clone(),
            ProgressDisplay::running(&agg, PROCESSING_STATUS),
            InputBoxState::busy(),
        ));
    }

    let mut last_text = String::new();
    let mut final_answer: Option<String> = None;
    while let Some(event) = events.recv().await {
        match event {
            OrchestrationEvent::Delegate(DelegateEvent { author, event }) => {
                let mut agg = aggregator.lock();
                let label = author.label();
                let update = match &event {
                    TaskEvent::Working { message } => FrontendUpdate::from_aggregator(
                        &session_id,
                        &agg,
                        turn(&last_text),
                        ProgressDisplay::running(&agg, format!("{}: {}", label, message)),
                        InputBoxState::busy(),
                    ),
                    TaskEvent::Submitted => continue,
                    TaskEvent::Completed { .. } | TaskEvent::Failed { .. } => {
                        if agg.observe_event(&author, &event).is_some() {
                            last_text = event.text().unwrap_or_default().trim().to_string();
                        }
                        FrontendUpdate::from_aggregator(
                            &session_id,
                            &agg,
                            turn(&last_text),
                            ProgressDisplay::running(
                                &agg,
                                format!("Received Response from {}...", label),
                            ),
                            InputBoxState::busy(),
                        )
                    }
                };
                let _ = tx.send(update);
            }
            OrchestrationEvent::Finished { final_answer: answer } => {
                final_answer = Some(answer);
            }
            OrchestrationEvent::StageStarted { .. }
            | OrchestrationEvent::StageCompleted { .. } => {}
        }
    }

    let answer = match final_answer {
        Some(answer) if !answer.trim().is_empty() => answer,
        _ => NO_RESPONSE_PLACEHOLDER.to_string(),
    };
    let mut agg = aggregator.lock();
    agg.finish();
    let _ = tx.send(FrontendUpdate::from_aggregator(
        &session_id,
        &agg,
        turn(&answer),
        ProgressDisplay::done(&agg),
        InputBoxState::ready(),
    ));
    log::info!("[ORCHESTRATOR] Session {} answered", session_id);
}
