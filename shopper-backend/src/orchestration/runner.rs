use super::{AgentIdentity, AgentRef, OrchestrationGraph, Stage};
use crate::a2a::TaskEvent;
use crate::context::RunContext;
use chrono::Utc;
use futures_util::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A lifecycle event tagged with the agent that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegateEvent {
    pub author: AgentIdentity,
    pub event: TaskEvent,
}

/// Terminal result of one agent within a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageOutput {
    pub identity: AgentIdentity,
    pub text: String,
    pub succeeded: bool,
}

impl StageOutput {
    fn from_terminal(identity: AgentIdentity, event: &TaskEvent) -> Self {
        Self {
            identity,
            text: event.text().unwrap_or_default().to_string(),
            succeeded: matches!(event, TaskEvent::Completed { .. }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestrationEvent {
    StageStarted {
        index: usize,
        agents: Vec<AgentIdentity>,
    },
    Delegate(DelegateEvent),
    StageCompleted {
        index: usize,
        outputs: Vec<StageOutput>,
    },
    /// Always the last event of a run
    Finished { final_answer: String },
}

/// Input for a stage after the first: the query plus every successful
/// delegate output so far, labelled per agent.
pub fn compose_stage_input(query: &str, outputs: &[StageOutput]) -> String {
    let sections: Vec<String> = outputs
        .iter()
        .filter(|o| o.succeeded && !o.text.trim().is_empty())
        .map(|o| format!("[{}]\n{}", o.identity.label(), o.text.trim()))
        .collect();

    if sections.is_empty() {
        format!("User query: {}\n\nDelegate outputs: none", query)
    } else {
        format!(
            "User query: {}\n\nDelegate outputs:\n\n{}",
            query,
            sections.join("\n\n")
        )
    }
}

/// Runs a graph stage by stage and streams what happens
#[derive(Clone)]
pub struct Orchestrator {
    graph: Arc<OrchestrationGraph>,
}

impl Orchestrator {
    pub fn new(graph: OrchestrationGraph) -> Self {
        Self {
            graph: Arc::new(graph),
        }
    }

    pub fn graph(&self) -> &OrchestrationGraph {
        &self.graph
    }

    pub fn run(&self, run: &RunContext) -> mpsc::UnboundedReceiver<OrchestrationEvent> {
        self.run_with_prior(run, Vec::new())
    }

    /// Start a run seeded with outputs from earlier stages.
    ///
    /// Events are delivered in arrival order; the receiver sees
    /// [`OrchestrationEvent::Finished`] last and then closes.
    pub fn run_with_prior(
        &self,
        run: &RunContext,
        prior: Vec<StageOutput>,
    ) -> mpsc::UnboundedReceiver<OrchestrationEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let graph = self.graph.clone();
        let run = run.clone();
        tokio::spawn(async move {
            drive(graph, run, prior, tx).await;
        });
        rx
    }
}

async fn drive(
    graph: Arc<OrchestrationGraph>,
    run: RunContext,
    prior: Vec<StageOutput>,
    tx: mpsc::UnboundedSender<OrchestrationEvent>,
) {
    log::info!(
        "[ORCHESTRATOR] Run {} of {} started: {}",
        run.run_id,
        graph.name(),
        run.query
    );

    let seeded = !prior.is_empty();
    let mut outputs = prior;
    let mut last_stage: Vec<StageOutput> = Vec::new();

    for (index, stage) in graph.stages().iter().enumerate() {
        let input = if index == 0 && !seeded {
            run.query.clone()
        } else {
            compose_stage_input(&run.query, &outputs)
        };

        let agents: Vec<AgentIdentity> =
            stage.members().iter().map(|a| a.identity.clone()).collect();
        let _ = tx.send(OrchestrationEvent::StageStarted {
            index,
            agents: agents.clone(),
        });
        log::info!(
            "[ORCHESTRATOR] Stage {} -> {}",
            index,
            agents
                .iter()
                .map(|a| a.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        for agent in stage.members() {
            log::debug!("[ORCHESTRATOR]   {}: {}", agent.identity, agent.description);
        }

        let results = run_stage(stage, &run.context_id, &input, &tx).await;
        if results.iter().all(|r| !r.succeeded) {
            log::warn!(
                "[ORCHESTRATOR] Every agent in stage {} failed, continuing with no contribution",
                index
            );
        }

        let _ = tx.send(OrchestrationEvent::StageCompleted {
            index,
            outputs: results.clone(),
        });
        outputs.extend(results.iter().cloned());
        last_stage = results;
    }

    let final_answer = last_stage
        .iter()
        .filter(|o| o.succeeded)
        .map(|o| o.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let elapsed = Utc::now() - run.started_at;
    log::info!(
        "[ORCHESTRATOR] Run {} finished in {}ms ({} chars)",
        run.run_id,
        elapsed.num_milliseconds(),
        final_answer.len()
    );
    let _ = tx.send(OrchestrationEvent::Finished { final_answer });
}

/// Run every member of a stage on its own task and wait for all of them
async fn run_stage(
    stage: &Stage,
    context_id: &str,
    input: &str,
    tx: &mpsc::UnboundedSender<OrchestrationEvent>,
) -> Vec<StageOutput> {
    let handles: Vec<_> = stage
        .members()
        .iter()
        .map(|agent| {
            let agent = agent.clone();
            let context_id = context_id.to_string();
            let input = input.to_string();
            let tx = tx.clone();
            let identity = agent.identity.clone();
            (
                identity,
                tokio::spawn(async move { run_member(agent, context_id, input, tx).await }),
            )
        })
        .collect();

    let (identities, joins): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
    join_all(joins)
        .await
        .into_iter()
        .zip(identities)
        .map(|(joined, identity)| match joined {
            Ok(output) => output,
            Err(e) => {
                log::error!("[ORCHESTRATOR] {} task aborted: {}", identity, e);
                let event = TaskEvent::failed(format!("Error: {} aborted", identity));
                let _ = tx.send(OrchestrationEvent::Delegate(DelegateEvent {
                    author: identity.clone(),
                    event: event.clone(),
                }));
                StageOutput::from_terminal(identity, &event)
            }
        })
        .collect()
}

/// Invoke one agent, forwarding its events as they arrive
async fn run_member(
    agent: AgentRef,
    context_id: String,
    input: String,
    tx: mpsc::UnboundedSender<OrchestrationEvent>,
) -> StageOutput {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let invoke = agent.invoker.invoke(&context_id, &input, events_tx);
    let forward = async {
        let mut terminal: Option<TaskEvent> = None;
        while let Some(event) = events_rx.recv().await {
            if terminal.is_some() {
                log::debug!("[ORCHESTRATOR] Dropping event after terminal from {}", agent.identity);
                continue;
            }
            if event.is_terminal() {
                terminal = Some(event.clone());
            }
            let _ = tx.send(OrchestrationEvent::Delegate(DelegateEvent {
                author: agent.identity.clone(),
                event,
            }));
        }
        terminal
    };

    let ((), terminal) = tokio::join!(invoke, forward);
    let terminal = terminal.unwrap_or_else(|| {
        let event = TaskEvent::failed(format!("Error: {} returned no result", agent.identity));
        let _ = tx.send(OrchestrationEvent::Delegate(DelegateEvent {
            author: agent.identity.clone(),
            event: event.clone(),
        }));
        event
    });

    StageOutput::from_terminal(agent.identity.clone(), &terminal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::ScriptedCapability;
    use crate::executor::TaskExecutor;
    use crate::orchestration::{AgentInvoker, LocalAgent};
    use async_trait::async_trait;
    use std::time::Duration;

    fn local(name: &str, capability: ScriptedCapability) -> AgentRef {
        let executor = Arc::new(TaskExecutor::new(name, Arc::new(capability)));
        AgentRef::new(
            AgentIdentity::new(name).unwrap(),
            "",
            Arc::new(LocalAgent::new(executor)),
        )
    }

    async fn collect(
        mut rx: mpsc::UnboundedReceiver<OrchestrationEvent>,
    ) -> Vec<OrchestrationEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn terminal_authors(events: &[OrchestrationEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                OrchestrationEvent::Delegate(d) if d.event.is_terminal() => {
                    Some(d.author.to_string())
                }
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_sequential_stage_receives_prior_outputs() {
        let graph = OrchestrationGraph::builder("g")
            .then(local("recommender", ScriptedCapability::answering("Galaxy F54")))
            .then(local("synth", ScriptedCapability::echoing("")))
            .build()
            .unwrap();
        let orchestrator = Orchestrator::new(graph);
        let events = collect(orchestrator.run(&RunContext::new("phones", None))).await;

        match events.last() {
            Some(OrchestrationEvent::Finished { final_answer }) => {
                assert!(final_answer.starts_with("User query: phones"));
                assert!(final_answer.contains("[Recommender]\nGalaxy F54"));
            }
            other => panic!("unexpected last event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_parallel_failure_does_not_block_sibling() {
        let graph = OrchestrationGraph::builder("g")
            .parallel(vec![
                local("a", ScriptedCapability::answering("X")),
                local("b", ScriptedCapability::failing("boom")),
            ])
            .build()
            .unwrap();
        let events = collect(Orchestrator::new(graph).run(&RunContext::new("q", None))).await;

        let outputs = events
            .iter()
            .find_map(|e| match e {
                OrchestrationEvent::StageCompleted { outputs, .. } => Some(outputs.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].text, "X");
        assert!(outputs[0].succeeded);
        assert_eq!(outputs[1].text, "Error: boom");
        assert!(!outputs[1].succeeded);
        assert!(matches!(
            events.last(),
            Some(OrchestrationEvent::Finished { final_answer }) if final_answer == "X"
        ));
    }

    #[tokio::test]
    async fn test_parallel_events_arrive_in_completion_order() {
        let graph = OrchestrationGraph::builder("g")
            .parallel(vec![
                local(
                    "slow",
                    ScriptedCapability::answering("late").with_delay(Duration::from_millis(300)),
                ),
                local("fast", ScriptedCapability::answering("early")),
            ])
            .build()
            .unwrap();
        let events = collect(Orchestrator::new(graph).run(&RunContext::new("q", None))).await;
        assert_eq!(terminal_authors(&events), vec!["fast", "slow"]);
    }

    #[tokio::test]
    async fn test_all_failed_stage_passes_empty_contribution() {
        let graph = OrchestrationGraph::builder("g")
            .parallel(vec![
                local("a", ScriptedCapability::failing("down")),
                local("b", ScriptedCapability::failing("down")),
            ])
            .then(local("synth", ScriptedCapability::echoing("")))
            .build()
            .unwrap();
        let events = collect(Orchestrator::new(graph).run(&RunContext::new("q", None))).await;
        assert!(matches!(
            events.last(),
            Some(OrchestrationEvent::Finished { final_answer })
                if final_answer == "User query: q\n\nDelegate outputs: none"
        ));
    }

    struct Silent;

    #[async_trait]
    impl AgentInvoker for Silent {
        async fn invoke(
            &self,
            _context_id: &str,
            _input: &str,
            events: mpsc::UnboundedSender<TaskEvent>,
        ) {
            let _ = events.send(TaskEvent::working("hmm"));
        }
    }

    #[tokio::test]
    async fn test_missing_terminal_event_is_synthesized() {
        let graph = OrchestrationGraph::builder("g")
            .then(AgentRef::new(
                AgentIdentity::new("silent").unwrap(),
                "",
                Arc::new(Silent),
            ))
            .build()
            .unwrap();
        let events = collect(Orchestrator::new(graph).run(&RunContext::new("q", None))).await;
        assert_eq!(terminal_authors(&events), vec!["silent"]);
    }

    #[test]
    fn test_compose_stage_input_skips_failures() {
        let outputs = vec![
            StageOutput {
                identity: AgentIdentity::new("price_tracker_agent").unwrap(),
                text: "F54: 22,999".into(),
                succeeded: true,
            },
            StageOutput {
                identity: AgentIdentity::new("review_analysis_agent").unwrap(),
                text: "Error: boom".into(),
                succeeded: false,
            },
        ];
        let input = compose_stage_input("Compare F54 and M34", &outputs);
        assert!(input.contains("[Price Tracker Agent]\nF54: 22,999"));
        assert!(!input.contains("boom"));
    }
}
