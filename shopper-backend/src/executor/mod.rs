//! Task executor: turns one free-form query into lifecycle events

pub mod store;
pub mod updater;

pub use store::{InMemoryTaskStore, SessionData, SessionStore};
pub use updater::TaskUpdater;

use crate::a2a::{Task, TaskError, TaskRequest, TaskUpdate, ValidatedRequest};
use crate::capabilities::{Capability, CapabilityRequest};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Outgoing side of an executor's event queue
pub type EventQueue = mpsc::UnboundedSender<TaskUpdate>;

/// A validated request whose task is registered in the store
#[derive(Debug, Clone)]
pub struct AdmittedTask {
    pub request: ValidatedRequest,
    /// False when the task id was already live, so no second `submitted`
    pub created: bool,
}

pub struct TaskExecutor {
    name: String,
    capability: Arc<dyn Capability>,
    tasks: Arc<InMemoryTaskStore>,
    sessions: SessionStore,
}

impl TaskExecutor {
    pub fn new(name: impl Into<String>, capability: Arc<dyn Capability>) -> Self {
        Self {
            name: name.into(),
            capability,
            tasks: Arc::new(InMemoryTaskStore::new()),
            sessions: SessionStore::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tasks(&self) -> &InMemoryTaskStore {
        &self.tasks
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Validate a request and register its task.
    ///
    /// Fails before any state transition when the request is malformed or
    /// names a task that already finished.
    pub fn admit(&self, request: &TaskRequest) -> Result<AdmittedTask, TaskError> {
        let request = request.validate().inspect_err(|e| {
            log::warn!("[EXECUTOR] {} rejected request: {}", self.name, e);
        })?;
        let created = self.tasks.create(&request.task_id, &request.context_id)?;
        Ok(AdmittedTask { request, created })
    }

    /// Drive an admitted task to a terminal state.
    ///
    /// Capability errors are recovered here as a `failed` event; the only
    /// error returned is a rejected transition, which means another run
    /// already finished the same task.
    pub async fn run(&self, admitted: AdmittedTask, queue: EventQueue) -> Result<(), TaskError> {
        let AdmittedTask { request, created } = admitted;
        let updater = TaskUpdater::new(
            &request.task_id,
            &request.context_id,
            self.tasks.clone(),
            queue,
        );

        if created {
            updater.submit();
        }
        updater.start_work(self.capability.processing_message())?;
        self.sessions.record_query(&request.context_id, &request.query);

        log::info!(
            "[EXECUTOR] {} working on task {} (context {})",
            self.name,
            request.task_id,
            request.context_id
        );

        let capability = self.capability.clone();
        let capability_request = CapabilityRequest::new(&request.query, &request.context_id);
        let (chunk_tx, mut chunk_rx) = mpsc::unbounded_channel();

        let produce = async move {
            // chunk_tx is dropped when the call returns, which ends the consumer loop
            capability.stream(&capability_request, &chunk_tx).await
        };
        let consume = async {
            let mut final_text: Option<String> = None;
            while let Some(chunk) = chunk_rx.recv().await {
                if final_text.is_some() {
                    log::debug!("[EXECUTOR] Ignoring chunk after final answer");
                    continue;
                }
                if chunk.is_final {
                    final_text = Some(chunk.text);
                } else {
                    updater.progress(chunk.text)?;
                }
            }
            Ok::<_, TaskError>(final_text)
        };

        let (outcome, final_text) = tokio::join!(produce, consume);
        let final_text = final_text?;

        match (outcome, final_text) {
            (Ok(()), Some(text)) => {
                log::info!("[EXECUTOR] {} completed task {}", self.name, request.task_id);
                updater.complete(text)
            }
            (Ok(()), None) => {
                log::warn!(
                    "[EXECUTOR] {} finished task {} without a final answer",
                    self.name,
                    request.task_id
                );
                updater.fail("Error: agent returned no final answer")
            }
            (Err(e), _) => {
                log::error!(
                    "[EXECUTOR] {} failed task {}: {}",
                    self.name,
                    request.task_id,
                    e
                );
                updater.fail(format!("Error: {}", e))
            }
        }
    }

    /// Admit and run a request, returning the final task snapshot
    pub async fn execute(
        &self,
        request: &TaskRequest,
        queue: EventQueue,
    ) -> Result<Task, TaskError> {
        let admitted = self.admit(request)?;
        let task_id = admitted.request.task_id.clone();
        self.run(admitted, queue).await?;
        self.get_task(&task_id)
    }

    pub fn get_task(&self, task_id: &str) -> Result<Task, TaskError> {
        self.tasks
            .get(task_id)
            .ok_or_else(|| TaskError::TaskNotFound(task_id.to_string()))
    }

    /// Cancellation is refused for every task, known or not.
    pub fn cancel(&self, task_id: Option<&str>) -> Result<Task, TaskError> {
        log::info!(
            "[EXECUTOR] {} refused cancel for task {}",
            self.name,
            task_id.unwrap_or("<none>")
        );
        Err(TaskError::UnsupportedOperation(
            "Task cancellation is not supported".to_string(),
        ))
    }
}
