use super::store::InMemoryTaskStore;
use super::EventQueue;
use crate::a2a::{TaskError, TaskEvent, TaskUpdate};
use std::sync::Arc;

/// Moves one task through its lifecycle.
///
/// Each event is applied to the store first and only enqueued once the
/// transition is accepted, so a rejected event never reaches a listener.
pub struct TaskUpdater {
    task_id: String,
    context_id: String,
    store: Arc<InMemoryTaskStore>,
    queue: EventQueue,
}

impl TaskUpdater {
    pub fn new(
        task_id: impl Into<String>,
        context_id: impl Into<String>,
        store: Arc<InMemoryTaskStore>,
        queue: EventQueue,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            context_id: context_id.into(),
            store,
            queue,
        }
    }

    /// Announce a task the store just created
    pub fn submit(&self) {
        self.enqueue(TaskEvent::Submitted);
    }

    pub fn start_work(&self, message: impl Into<String>) -> Result<(), TaskError> {
        self.emit(TaskEvent::working(message))
    }

    pub fn progress(&self, message: impl Into<String>) -> Result<(), TaskError> {
        self.emit(TaskEvent::working(message))
    }

    pub fn complete(&self, text: impl Into<String>) -> Result<(), TaskError> {
        self.emit(TaskEvent::completed(&self.task_id, text))
    }

    pub fn fail(&self, error: impl Into<String>) -> Result<(), TaskError> {
        self.emit(TaskEvent::failed(error))
    }

    fn emit(&self, event: TaskEvent) -> Result<(), TaskError> {
        self.store.apply(&self.task_id, &event)?;
        self.enqueue(event);
        Ok(())
    }

    fn enqueue(&self, event: TaskEvent) {
        let update = TaskUpdate {
            task_id: self.task_id.clone(),
            context_id: self.context_id.clone(),
            event,
        };
        if self.queue.send(update).is_err() {
            log::debug!(
                "[EXECUTOR] No listener for task {}, event kept in store only",
                self.task_id
            );
        }
    }
}
