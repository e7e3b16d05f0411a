use crate::a2a::{Task, TaskError, TaskEvent};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;

/// Terminal tasks kept around for `tasks/get` before the oldest is dropped
pub const DEFAULT_MAX_TERMINAL_TASKS: usize = 200;

/// In-memory task store for one executor.
///
/// Live tasks are never evicted. Terminal tasks are retained in completion
/// order and the oldest is dropped once more than `max_terminal` exist.
pub struct InMemoryTaskStore {
    tasks: DashMap<String, Task>,
    terminal_order: Mutex<VecDeque<String>>,
    max_terminal: usize,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_TERMINAL_TASKS)
    }

    pub fn with_capacity(max_terminal: usize) -> Self {
        Self {
            tasks: DashMap::new(),
            terminal_order: Mutex::new(VecDeque::new()),
            max_terminal: max_terminal.max(1),
        }
    }

    /// Register a task in the `submitted` state.
    ///
    /// Returns `Ok(true)` when the task is new and `Ok(false)` when a live
    /// task with the same id already exists. A finished task id cannot be
    /// reused.
    pub fn create(&self, task_id: &str, context_id: &str) -> Result<bool, TaskError> {
        match self.tasks.entry(task_id.to_string()) {
            Entry::Occupied(existing) if existing.get().state.is_terminal() => {
                Err(TaskError::InvalidParams(format!(
                    "task {} already finished as {}",
                    task_id,
                    existing.get().state
                )))
            }
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(Task::new(task_id, context_id));
                Ok(true)
            }
        }
    }

    pub fn apply(&self, task_id: &str, event: &TaskEvent) -> Result<(), TaskError> {
        let finished = {
            let mut task = self
                .tasks
                .get_mut(task_id)
                .ok_or_else(|| TaskError::TaskNotFound(task_id.to_string()))?;
            task.apply(event)?;
            task.state.is_terminal()
        };

        if finished {
            self.retire(task_id);
        }
        Ok(())
    }

    pub fn get(&self, task_id: &str) -> Option<Task> {
        self.tasks.get(task_id).map(|t| t.clone())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn retire(&self, task_id: &str) {
        let evicted: Vec<String> = {
            let mut order = self.terminal_order.lock();
            order.push_back(task_id.to_string());
            let excess = order.len().saturating_sub(self.max_terminal);
            order.drain(..excess).collect()
        };
        for id in evicted {
            self.tasks.remove(&id);
            log::debug!("[EXECUTOR] Evicted finished task {}", id);
        }
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-conversation bookkeeping
#[derive(Debug, Clone, Serialize)]
pub struct SessionData {
    pub context_id: String,
    pub query_count: u32,
    pub last_query: String,
    pub updated_at: DateTime<Utc>,
}

/// Per-context sessions kept before the least recently used is dropped
pub const DEFAULT_MAX_SESSIONS: usize = 200;

pub struct SessionStore {
    sessions: DashMap<String, SessionData>,
    recent: Mutex<VecDeque<String>>,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_SESSIONS)
    }

    pub fn with_capacity(max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            recent: Mutex::new(VecDeque::new()),
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn record_query(&self, context_id: &str, query: &str) -> SessionData {
        let data = {
            let mut entry = self
                .sessions
                .entry(context_id.to_string())
                .or_insert_with(|| SessionData {
                    context_id: context_id.to_string(),
                    query_count: 0,
                    last_query: String::new(),
                    updated_at: Utc::now(),
                });
            entry.query_count += 1;
            entry.last_query = query.to_string();
            entry.updated_at = Utc::now();
            entry.clone()
        };

        let evicted: Vec<String> = {
            let mut recent = self.recent.lock();
            recent.retain(|id| id != context_id);
            recent.push_back(context_id.to_string());
            let excess = recent.len().saturating_sub(self.max_sessions);
            recent.drain(..excess).collect()
        };
        for id in evicted {
            self.sessions.remove(&id);
            log::debug!("[EXECUTOR] Dropped idle session {}", id);
        }
        data
    }

    pub fn get(&self, context_id: &str) -> Option<SessionData> {
        self.sessions.get(context_id).map(|s| s.clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
