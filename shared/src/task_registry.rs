/// Process-wide task registry.
///
/// Holds one record per task id behind a tokio Mutex. Each download has a
/// single driver that delivers `TaskEvent`s through `apply`, so a record has
/// exactly one writer while readers take snapshots.
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use chrono::Utc;

use crate::models::{Task, TaskEvent};

#[derive(Clone, Default)]
pub struct TaskRegistry {
    tasks: Arc<Mutex<HashMap<String, Task>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. Returns false if the id is already tracked.
    pub async fn insert(&self, task: Task) -> bool {
        let mut tasks = self.tasks.lock().await;
        if tasks.contains_key(&task.id) {
            warn!("Task {} already registered", task.id);
            return false;
        }
        info!("Task {} registered", task.id);
        tasks.insert(task.id.clone(), task);
        true
    }

    /// Snapshot of a task's current state.
    pub async fn get(&self, task_id: &str) -> Option<Task> {
        self.tasks.lock().await.get(task_id).cloned()
    }

    /// Deliver an event to a task. Returns false if the task is unknown or
    /// already terminal.
    pub async fn apply(&self, task_id: &str, event: TaskEvent) -> bool {
        let mut tasks = self.tasks.lock().await;
        match tasks.get_mut(task_id) {
            Some(task) => {
                let applied = task.apply(event);
                if applied && task.status.is_terminal() {
                    info!("Task {} reached terminal state: {}", task_id, task.status);
                }
                applied
            }
            None => {
                debug!("Dropping event for unknown task {}", task_id);
                false
            }
        }
    }

    /// Remove terminal tasks that finished more than `max_age_secs` ago.
    /// Returns the number of records removed. An age too large to represent
    /// as a timestamp evicts nothing.
    pub async fn evict_terminal(&self, max_age_secs: i64) -> usize {
        let cutoff = match chrono::Duration::try_seconds(max_age_secs)
            .and_then(|age| Utc::now().checked_sub_signed(age))
        {
            Some(cutoff) => cutoff,
            None => {
                debug!("Eviction age {}s out of range, keeping all tasks", max_age_secs);
                return 0;
            }
        };
        let mut tasks = self.tasks.lock().await;
        let before = tasks.len();
        tasks.retain(|_, t| match t.finished_at {
            Some(finished) if t.status.is_terminal() => finished > cutoff,
            _ => true,
        });
        before - tasks.len()
    }

    pub async fn len(&self) -> usize {
        self.tasks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.lock().await.is_empty()
    }
}
