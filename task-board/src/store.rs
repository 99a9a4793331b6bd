use crate::error::TaskBoardError;
use chrono::Utc;
use shared::types::{PeerId, Task, TaskId, TaskStatus};
use std::collections::HashMap;
use tracing::info;

/// In-memory task table. On the admin it is authoritative; on a worker it
/// is a mirror that incoming updates overwrite.
pub struct TaskStore {
    tasks: HashMap<TaskId, Task>,
    order: Vec<TaskId>,
    created: u64,
}

impl TaskStore {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            order: Vec::new(),
            created: 0,
        }
    }

    /// Creates an open task. Ids combine a per-process counter with the
    /// creation time, so they are never handed out twice.
    pub fn create(&mut self, title: String, description: String) -> Task {
        self.created += 1;
        let id = TaskId::new(format!("task-{}-{}", self.created, Utc::now().timestamp_millis()));
        let task = Task::open(id.clone(), title, description);

        self.order.push(id.clone());
        self.tasks.insert(id, task.clone());

        info!("Created task: {}", task.id);
        task
    }

    pub fn get(&self, task_id: &TaskId) -> Option<&Task> {
        self.tasks.get(task_id)
    }

    /// `Open -> Claimed`.
    pub fn claim(&mut self, task_id: &TaskId, peer: &PeerId) -> Result<Task, TaskBoardError> {
        match self.tasks.get_mut(task_id) {
            Some(task) if task.status == TaskStatus::Open => {
                task.status = TaskStatus::Claimed;
                task.claimed_by = Some(peer.clone());
                Ok(task.clone())
            }
            Some(_) => Err(TaskBoardError::TaskNotAvailable(task_id.to_string())),
            None => Err(TaskBoardError::TaskNotFound(task_id.to_string())),
        }
    }

    /// `Claimed -> Done`, only for the peer holding the claim.
    pub fn complete(&mut self, task_id: &TaskId, peer: &PeerId) -> Result<Task, TaskBoardError> {
        let task = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| TaskBoardError::TaskNotFound(task_id.to_string()))?;

        if task.status == TaskStatus::Claimed && task.claimed_by.as_ref() == Some(peer) {
            task.status = TaskStatus::Done;
            task.completed_at = Some(Utc::now());
            Ok(task.clone())
        } else {
            Err(TaskBoardError::NotClaimant {
                task_id: task_id.to_string(),
                peer: peer.to_string(),
            })
        }
    }

    /// Overwrites the local copy with the admin's version.
    pub fn mirror(&mut self, task: Task) {
        if !self.tasks.contains_key(&task.id) {
            self.order.push(task.id.clone());
        }
        self.tasks.insert(task.id.clone(), task);
    }

    /// Tasks in the order they were first seen.
    pub fn list(&self) -> Vec<&Task> {
        self.order.iter().filter_map(|id| self.tasks.get(id)).collect()
    }

    pub fn snapshot(&self) -> Vec<Task> {
        self.list().into_iter().cloned().collect()
    }

    pub fn stats(&self) -> HashMap<TaskStatus, usize> {
        let mut stats = HashMap::new();
        for task in self.tasks.values() {
            *stats.entry(task.status).or_insert(0) += 1;
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}
