use serde::{Deserialize, Serialize};
use crate::types::{Task, TaskId};

/// Protocol envelope, encoded as `{"type": ..., "payload": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Message {
    TaskList(Vec<Task>),
    NewTask(Task),
    TaskUpdate(Task),
    Claim(TaskRef),
    Complete(TaskRef),
    Error(ErrorPayload),
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::TaskList(_) => "task_list",
            Message::NewTask(_) => "new_task",
            Message::TaskUpdate(_) => "task_update",
            Message::Claim(_) => "claim",
            Message::Complete(_) => "complete",
            Message::Error(_) => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskRef {
    pub task_id: TaskId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorPayload {
    pub message: String,
}
