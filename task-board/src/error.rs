use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TaskBoardError {
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task not available: {0}")]
    TaskNotAvailable(String),

    #[error("Task {task_id} is not claimed by {peer}")]
    NotClaimant { task_id: String, peer: String },

    #[error("{action} is not allowed for the {role} role")]
    WrongRole { action: &'static str, role: &'static str },

    #[error("Task title is empty")]
    EmptyTitle,
}
