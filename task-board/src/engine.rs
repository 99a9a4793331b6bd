//! Task synchronization protocol.
//!
//! The admin owns the authoritative store: it applies `claim` and
//! `complete` requests, answers failed claims with an `error` to the
//! requester, and broadcasts every successful transition. Workers only
//! mirror what the admin sends. Every new connection on the admin receives
//! a `task_list` snapshot addressed to that connection alone.

use crate::error::TaskBoardError;
use crate::store::TaskStore;
use mesh_core::{Broadcaster, Connection, ConnectionId, ConnectionRegistry, PeerEvent};
use shared::codec;
use shared::messages::{ErrorPayload, Message, TaskRef};
use shared::types::{PeerId, Task, TaskId};
use std::fmt;
use tracing::{debug, info, warn};

pub const TASK_NOT_AVAILABLE: &str = "Task not available";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Worker,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Worker => "worker",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something the operator should see after an event was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    PeerJoined(PeerId),
    PeerLeft(PeerId),
    Claimed(Task),
    Completed(Task),
    Synced(usize),
    Updated(Task),
    Posted(Task),
    Rejected(String),
}

impl Notice {
    /// Whether the board changed and should be shown again.
    pub fn changes_board(&self) -> bool {
        !matches!(self, Notice::PeerJoined(_) | Notice::PeerLeft(_) | Notice::Rejected(_))
    }
}

pub struct ProtocolEngine<C: Connection> {
    role: Role,
    store: TaskStore,
    registry: ConnectionRegistry<C>,
}

impl<C: Connection> ProtocolEngine<C> {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            store: TaskStore::new(),
            registry: ConnectionRegistry::new(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn registry(&self) -> &ConnectionRegistry<C> {
        &self.registry
    }

    pub fn handle_event(&mut self, event: PeerEvent<C>) -> Option<Notice> {
        match event {
            PeerEvent::Connected { connection, peer_id } => self.on_connect(connection, peer_id),
            PeerEvent::Frame { id, bytes } => self.on_frame(id, &bytes),
            PeerEvent::Failed { id, error } => {
                warn!("Connection error on {}: {}", id, error);
                self.on_disconnect(id)
            }
            PeerEvent::Closed { id } => self.on_disconnect(id),
        }
    }

    pub fn on_connect(&mut self, connection: C, peer_id: PeerId) -> Option<Notice> {
        if !self.registry.register(connection.clone(), peer_id.clone()) {
            return None;
        }
        info!("Peer connected: {} ({})", peer_id, connection.id());

        if self.role == Role::Admin {
            let snapshot = Message::TaskList(self.store.snapshot());
            if let Err(e) = Broadcaster::send_to(&connection, &snapshot) {
                warn!("Failed to send task list to {}: {}", peer_id, e);
            }
        }
        Some(Notice::PeerJoined(peer_id))
    }

    pub fn on_disconnect(&mut self, id: ConnectionId) -> Option<Notice> {
        let peer_id = self.registry.unregister(id)?;
        info!("Peer disconnected: {} ({})", peer_id, id);
        Some(Notice::PeerLeft(peer_id))
    }

    /// Decodes and dispatches one inbound frame. Malformed frames and
    /// frames from unknown connections are dropped.
    pub fn on_frame(&mut self, id: ConnectionId, bytes: &[u8]) -> Option<Notice> {
        let Some(peer_id) = self.registry.peer_id(id).cloned() else {
            debug!("Dropping frame from unregistered connection {}", id);
            return None;
        };
        let message = match codec::decode(bytes) {
            Ok(message) => message,
            Err(e) => {
                debug!("Dropping frame from {}: {}", peer_id, e);
                return None;
            }
        };

        match self.role {
            Role::Admin => self.handle_admin(id, peer_id, message),
            Role::Worker => self.handle_worker(peer_id, message),
        }
    }

    fn handle_admin(&mut self, id: ConnectionId, peer_id: PeerId, message: Message) -> Option<Notice> {
        match message {
            Message::Claim(TaskRef { task_id }) => match self.store.claim(&task_id, &peer_id) {
                Ok(task) => {
                    info!("Task \"{}\" claimed by {}", task.title, peer_id);
                    Broadcaster::broadcast(&self.registry, &Message::TaskUpdate(task.clone()));
                    Some(Notice::Claimed(task))
                }
                Err(e) => {
                    debug!("Rejecting claim from {}: {}", peer_id, e);
                    self.reply_error(id, TASK_NOT_AVAILABLE);
                    None
                }
            },
            Message::Complete(TaskRef { task_id }) => match self.store.complete(&task_id, &peer_id) {
                Ok(task) => {
                    info!("Task \"{}\" completed by {}", task.title, peer_id);
                    Broadcaster::broadcast(&self.registry, &Message::TaskUpdate(task.clone()));
                    Some(Notice::Completed(task))
                }
                Err(e) => {
                    debug!("Ignoring completion from {}: {}", peer_id, e);
                    None
                }
            },
            Message::TaskList(_) | Message::NewTask(_) | Message::TaskUpdate(_) | Message::Error(_) => {
                debug!("Admin ignoring {} from {}", message.kind(), peer_id);
                None
            }
        }
    }

    fn handle_worker(&mut self, peer_id: PeerId, message: Message) -> Option<Notice> {
        match message {
            Message::TaskList(tasks) => {
                let count = tasks.len();
                for task in tasks {
                    self.store.mirror(task);
                }
                info!("Task board received from {}: {} task(s)", peer_id, count);
                Some(Notice::Synced(count))
            }
            Message::TaskUpdate(task) => {
                info!("Task updated: {} -> {}", task.id, task.status);
                self.store.mirror(task.clone());
                Some(Notice::Updated(task))
            }
            Message::NewTask(task) => {
                info!("New task posted: \"{}\"", task.title);
                self.store.mirror(task.clone());
                Some(Notice::Posted(task))
            }
            Message::Error(ErrorPayload { message }) => {
                warn!("Request rejected by {}: {}", peer_id, message);
                Some(Notice::Rejected(message))
            }
            Message::Claim(_) | Message::Complete(_) => {
                debug!("Worker ignoring {} from {}", message.kind(), peer_id);
                None
            }
        }
    }

    fn reply_error(&self, id: ConnectionId, message: &str) {
        let Some(connection) = self.registry.get(id) else {
            return;
        };
        let reply = Message::Error(ErrorPayload { message: message.to_string() });
        if let Err(e) = Broadcaster::send_to(connection, &reply) {
            warn!("Failed to send error to {}: {}", id, e);
        }
    }

    /// PostTask. Admin only.
    pub fn post_task(&mut self, title: &str, description: &str) -> Result<Task, TaskBoardError> {
        self.require(Role::Admin, "post")?;
        let title = title.trim();
        if title.is_empty() {
            return Err(TaskBoardError::EmptyTitle);
        }

        let task = self.store.create(title.to_string(), description.trim().to_string());
        Broadcaster::broadcast(&self.registry, &Message::NewTask(task.clone()));
        Ok(task)
    }

    /// ClaimTask. Worker only; the request goes to every peer and the local
    /// mirror is left alone until the admin answers.
    pub fn claim_task(&self, task_id: TaskId) -> Result<usize, TaskBoardError> {
        self.require(Role::Worker, "claim")?;
        Ok(Broadcaster::broadcast(&self.registry, &Message::Claim(TaskRef { task_id })))
    }

    /// CompleteTask. Worker only.
    pub fn complete_task(&self, task_id: TaskId) -> Result<usize, TaskBoardError> {
        self.require(Role::Worker, "complete")?;
        Ok(Broadcaster::broadcast(&self.registry, &Message::Complete(TaskRef { task_id })))
    }

    /// ListTasks.
    pub fn list_tasks(&self) -> Vec<&Task> {
        self.store.list()
    }

    fn require(&self, role: Role, action: &'static str) -> Result<(), TaskBoardError> {
        if self.role == role {
            Ok(())
        } else {
            Err(TaskBoardError::WrongRole { action, role: self.role.as_str() })
        }
    }
}
