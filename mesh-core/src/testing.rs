//! In-memory connection used by tests across the workspace.

use crate::error::MeshError;
use crate::network::{Connection, ConnectionId};
use shared::codec;
use shared::messages::Message;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct RecordingConnection {
    id: ConnectionId,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl RecordingConnection {
    pub fn new(id: u64) -> Self {
        Self {
            id: ConnectionId(id),
            sent: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Makes every later `send` fail.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn frames(&self) -> Vec<String> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// Decoded messages, oldest first. Panics on a frame that does not decode.
    pub fn messages(&self) -> Vec<Message> {
        self.frames()
            .iter()
            .map(|frame| codec::decode(frame.as_bytes()).expect("recorded frame decodes"))
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }
}

impl Connection for RecordingConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn send(&self, frame: &str) -> Result<(), MeshError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(MeshError::ConnectionClosed(self.id.0));
        }
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| MeshError::ConnectionClosed(self.id.0))?;
        sent.push(frame.to_string());
        Ok(())
    }
}
