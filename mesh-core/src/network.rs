use async_trait::async_trait;
use crate::error::MeshError;
use shared::types::PeerId;
use std::fmt;

/// Process-local handle number for one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outbound half of a reliable, ordered connection to one peer.
///
/// `send` queues a complete frame and must not block.
pub trait Connection: Clone + Send + 'static {
    fn id(&self) -> ConnectionId;
    fn send(&self, frame: &str) -> Result<(), MeshError>;
}

pub enum PeerEvent<C> {
    Connected { connection: C, peer_id: PeerId },
    Frame { id: ConnectionId, bytes: Vec<u8> },
    Failed { id: ConnectionId, error: MeshError },
    Closed { id: ConnectionId },
}

#[async_trait]
pub trait Transport: Send {
    type Conn: Connection;

    /// Next connection event, or `None` once the transport has shut down.
    async fn next_event(&mut self) -> Option<PeerEvent<Self::Conn>>;
}
