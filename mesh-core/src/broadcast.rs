use crate::error::MeshError;
use crate::network::Connection;
use crate::registry::ConnectionRegistry;
use shared::codec;
use shared::messages::Message;
use tracing::{debug, warn};

/// Fan-out of protocol messages over the registry's live connections.
pub struct Broadcaster;

impl Broadcaster {
    /// Sends `message` to every connection registered at call time and
    /// returns how many accepted it. A failing connection is skipped.
    pub fn broadcast<C: Connection>(registry: &ConnectionRegistry<C>, message: &Message) -> usize {
        let frame = match codec::encode(message) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to encode {} for broadcast: {}", message.kind(), e);
                return 0;
            }
        };

        let mut delivered = 0;
        for connection in registry.all() {
            match connection.send(&frame) {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Broadcast of {} to {} failed: {}", message.kind(), connection.id(), e),
            }
        }
        debug!("Broadcast {} to {} peer(s)", message.kind(), delivered);
        delivered
    }

    pub fn send_to<C: Connection>(connection: &C, message: &Message) -> Result<(), MeshError> {
        let frame = codec::encode(message)?;
        connection.send(&frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingConnection;
    use shared::messages::TaskRef;
    use shared::types::{PeerId, TaskId};

    fn claim() -> Message {
        Message::Claim(TaskRef { task_id: TaskId::new("task-1-1") })
    }

    #[test]
    fn reaches_every_live_connection() {
        let mut registry = ConnectionRegistry::new();
        let a = RecordingConnection::new(1);
        let b = RecordingConnection::new(2);
        registry.register(a.clone(), PeerId::new("a"));
        registry.register(b.clone(), PeerId::new("b"));

        assert_eq!(Broadcaster::broadcast(&registry, &claim()), 2);
        assert_eq!(a.messages(), vec![claim()]);
        assert_eq!(b.messages(), vec![claim()]);
    }

    #[test]
    fn failing_connection_does_not_stop_fan_out() {
        let mut registry = ConnectionRegistry::new();
        let broken = RecordingConnection::new(1);
        let healthy = RecordingConnection::new(2);
        broken.close();
        registry.register(broken, PeerId::new("a"));
        registry.register(healthy.clone(), PeerId::new("b"));

        assert_eq!(Broadcaster::broadcast(&registry, &claim()), 1);
        assert_eq!(healthy.messages().len(), 1);
    }

    #[test]
    fn empty_registry_sends_nothing() {
        let registry: ConnectionRegistry<RecordingConnection> = ConnectionRegistry::new();
        assert_eq!(Broadcaster::broadcast(&registry, &claim()), 0);
    }
}
