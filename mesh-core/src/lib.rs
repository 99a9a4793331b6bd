pub mod network;
pub mod registry;
pub mod broadcast;
pub mod tcp;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod error;

pub use broadcast::Broadcaster;
pub use error::MeshError;
pub use network::{Connection, ConnectionId, PeerEvent, Transport};
pub use registry::ConnectionRegistry;
pub use tcp::{TcpConfig, TcpConnection, TcpTransport};
