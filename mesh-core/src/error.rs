use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeshError {
    #[error("Connection closed: {0}")]
    ConnectionClosed(u64),

    #[error("Outbound queue full on connection {0}")]
    QueueFull(u64),

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    Codec(#[from] shared::CodecError),
}
