//! TCP transport with newline-delimited frames.
//!
//! Every connection starts with both sides writing their identity as the
//! first line. After that each line is one protocol frame. Reader tasks
//! feed a single event channel; writes go through a per-connection queue
//! drained by its own task.

use async_trait::async_trait;
use crate::error::MeshError;
use crate::network::{Connection, ConnectionId, PeerEvent, Transport};
use futures::{SinkExt, StreamExt};
use shared::types::PeerId;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct TcpConfig {
    pub max_frame_bytes: usize,
    pub handshake_timeout: Duration,
    pub connect_retry: Duration,
    /// Frames queued per connection before the peer counts as stalled.
    pub outbound_capacity: usize,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: 1024 * 1024,
            handshake_timeout: Duration::from_secs(5),
            connect_retry: Duration::from_secs(1),
            outbound_capacity: 1024,
        }
    }
}

#[derive(Clone)]
pub struct TcpConnection {
    id: ConnectionId,
    outbound: mpsc::Sender<String>,
    stalled: CancellationToken,
}

impl Connection for TcpConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn send(&self, frame: &str) -> Result<(), MeshError> {
        match self.outbound.try_send(frame.to_string()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.stalled.cancel();
                Err(MeshError::QueueFull(self.id.0))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(MeshError::ConnectionClosed(self.id.0)),
        }
    }
}

#[derive(Clone)]
struct Shared {
    identity: Arc<str>,
    config: TcpConfig,
    events: mpsc::UnboundedSender<PeerEvent<TcpConnection>>,
    next_id: Arc<AtomicU64>,
}

pub struct TcpTransport {
    shared: Shared,
    events_rx: mpsc::UnboundedReceiver<PeerEvent<TcpConnection>>,
}

impl TcpTransport {
    pub fn new(config: TcpConfig) -> Self {
        let (events, events_rx) = mpsc::unbounded_channel();
        let identity: Arc<str> = Uuid::new_v4().simple().to_string().into();
        Self {
            shared: Shared {
                identity,
                config,
                events,
                next_id: Arc::new(AtomicU64::new(1)),
            },
            events_rx,
        }
    }

    /// Display form of the identity this process announces to peers.
    pub fn peer_id(&self) -> PeerId {
        PeerId::from_identity(&self.shared.identity)
    }

    /// Binds `addr` and accepts peers in the background.
    pub async fn listen(&self, addr: &str) -> Result<SocketAddr, MeshError> {
        let listener = TcpListener::bind(addr).await?;
        let local = listener.local_addr()?;
        info!("Listening for peers on {}", local);

        let shared = self.shared.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, remote)) => {
                        debug!("Accepted socket from {}", remote);
                        tokio::spawn(handle_stream(stream, shared.clone()));
                    }
                    Err(e) => warn!("Accept failed: {}", e),
                }
            }
        });

        Ok(local)
    }

    /// Dials `addr` in the background and redials whenever the session
    /// ends, until the transport itself is dropped.
    pub fn connect(&self, addr: String) {
        let shared = self.shared.clone();
        tokio::spawn(async move {
            while !shared.events.is_closed() {
                match TcpStream::connect(&addr).await {
                    Ok(stream) => {
                        debug!("Connected socket to {}", addr);
                        handle_stream(stream, shared.clone()).await;
                        info!("Session with {} ended; redialing", addr);
                    }
                    Err(e) => debug!("Dial {} failed: {}; retrying", addr, e),
                }
                tokio::time::sleep(shared.config.connect_retry).await;
            }
        });
    }
}

#[async_trait]
impl Transport for TcpTransport {
    type Conn = TcpConnection;

    async fn next_event(&mut self) -> Option<PeerEvent<TcpConnection>> {
        self.events_rx.recv().await
    }
}

async fn handle_stream(stream: TcpStream, shared: Shared) {
    let (read_half, write_half) = stream.into_split();
    let mut reader = FramedRead::new(
        read_half,
        LinesCodec::new_with_max_length(shared.config.max_frame_bytes),
    );
    let mut writer = FramedWrite::new(
        write_half,
        LinesCodec::new_with_max_length(shared.config.max_frame_bytes),
    );

    let peer_id = match handshake(&mut reader, &mut writer, &shared).await {
        Ok(peer_id) => peer_id,
        Err(e) => {
            warn!("Dropping socket: {}", e);
            return;
        }
    };

    let id = ConnectionId(shared.next_id.fetch_add(1, Ordering::SeqCst));
    let (outbound, mut outbound_rx) = mpsc::channel::<String>(shared.config.outbound_capacity.max(1));
    let stalled = CancellationToken::new();

    let writer_stalled = stalled.clone();
    tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                _ = writer_stalled.cancelled() => break,
                frame = outbound_rx.recv() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
            };
            if let Err(e) = writer.send(frame).await {
                debug!("Write to {} failed: {}", id, e);
                break;
            }
        }
    });

    let connection = TcpConnection { id, outbound, stalled: stalled.clone() };
    if shared.events.send(PeerEvent::Connected { connection, peer_id }).is_err() {
        return;
    }

    // After a decode error the framed stream yields a single `None` and
    // then resumes reading.
    let mut resuming = false;
    loop {
        let next = tokio::select! {
            _ = stalled.cancelled() => {
                warn!("Peer on {} stopped reading; dropping connection", id);
                let _ = shared.events.send(PeerEvent::Failed { id, error: MeshError::QueueFull(id.0) });
                break;
            }
            next = reader.next() => next,
        };
        let event = match next {
            Some(Ok(line)) => {
                resuming = false;
                PeerEvent::Frame { id, bytes: line.into_bytes() }
            }
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                debug!("Discarding oversized frame from {}", id);
                resuming = true;
                continue;
            }
            Some(Err(LinesCodecError::Io(e))) => {
                let _ = shared.events.send(PeerEvent::Failed { id, error: e.into() });
                break;
            }
            None if resuming => {
                resuming = false;
                continue;
            }
            None => break,
        };
        if shared.events.send(event).is_err() {
            return;
        }
    }

    let _ = shared.events.send(PeerEvent::Closed { id });
}

async fn handshake(
    reader: &mut FramedRead<tokio::net::tcp::OwnedReadHalf, LinesCodec>,
    writer: &mut FramedWrite<tokio::net::tcp::OwnedWriteHalf, LinesCodec>,
    shared: &Shared,
) -> Result<PeerId, MeshError> {
    writer
        .send(shared.identity.to_string())
        .await
        .map_err(|e| MeshError::Handshake(e.to_string()))?;

    let line = match tokio::time::timeout(shared.config.handshake_timeout, reader.next()).await {
        Err(_) => return Err(MeshError::Handshake("timed out".to_string())),
        Ok(None) => return Err(MeshError::Handshake("peer hung up".to_string())),
        Ok(Some(Err(e))) => return Err(MeshError::Handshake(e.to_string())),
        Ok(Some(Ok(line))) => line,
    };

    let identity = line.trim();
    if identity.is_empty() || !identity.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(MeshError::Handshake(format!("invalid identity {:?}", identity)));
    }
    Ok(PeerId::from_identity(identity))
}
