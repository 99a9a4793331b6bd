use clap::{ArgGroup, Parser};
use mesh_core::TcpConfig;
use std::time::Duration;
use task_board::Role;

pub const USAGE: &str = "Usage: taskrelay --admin   OR   taskrelay --worker";

#[derive(Parser, Debug)]
#[command(name = "taskrelay", author, version, about = "Peer-to-peer task delegation board")]
#[command(group(ArgGroup::new("role").args(["admin", "worker"]).multiple(false)))]
pub struct Args {
    /// Post tasks and arbitrate claims.
    #[arg(long)]
    pub admin: bool,

    /// Claim and complete tasks posted by the admin.
    #[arg(long)]
    pub worker: bool,

    /// Address the admin listens on.
    #[arg(long, env = "TASKRELAY_LISTEN", default_value = "0.0.0.0:7420")]
    pub listen: String,

    /// Admin addresses a worker dials (comma-separated or repeated).
    #[arg(long, env = "TASKRELAY_CONNECT", value_delimiter = ',', default_value = "127.0.0.1:7420")]
    pub connect: Vec<String>,

    #[arg(long, env = "TASKRELAY_MAX_FRAME_BYTES", default_value_t = 1024 * 1024)]
    pub max_frame_bytes: usize,

    #[arg(long, env = "TASKRELAY_HANDSHAKE_TIMEOUT_MS", default_value_t = 5000)]
    pub handshake_timeout_ms: u64,

    #[arg(long, env = "TASKRELAY_CONNECT_RETRY_MS", default_value_t = 1000)]
    pub connect_retry_ms: u64,

    /// Frames queued for one peer before it is dropped as stalled.
    #[arg(long, env = "TASKRELAY_OUTBOUND_CAPACITY", default_value_t = 1024)]
    pub outbound_capacity: usize,

    /// Delay before the first prompt, giving peers time to connect.
    #[arg(long, env = "TASKRELAY_PROMPT_DELAY_MS", default_value_t = 2000)]
    pub prompt_delay_ms: u64,
}

impl Args {
    pub fn role(&self) -> Option<Role> {
        match (self.admin, self.worker) {
            (true, _) => Some(Role::Admin),
            (_, true) => Some(Role::Worker),
            _ => None,
        }
    }

    pub fn tcp_config(&self) -> TcpConfig {
        TcpConfig {
            max_frame_bytes: self.max_frame_bytes,
            handshake_timeout: Duration::from_millis(self.handshake_timeout_ms),
            connect_retry: Duration::from_millis(self.connect_retry_ms),
            outbound_capacity: self.outbound_capacity,
        }
    }

    pub fn prompt_delay(&self) -> Duration {
        Duration::from_millis(self.prompt_delay_ms)
    }
}
