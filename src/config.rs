//! Process configuration.
//!
//! Every option can be given on the command line or through the
//! environment; the command line wins.

use clap::Parser;
use std::net::{IpAddr, SocketAddr};

use crate::hub::{VotingMode, DEFAULT_CONNECTION_BUFFER, DEFAULT_QUEUE_CAPACITY};

/// Default HTTP port when neither `--port` nor `PORT` is set.
pub const DEFAULT_PORT: u16 = 80;

/// Origins allowed to call the API and open live connections.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "https://movie-knights-inky.vercel.app",
];

/// Real-time voting hub
#[derive(Parser, Clone, Debug)]
#[command(name = "votehub", version, about = "Real-time collaborative voting hub")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "VOTEHUB_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: IpAddr,

    /// Origins allowed for CORS and WebSocket upgrades (comma-separated)
    #[arg(
        long = "allowed-origin",
        env = "VOTEHUB_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_values_t = default_origins()
    )]
    pub allowed_origins: Vec<String>,

    /// Voting policy: "rooms" (re-votes overwrite) or "tally" (one vote per voter)
    #[arg(long, env = "VOTEHUB_MODE", value_enum, default_value_t = VotingMode::Rooms)]
    pub mode: VotingMode,

    /// Maximum number of updates waiting for delivery before voters wait
    #[arg(long, env = "VOTEHUB_QUEUE_CAPACITY", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Updates a live connection may fall behind by before it is dropped
    #[arg(
        long,
        env = "VOTEHUB_CONNECTION_BUFFER",
        default_value_t = DEFAULT_CONNECTION_BUFFER
    )]
    pub connection_buffer: usize,

    /// Emit logs as JSON
    #[arg(long, env = "VOTEHUB_JSON_LOGS")]
    pub json_logs: bool,
}

fn default_origins() -> Vec<String> {
    DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_address: IpAddr::from([0, 0, 0, 0]),
            allowed_origins: default_origins(),
            mode: VotingMode::Rooms,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            connection_buffer: DEFAULT_CONNECTION_BUFFER,
            json_logs: false,
        }
    }
}

impl Config {
    /// Address the HTTP server binds to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    /// Whether a browser `Origin` header value is on the allow-list.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }
}
