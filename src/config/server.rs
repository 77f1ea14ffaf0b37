//! Runtime server configuration.
//!
//! Every option can be given on the command line or through its `CONQUEST_*`
//! environment variable; the command line wins.

use std::path::PathBuf;

use clap::Parser;

use crate::config::game::DEFAULT_TURN_DURATION_MS;
use crate::config::room::RECONNECT_TIMEOUT_SECS;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;

/// Settings resolved once at startup.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct ServerConfig {
    /// Address to bind the HTTP/WebSocket server to
    #[arg(short = 'H', long, env = "CONQUEST_BIND_ADDR", default_value = DEFAULT_BIND_ADDR)]
    pub bind_addr: String,
    /// Port to listen on
    #[arg(short, long, env = "CONQUEST_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Directory of ExportedMap JSON templates
    #[arg(long, env = "CONQUEST_MAP_DIR")]
    pub map_dir: Option<PathBuf>,
    /// Arbiters rooms are spread over. `0` keeps rooms on the system arbiter
    #[arg(long, env = "CONQUEST_ROOM_WORKERS", default_value_t = default_workers())]
    pub room_workers: usize,
    /// Turn duration in milliseconds applied to every mode created by this server
    #[arg(long = "turn-ms", env = "CONQUEST_TURN_MS", default_value_t = DEFAULT_TURN_DURATION_MS)]
    pub turn_duration_ms: u64,
    /// Seconds an offline player keeps their place in a running game
    #[arg(long = "reconnect-secs", env = "CONQUEST_RECONNECT_SECS", default_value_t = RECONNECT_TIMEOUT_SECS)]
    pub reconnect_timeout_secs: u64,
}

fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}
