use crate::humanize::{ByteSize, HumanDuration};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub stream: StreamConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Shared secret expected in `x-api-key` or `?api_key=`.
    /// Loaded from the environment, never from the config file.
    #[serde(skip, default = "default_api_key")]
    pub api_key: String,
    #[serde(default)]
    pub api: ApiLimits,
}

/// Request limits for the HTTP surface
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiLimits {
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: ByteSize,
    /// Rows returned by `GET /api/transactions`
    #[serde(default = "default_snapshot_limit")]
    pub snapshot_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            api_key: default_api_key(),
            api: ApiLimits::default(),
        }
    }
}

impl Default for ApiLimits {
    fn default() -> Self {
        Self {
            max_payload_bytes: default_max_payload_bytes(),
            snapshot_limit: default_snapshot_limit(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

pub(crate) fn default_api_key() -> String {
    "changeme".to_string()
}

fn default_max_payload_bytes() -> ByteSize {
    ByteSize(64 * 1024)
}

fn default_snapshot_limit() -> usize {
    50
}

/// SQLite record store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout: HumanDuration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            pool_size: default_pool_size(),
            busy_timeout: default_busy_timeout(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("transactions.db")
}

fn default_pool_size() -> u32 {
    8
}

fn default_busy_timeout() -> HumanDuration {
    HumanDuration::from_secs(5)
}

/// Tail stream (`GET /api/stream`) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamConfig {
    /// Delay between store polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval: HumanDuration,
    /// Idle time after which a keep-alive comment is written
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval: HumanDuration,
    /// Rows fetched per poll
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Concurrent open streams; further requests get 503
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Streams are closed once they have been open this long
    #[serde(default)]
    pub max_lifetime: Option<HumanDuration>,
    /// Consecutive failed polls tolerated before the stream is ended
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    /// Frames buffered between the poll task and the response body
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            heartbeat_interval: default_heartbeat_interval(),
            batch_size: default_batch_size(),
            max_connections: default_max_connections(),
            max_lifetime: None,
            max_consecutive_failures: default_max_consecutive_failures(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_poll_interval() -> HumanDuration {
    HumanDuration::from_secs(1)
}

fn default_heartbeat_interval() -> HumanDuration {
    HumanDuration::from_secs(15)
}

fn default_batch_size() -> usize {
    100
}

fn default_max_connections() -> usize {
    256
}

fn default_max_consecutive_failures() -> u32 {
    5
}

fn default_channel_capacity() -> usize {
    128
}
