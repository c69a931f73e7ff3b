//! Server configuration.

use std::time::Duration;

/// Runtime settings for the live-push server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Deadline for a single frame write to one peer.
    pub write_timeout: Duration,
    /// How often the server pings each connection.
    pub ping_interval: Duration,
    /// Extra grace after a ping before a silent peer is dropped.
    pub pong_timeout: Duration,
    /// Frames buffered per connection before the peer counts as stalled.
    pub queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3030,
            write_timeout: Duration::from_secs(10),
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(10),
            queue_capacity: 64,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// A peer that sends nothing (not even a pong) for this long is gone.
    pub fn idle_timeout(&self) -> Duration {
        self.ping_interval + self.pong_timeout
    }
}
