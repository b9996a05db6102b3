use std::time::Duration;

use crate::server::DEFAULT_TIMEOUT;

/// Environment-driven settings for the demo binary.
#[derive(Clone)]
pub struct Config {
    pub listen_addr: String,
    pub timeout: Duration,
}

impl Config {
    pub fn load() -> Self {
        let listen_addr =
            std::env::var("LISTEN").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

        let timeout = std::env::var("TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        Self {
            listen_addr,
            timeout,
        }
    }
}
