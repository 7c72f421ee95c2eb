//! Connection settings for the daemon's HTTP control API.

use serde::Deserialize;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8888;

/// Where the daemon's control API listens.
///
/// Deserializable with every field optional, so it can sit inside a larger
/// config file and fall back to the daemon's stock loopback address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ClientConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
        }
    }

    /// `http://{host}:{port}/api`
    pub fn base_url(&self) -> String {
        format!("http://{}:{}/api", self.host, self.port)
    }
}
