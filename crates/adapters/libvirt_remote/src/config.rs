//! libvirt connection configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the management session.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibvirtConfig {
    /// `host:port` of the libvirtd TCP listener.
    pub address: String,
    /// Dial timeout, in seconds.
    pub connect_timeout_secs: u64,
    /// Connection URI sent in the open handshake. `None` lets the daemon
    /// pick its default driver.
    pub uri: Option<String>,
    /// How many calls may wait for the connection before callers block.
    pub queue_depth: usize,
}

impl LibvirtConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for LibvirtConfig {
    fn default() -> Self {
        Self {
            address: "10.0.100.1:16509".to_string(),
            connect_timeout_secs: 2,
            uri: None,
            queue_depth: 64,
        }
    }
}
