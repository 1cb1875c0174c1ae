//! Deserializable client configuration.
//!
//! ```
//! use etcd_v2_client::ClientConfig;
//!
//! let config: ClientConfig = serde_json::from_str(
//!     r#"{"hosts": ["10.0.0.1", "10.0.0.2:4001"], "timeout_secs": 3}"#,
//! ).unwrap();
//! assert_eq!(config.default_port, 2379);
//! assert_eq!(config.attempts, 2);
//! ```

use crate::dispatch::{DEFAULT_ATTEMPTS, DEFAULT_TIMEOUT};
use crate::hosts::{HostSource, DEFAULT_PORT};
use crate::ClientBuilder;
use serde::Deserialize;
use std::time::Duration;

/// Settings for a [`Client`](crate::Client), typically read from a config file.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Cluster members, as a comma-separated string or a list.
    pub hosts: HostsConfig,

    /// Port for entries that do not name one.
    #[serde(default = "default_port")]
    pub default_port: u16,

    /// Passes over the host list before giving up.
    #[serde(default = "default_attempts")]
    pub attempts: usize,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// The two accepted shapes of the `hosts` setting.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HostsConfig {
    /// `"a:2379,b,c:4001"`
    List(String),
    /// `["a:2379", "b", "c:4001"]`
    Entries(Vec<String>),
}

impl HostSource for HostsConfig {
    fn host_entries(self) -> Vec<String> {
        match self {
            HostsConfig::List(list) => list.host_entries(),
            HostsConfig::Entries(entries) => entries,
        }
    }
}

impl ClientConfig {
    /// Returns a builder preloaded with these settings.
    ///
    /// Use this instead of [`Client::from_config`](crate::Client::from_config)
    /// to supply a custom transport.
    pub fn into_builder(self) -> ClientBuilder {
        ClientBuilder::new()
            .hosts(self.hosts)
            .default_port(self.default_port)
            .attempts(self.attempts)
            .timeout(Duration::from_secs(self.timeout_secs))
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_attempts() -> usize {
    DEFAULT_ATTEMPTS
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}
