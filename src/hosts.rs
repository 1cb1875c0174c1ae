//! Cluster member addresses.
//!
//! A [`HostList`] is parsed once from `host[:port]` entries and never mutated
//! afterwards. Each request takes its own shuffled copy via
//! [`HostList::shuffled`], so concurrent requests never observe each other's
//! ordering.

use rand::seq::SliceRandom;
use std::fmt;

/// The port etcd listens on for client traffic.
pub const DEFAULT_PORT: u16 = 2379;

/// A single cluster member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Host {
    /// Hostname or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Host {
    /// Creates a new `Host`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parses a single `host` or `host:port` entry.
    ///
    /// Surrounding whitespace is ignored. The entry is split on its first
    /// colon; when the remainder is not a valid port number the default port
    /// is used instead.
    ///
    /// Returns `None` for an entry, or a host part, that is empty after
    /// trimming.
    ///
    /// # Examples
    ///
    /// ```
    /// use etcd_v2_client::hosts::Host;
    ///
    /// assert_eq!(Host::parse(" 10.0.0.1:4001 ", 2379), Some(Host::new("10.0.0.1", 4001)));
    /// assert_eq!(Host::parse("etcd-a", 2379), Some(Host::new("etcd-a", 2379)));
    /// assert_eq!(Host::parse("etcd-a:http", 2379), Some(Host::new("etcd-a", 2379)));
    /// ```
    pub fn parse(entry: &str, default_port: u16) -> Option<Self> {
        let entry = entry.trim();
        if entry.is_empty() {
            return None;
        }

        let (host, port) = match entry.split_once(':') {
            Some((host, port)) => (host, port.trim().parse::<u16>().unwrap_or(default_port)),
            None => (entry, default_port),
        };

        let host = host.trim();
        if host.is_empty() {
            return None;
        }
        Some(Self::new(host, port))
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// An ordered, immutable list of cluster members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostList {
    hosts: Vec<Host>,
}

impl HostList {
    /// Parses every entry from `source`, preserving input order.
    ///
    /// # Examples
    ///
    /// ```
    /// use etcd_v2_client::hosts::{Host, HostList};
    ///
    /// let list = HostList::parse("a:4001, b", 2379);
    /// assert_eq!(list.as_slice(), &[Host::new("a", 4001), Host::new("b", 2379)]);
    ///
    /// let list = HostList::parse(vec!["c:1", "d"], 2379);
    /// assert_eq!(list.len(), 2);
    /// ```
    pub fn parse(source: impl HostSource, default_port: u16) -> Self {
        let hosts = source
            .host_entries()
            .iter()
            .filter_map(|entry| Host::parse(entry, default_port))
            .collect();
        Self { hosts }
    }

    /// Returns the hosts in configured order.
    pub fn as_slice(&self) -> &[Host] {
        &self.hosts
    }

    /// Returns the number of hosts.
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Returns `true` if there are no hosts.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Returns a uniformly shuffled copy of the hosts.
    pub fn shuffled(&self) -> Vec<Host> {
        let mut hosts = self.hosts.clone();
        hosts.shuffle(&mut rand::thread_rng());
        hosts
    }
}

impl From<Vec<Host>> for HostList {
    fn from(hosts: Vec<Host>) -> Self {
        Self { hosts }
    }
}

impl<'a> IntoIterator for &'a HostList {
    type Item = &'a Host;
    type IntoIter = std::slice::Iter<'a, Host>;

    fn into_iter(self) -> Self::IntoIter {
        self.hosts.iter()
    }
}

/// Something that can be turned into `host[:port]` entries.
///
/// Strings are split on commas; sequences supply one entry per element.
pub trait HostSource {
    /// Returns the raw, untrimmed entries.
    fn host_entries(self) -> Vec<String>;
}

impl HostSource for &str {
    fn host_entries(self) -> Vec<String> {
        self.split(',').map(str::to_string).collect()
    }
}

impl HostSource for String {
    fn host_entries(self) -> Vec<String> {
        self.as_str().host_entries()
    }
}

impl HostSource for &String {
    fn host_entries(self) -> Vec<String> {
        self.as_str().host_entries()
    }
}

impl HostSource for Vec<String> {
    fn host_entries(self) -> Vec<String> {
        self
    }
}

impl HostSource for Vec<&str> {
    fn host_entries(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

impl HostSource for &[&str] {
    fn host_entries(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

impl HostSource for &[String] {
    fn host_entries(self) -> Vec<String> {
        self.to_vec()
    }
}

impl<const N: usize> HostSource for [&str; N] {
    fn host_entries(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}
