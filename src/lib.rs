//! # etcd-v2-client - A cluster-aware client for the etcd v2 keys API
//!
//! This crate speaks the etcd v2 HTTP keys API (`/v2/keys/...`) against a
//! list of cluster members. Each call is delivered to whichever member
//! answers first, so callers never need to know which nodes are alive.
//!
//! ## Quick Start
//!
//! ```no_run
//! use etcd_v2_client::{Client, Error};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let client = Client::builder()
//!         .hosts("10.0.0.1,10.0.0.2:4001,10.0.0.3")
//!         .build()?;
//!
//!     // Unconditional write, then read it back
//!     client.set("/app/port", "8080", 0).await?;
//!     println!("port = {}", client.get("/app/port").await?);
//!
//!     // Create-only write with a 30 second TTL
//!     match client.mk("/app/leader", "node-1", 30).await {
//!         Ok(()) => println!("became leader"),
//!         Err(Error::AlreadyExists { .. }) => println!("someone else leads"),
//!         Err(e) => return Err(e),
//!     }
//!
//!     // Recursive directory listing
//!     for (key, node) in client.ls("/app", true).await? {
//!         println!("{} => {:?}", key, node);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Host failover** - Every request walks a shuffled copy of the host list,
//!   trying the next member whenever one fails at the transport level
//! - **Bounded, immediate retries** - A configurable number of passes over the
//!   host list, with later passes forcing fresh connections
//! - **Typed errors** - Missing paths, file/directory mismatches and failed
//!   create-only writes each have their own variant
//! - **Ordered listings** - Directory listings keep the cluster's order and
//!   represent empty subdirectories as empty listings
//! - **Pluggable transport** - The default `reqwest` transport can be replaced
//!   through the [`Transport`](transport::Transport) trait
//! - **Automatic logging** - Structured logging with `tracing`
//!
//! ## Failover
//!
//! A request makes at most `attempts * hosts` transport calls and returns the
//! first HTTP response it gets, whatever its status. There is no deadline
//! across the whole walk; the worst case is `attempts * hosts * timeout`.
//!
//! ```no_run
//! use etcd_v2_client::Client;
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), etcd_v2_client::Error> {
//! let client = Client::builder()
//!     .hosts(vec!["etcd-0", "etcd-1", "etcd-2"])
//!     .attempts(3)
//!     .timeout(Duration::from_secs(2))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

mod client;
pub mod config;
pub mod dispatch;
mod error;
pub mod hosts;
pub mod node;
pub mod request;
mod response;
pub mod transport;

pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, HostsConfig};
pub use dispatch::ClusterDispatcher;
pub use error::{Error, Result};
pub use hosts::{Host, HostList};
pub use node::{Listing, Node, NodeKind};
pub use response::HttpResponse;
