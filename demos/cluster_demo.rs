//! Walks through every keyspace operation against a running cluster.
//!
//! This example shows how to:
//! - Configure a client with several hosts and a default port
//! - Create, set, update, read and delete keys
//! - List a directory, plainly and recursively
//! - Handle missing keys and type mismatches
//!
//! Run with: `cargo run --example cluster_demo -- 127.0.0.1:2379,127.0.0.1:22379`

use etcd_v2_client::{Client, Error, Node};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter("etcd_v2_client=debug,cluster_demo=info")
        .init();

    let hosts = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1".to_string());

    let client = Client::builder()
        .hosts(hosts)
        .attempts(2)
        .timeout(Duration::from_secs(5))
        .build()?;

    println!("Hosts: {:?}", client.hosts());
    println!();

    println!("=== Writes ===");
    client.set("/demo/greeting", "hello", 0).await?;
    match client.mk("/demo/greeting", "again", 0).await {
        Err(Error::AlreadyExists { key }) => println!("mk refused, {} exists", key),
        other => println!("mk: {:?}", other),
    }
    client.update("/demo/greeting", "hello again", 0).await?;
    client.mk("/demo/ephemeral", "gone soon", 10).await?;
    client.set("/demo/nested/a", "1", 0).await?;
    println!();

    println!("=== Reads ===");
    println!("greeting = {}", client.get("/demo/greeting").await?);
    let missing = client
        .try_get("/demo/missing", Some("<default>".to_string()))
        .await?;
    println!("missing = {:?}", missing);
    if let Err(e) = client.get("/demo").await {
        println!("get on a directory: {}", e);
    }
    println!();

    println!("=== Listing ===");
    for (key, node) in client.ls("/demo", true).await? {
        match node {
            Node::Leaf(value) => println!("{} = {}", key, value),
            Node::Directory(children) => println!("{}/ ({} entries)", key, children.len()),
        }
    }
    println!();

    println!("=== Cleanup ===");
    for key in ["/demo/greeting", "/demo/ephemeral", "/demo/nested/a"] {
        client.rm(key).await?;
    }
    println!("done");

    Ok(())
}
