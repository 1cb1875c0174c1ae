//! Keyspace nodes as sent by the cluster and as handed back to callers.
//!
//! The keys API answers with an envelope holding a `node` object whose
//! `dir`, `value` and `nodes` fields are each optional. [`WireNode`] mirrors
//! that loose shape for deserialization only; [`WireNode::resolve`] turns it
//! into a [`Node`], after which no field is ever re-checked.

use serde::Deserialize;
use std::fmt;

/// Whether a path names a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A leaf holding a value.
    File,
    /// A directory holding child nodes.
    Directory,
}

impl NodeKind {
    pub(crate) fn mismatch_message(self) -> &'static str {
        match self {
            NodeKind::File => "Path is not an etcd file",
            NodeKind::Directory => "Not an etcd directory",
        }
    }
}

/// The top-level JSON object returned by the keys API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    /// The action the server performed (`get`, `set`, `create`, ...).
    #[serde(default)]
    pub action: Option<String>,
    /// The node the request addressed.
    #[serde(default)]
    pub node: Option<WireNode>,
    /// The node's state before a write.
    #[serde(default, rename = "prevNode")]
    pub prev_node: Option<WireNode>,
}

/// A node exactly as it appears on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireNode {
    /// Full key path, e.g. `/app/config/port`.
    #[serde(default)]
    pub key: String,
    /// Present and `true` for directories.
    #[serde(default)]
    pub dir: bool,
    /// The stored value of a leaf.
    #[serde(default)]
    pub value: Option<String>,
    /// Children of a directory, absent when empty or not requested.
    #[serde(default)]
    pub nodes: Option<Vec<WireNode>>,
    /// Seconds until expiry, when the node has a TTL.
    #[serde(default)]
    pub ttl: Option<i64>,
    /// Cluster index at which the node was created.
    #[serde(default, rename = "createdIndex")]
    pub created_index: Option<u64>,
    /// Cluster index of the last change to the node.
    #[serde(default, rename = "modifiedIndex")]
    pub modified_index: Option<u64>,
}

impl WireNode {
    /// Resolves a listing entry into a leaf or a directory.
    ///
    /// An entry is a directory when flagged `dir` or when it carries `nodes`;
    /// a directory entry without `nodes` is an empty listing. Returns `None`
    /// for a non-directory entry without a value.
    pub fn resolve(&self) -> Option<Node> {
        if self.dir || self.nodes.is_some() {
            let listing = self
                .nodes
                .as_deref()
                .map(Listing::from_wire)
                .unwrap_or_default();
            return Some(Node::Directory(listing));
        }
        self.value.clone().map(Node::Leaf)
    }
}

/// The error body the cluster sends alongside a non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerError {
    /// etcd's numeric error code, e.g. `100` for "Key not found".
    #[serde(rename = "errorCode")]
    pub error_code: u32,
    /// Human-readable description.
    #[serde(default)]
    pub message: String,
    /// The key or condition that caused the error.
    #[serde(default)]
    pub cause: Option<String>,
    /// Cluster index at the time of the error.
    #[serde(default)]
    pub index: Option<u64>,
}

impl ServerError {
    /// "Key not found".
    pub const KEY_NOT_FOUND: u32 = 100;
    /// "Compare failed", returned when a `prevExist` condition does not hold.
    pub const TEST_FAILED: u32 = 101;
    /// "Not a file".
    pub const NOT_FILE: u32 = 102;
    /// "Key already exists".
    pub const NODE_EXIST: u32 = 105;
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.error_code)?;
        if let Some(cause) = &self.cause {
            write!(f, " [{}]", cause)?;
        }
        Ok(())
    }
}

/// A resolved keyspace node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A file holding a value.
    Leaf(String),
    /// A directory; empty directories hold an empty listing.
    Directory(Listing),
}

impl Node {
    /// Returns whether this is a file or a directory.
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Leaf(_) => NodeKind::File,
            Node::Directory(_) => NodeKind::Directory,
        }
    }

    /// Returns the value if this is a leaf.
    pub fn as_value(&self) -> Option<&str> {
        match self {
            Node::Leaf(value) => Some(value),
            Node::Directory(_) => None,
        }
    }

    /// Returns the children if this is a directory.
    pub fn as_listing(&self) -> Option<&Listing> {
        match self {
            Node::Leaf(_) => None,
            Node::Directory(listing) => Some(listing),
        }
    }
}

/// Directory contents keyed by full child path, in the order the cluster
/// returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    entries: Vec<(String, Node)>,
}

impl Listing {
    /// Flattens an array of wire nodes into a listing.
    ///
    /// Directories recurse into their children (or become empty listings
    /// when they have none), leaves map to their value, and nodes that are
    /// neither are dropped.
    pub fn from_wire(nodes: &[WireNode]) -> Self {
        let mut listing = Listing::default();
        for node in nodes {
            if let Some(resolved) = node.resolve() {
                listing.insert(node.key.clone(), resolved);
            }
        }
        listing
    }

    /// Inserts or replaces the node stored under `key`.
    pub fn insert(&mut self, key: impl Into<String>, node: Node) {
        let key = key.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = node,
            None => self.entries.push((key, node)),
        }
    }

    /// Returns the node stored under a full key path.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, node)| node)
    }

    /// Returns the number of direct children.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the directory has no children.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(full path, node)` pairs in cluster order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(key, node)| (key.as_str(), node))
    }

    /// Iterates over the full paths of direct children.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }
}

impl IntoIterator for Listing {
    type Item = (String, Node);
    type IntoIter = std::vec::IntoIter<(String, Node)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>> FromIterator<(K, Node)> for Listing {
    fn from_iter<I: IntoIterator<Item = (K, Node)>>(iter: I) -> Self {
        let mut listing = Listing::default();
        for (key, node) in iter {
            listing.insert(key, node);
        }
        listing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(value: &str) -> Node {
        Node::Leaf(value.to_string())
    }

    fn parse(json: &str) -> WireNode {
        let envelope: Envelope = serde_json::from_str(json).unwrap();
        envelope.node.unwrap()
    }

    #[test]
    fn directory_without_nodes_is_empty_listing() {
        let node = parse(r#"{"node":{"key":"/d","dir":true}}"#);
        assert_eq!(node.resolve(), Some(Node::Directory(Listing::default())));
    }

    #[test]
    fn value_without_dir_is_leaf() {
        let node = parse(r#"{"action":"get","node":{"key":"/k","value":"v","modifiedIndex":7}}"#);
        assert_eq!(node.resolve(), Some(leaf("v")));
        assert_eq!(node.modified_index, Some(7));
    }

    #[test]
    fn bare_node_resolves_to_nothing() {
        let node = parse(r#"{"node":{"key":"/k"}}"#);
        assert_eq!(node.resolve(), None);
    }

    #[test]
    fn flattening_keeps_source_order_and_nests_directories() {
        let node = parse(
            r#"{"node":{"key":"/ls","dir":true,"nodes":[
                {"key":"/ls/b","value":"valB"},
                {"key":"/ls/sub","dir":true,"nodes":[
                    {"key":"/ls/sub/x","value":"1"},
                    {"key":"/ls/sub/deeper","dir":true}
                ]},
                {"key":"/ls/a","value":"valA"},
                {"key":"/ls/ghost"}
            ]}}"#,
        );

        let listing = match node.resolve() {
            Some(Node::Directory(listing)) => listing,
            other => panic!("expected directory, got {:?}", other),
        };

        assert_eq!(
            listing.keys().collect::<Vec<_>>(),
            vec!["/ls/b", "/ls/sub", "/ls/a"]
        );
        assert_eq!(listing.get("/ls/a"), Some(&leaf("valA")));

        let sub: Listing = vec![
            ("/ls/sub/x", leaf("1")),
            ("/ls/sub/deeper", Node::Directory(Listing::default())),
        ]
        .into_iter()
        .collect();
        assert_eq!(listing.get("/ls/sub"), Some(&Node::Directory(sub)));
    }

    #[test]
    fn server_error_body_decodes() {
        let err: ServerError = serde_json::from_str(
            r#"{"errorCode":105,"message":"Key already exists","cause":"/k","index":12}"#,
        )
        .unwrap();
        assert_eq!(err.error_code, ServerError::NODE_EXIST);
        assert_eq!(err.to_string(), "Key already exists (105) [/k]");
    }
}
