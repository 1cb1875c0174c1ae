//! Error types for keyspace operations.
//!
//! Every error that originates from a specific key or directory carries that
//! path, so a caller can diagnose a failure from the message alone. Errors
//! that came back from a cluster member keep the raw response body as well.

use crate::node::{NodeKind, ServerError};
use crate::transport::TransportError;
use http::{Method, StatusCode};

/// The main error type for keyspace operations.
///
/// # Examples
///
/// ```no_run
/// use etcd_v2_client::{Client, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder().hosts("10.0.0.1,10.0.0.2:4001").build()?;
///
/// match client.get("/config/feature").await {
///     Ok(value) => println!("value: {}", value),
///     Err(Error::NotFound { path }) => eprintln!("{} is not set", path),
///     Err(Error::IncorrectType { path, .. }) => eprintln!("{} is a directory", path),
///     Err(e) => eprintln!("other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The key or directory does not exist.
    #[error("Path not found: {path}")]
    NotFound {
        /// The key or directory as the caller supplied it
        path: String,
    },

    /// The path exists but is a file where a directory was expected, or the
    /// other way around.
    #[error("{}: {path}", .expected.mismatch_message())]
    IncorrectType {
        /// The key or directory as the caller supplied it
        path: String,
        /// The kind of node the operation needed
        expected: NodeKind,
    },

    /// A create-only write found the key already present.
    #[error("Key already exists: {key}")]
    AlreadyExists {
        /// The key that was being created
        key: String,
    },

    /// The cluster rejected a write with a status this client has no
    /// dedicated variant for.
    #[error("Request for {key} failed with status {status}: {raw_response}")]
    Server {
        /// The key the write targeted
        key: String,
        /// The HTTP status code
        status: StatusCode,
        /// The decoded error body, when the server sent one
        error: Option<ServerError>,
        /// The raw response body
        raw_response: String,
    },

    /// The cluster answered with a success status but the body did not hold
    /// what the operation needed.
    #[error("Unknown error getting key {key} (status {status}). Full response:\n{raw_response}")]
    MalformedResponse {
        /// The key or directory that was requested
        key: String,
        /// The HTTP status code
        status: StatusCode,
        /// The raw response body
        raw_response: String,
    },

    /// Every host in every attempt failed at the transport level.
    ///
    /// Error statuses returned by a host never produce this error; only
    /// connection failures and timeouts do.
    #[error("Error performing etcd request: {method} {path} ({attempts} attempts)")]
    TransportExhausted {
        /// The HTTP method of the request
        method: Method,
        /// The request path relative to the host
        path: String,
        /// The number of transport calls made
        attempts: usize,
        /// The failure reported by the last transport call
        #[source]
        last_error: Option<TransportError>,
    },

    /// The host list is empty, so there is nothing to dispatch to.
    #[error("No hosts configured")]
    NoHosts,

    /// The request used a method the keys API does not accept.
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(Method),

    /// Invalid configuration was provided.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Returns `true` if the key or directory does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Returns the HTTP status code if this error came from a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Server { status, .. } => Some(*status),
            Error::MalformedResponse { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response body if this error came from a response.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::Server { raw_response, .. } => Some(raw_response),
            Error::MalformedResponse { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

/// A specialized `Result` type for keyspace operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_path() {
        let err = Error::NotFound {
            path: "/missing".to_string(),
        };
        assert_eq!(err.to_string(), "Path not found: /missing");

        let err = Error::IncorrectType {
            path: "/dir".to_string(),
            expected: NodeKind::File,
        };
        assert_eq!(err.to_string(), "Path is not an etcd file: /dir");

        let err = Error::IncorrectType {
            path: "/leaf".to_string(),
            expected: NodeKind::Directory,
        };
        assert_eq!(err.to_string(), "Not an etcd directory: /leaf");
    }

    #[test]
    fn status_and_body_only_for_response_errors() {
        let err = Error::MalformedResponse {
            key: "/k".to_string(),
            status: StatusCode::OK,
            raw_response: "garbage".to_string(),
        };
        assert_eq!(err.status(), Some(StatusCode::OK));
        assert_eq!(err.raw_response(), Some("garbage"));

        let err = Error::NotFound {
            path: "/k".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.status(), None);
        assert_eq!(err.raw_response(), None);
    }
}
