//! The HTTP transport a dispatcher sends requests through.
//!
//! A [`Transport`] performs exactly one HTTP exchange with one host and
//! reports either the raw response or a transport-level failure. Any HTTP
//! status, including 4xx and 5xx, counts as a response.

use async_trait::async_trait;
use http::Method;
use std::fmt::Write as _;
use std::time::Duration;
use url::Url;

/// One HTTP exchange to perform.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// The HTTP method.
    pub method: Method,
    /// The absolute URL, including host, port and query.
    pub url: Url,
    /// The urlencoded form body, if any.
    pub form_body: Option<String>,
    /// The per-request timeout.
    pub timeout: Duration,
    /// When set, the request must not reuse a pooled connection.
    pub fresh_connection: bool,
}

/// A response as read off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// The HTTP status code.
    pub status: u16,
    /// `Name: value` lines separated by CRLF.
    pub header_block: String,
    /// The response body.
    pub body: String,
}

/// A failure below the HTTP layer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The host did not answer within the per-request timeout.
    #[error("Request timed out")]
    Timeout,

    /// The connection could not be established.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Any other failure while sending or reading.
    #[error("Transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

/// Performs single HTTP exchanges with cluster members.
///
/// Implement this trait to substitute the network, e.g. in tests:
///
/// ```
/// use async_trait::async_trait;
/// use etcd_v2_client::transport::{RawResponse, Transport, TransportError, TransportRequest};
///
/// struct AlwaysEmpty;
///
/// #[async_trait]
/// impl Transport for AlwaysEmpty {
///     async fn send(&self, _request: TransportRequest) -> Result<RawResponse, TransportError> {
///         Ok(RawResponse {
///             status: 200,
///             header_block: String::new(),
///             body: "{}".to_string(),
///         })
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the response, or the reason none arrived.
    async fn send(&self, request: TransportRequest) -> Result<RawResponse, TransportError>;
}

/// The default transport, backed by `reqwest`.
///
/// First attempts go through a pooled client; requests flagged
/// `fresh_connection` use a second client that never keeps idle
/// connections and asks the server to close the connection afterwards.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    pooled: reqwest::Client,
    fresh: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with default `reqwest` settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying clients cannot be built.
    pub fn new() -> crate::Result<Self> {
        let pooled = reqwest::Client::builder().build().map_err(|e| {
            crate::Error::Configuration(format!("Failed to build HTTP client: {}", e))
        })?;
        let fresh = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| {
                crate::Error::Configuration(format!("Failed to build HTTP client: {}", e))
            })?;
        Ok(Self { pooled, fresh })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<RawResponse, TransportError> {
        let client = if request.fresh_connection {
            &self.fresh
        } else {
            &self.pooled
        };

        let mut builder = client
            .request(request.method, request.url)
            .timeout(request.timeout);

        if request.fresh_connection {
            builder = builder.header(http::header::CONNECTION, "close");
        }

        if let Some(body) = request.form_body {
            builder = builder
                .header(
                    http::header::CONTENT_TYPE,
                    "application/x-www-form-urlencoded",
                )
                .body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();

        let mut header_block = String::new();
        for (name, value) in response.headers() {
            let _ = write!(
                header_block,
                "{}: {}\r\n",
                name,
                String::from_utf8_lossy(value.as_bytes())
            );
        }

        let body = response.text().await?;

        Ok(RawResponse {
            status,
            header_block,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_describe_the_failure() {
        assert_eq!(TransportError::Timeout.to_string(), "Request timed out");
        assert_eq!(
            TransportError::Connect("refused".to_string()).to_string(),
            "Connection failed: refused"
        );
    }

    #[test]
    fn reqwest_transport_builds() {
        assert!(ReqwestTransport::new().is_ok());
    }
}
