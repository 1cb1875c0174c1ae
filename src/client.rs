//! Keyspace client with cluster failover.
//!
//! The [`Client`] type is the main entry point for reading and writing keys.
//! Use [`ClientBuilder`] to configure and create clients.

use crate::{
    config::ClientConfig,
    dispatch::{ClusterDispatcher, DEFAULT_ATTEMPTS, DEFAULT_TIMEOUT},
    hosts::{HostList, HostSource, DEFAULT_PORT},
    node::{Envelope, Listing, NodeKind, ServerError, WireNode},
    request::{KeyRequest, PrevExist},
    response::HttpResponse,
    transport::{ReqwestTransport, Transport},
    Error, Result,
};
use http::Method;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// A client for the keys API of an etcd cluster.
///
/// The client is cheap to clone and can be shared across tasks. Every
/// operation is one logical request, delivered to whichever configured host
/// answers first.
///
/// # Examples
///
/// ```no_run
/// use etcd_v2_client::Client;
///
/// # async fn example() -> Result<(), etcd_v2_client::Error> {
/// let client = Client::builder()
///     .hosts("10.0.0.1:2379,10.0.0.2:2379,10.0.0.3:2379")
///     .build()?;
///
/// client.set("/app/port", "8080", 0).await?;
/// assert_eq!(client.get("/app/port").await?, "8080");
///
/// client.mk("/app/lock", "held", 30).await?;
/// for (key, node) in client.ls("/app", false).await? {
///     println!("{} => {:?}", key, node);
/// }
/// client.rm("/app/lock").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    dispatcher: ClusterDispatcher,
    hosts: RwLock<Arc<HostList>>,
    default_port: u16,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client from deserialized settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration names no hosts.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        config.into_builder().build()
    }

    /// Returns a snapshot of the current host list.
    pub fn hosts(&self) -> Arc<HostList> {
        self.inner
            .hosts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the host list.
    ///
    /// Requests already in flight keep using the list they started with.
    pub fn set_hosts(&self, hosts: impl HostSource) {
        let hosts = Arc::new(HostList::parse(hosts, self.inner.default_port));
        tracing::info!(hosts = hosts.len(), "Replacing etcd host list");
        *self
            .inner
            .hosts
            .write()
            .unwrap_or_else(PoisonError::into_inner) = hosts;
    }

    /// Returns the port used for hosts that do not name one.
    pub fn default_port(&self) -> u16 {
        self.inner.default_port
    }

    /// Creates a key, failing if it already exists.
    ///
    /// A positive `ttl` makes the key expire after that many seconds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyExists`] if the key is present.
    pub async fn mk(&self, key: &str, value: &str, ttl: i64) -> Result<()> {
        self.write(key, value, ttl, PrevExist::MustNotExist).await
    }

    /// Sets the value of a key, creating it if needed.
    pub async fn set(&self, key: &str, value: &str, ttl: i64) -> Result<()> {
        self.write(key, value, ttl, PrevExist::Absent).await
    }

    /// Sets the value of an existing key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the key is absent.
    pub async fn update(&self, key: &str, value: &str, ttl: i64) -> Result<()> {
        self.write(key, value, ttl, PrevExist::MustExist).await
    }

    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// * [`Error::NotFound`] if the key is absent.
    /// * [`Error::IncorrectType`] if the node is flagged as a directory.
    /// * [`Error::MalformedResponse`] if the response holds no value.
    pub async fn get(&self, key: &str) -> Result<String> {
        let response = self
            .dispatch(KeyRequest::new(Method::GET, key))
            .await?;
        if response.status_code() == 404 {
            return Err(Error::NotFound {
                path: key.to_string(),
            });
        }

        match response_node(&response) {
            Some(node) if node.dir => Err(Error::IncorrectType {
                path: key.to_string(),
                expected: NodeKind::File,
            }),
            Some(WireNode {
                value: Some(value), ..
            }) => Ok(value),
            _ => Err(malformed(key, &response)),
        }
    }

    /// Returns the value stored under `key`, or `default` if it is absent.
    ///
    /// Every error other than [`Error::NotFound`] is returned unchanged.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # async fn example(client: etcd_v2_client::Client) -> Result<(), etcd_v2_client::Error> {
    /// let level = client
    ///     .try_get("/app/log_level", Some("info".to_string()))
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn try_get(&self, key: &str, default: Option<String>) -> Result<Option<String>> {
        match self.get(key).await {
            Ok(value) => Ok(Some(value)),
            Err(Error::NotFound { .. }) => Ok(default),
            Err(e) => Err(e),
        }
    }

    /// Deletes a key.
    ///
    /// Any answer from the cluster counts as done, including a 404 for a key
    /// that was already gone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransportExhausted`] if no host answered.
    pub async fn rm(&self, key: &str) -> Result<()> {
        let response = self
            .dispatch(KeyRequest::new(Method::DELETE, key))
            .await?;
        if !response.is_success() {
            tracing::warn!(
                key = key,
                status = response.status_code(),
                response = %response.raw_body(),
                "Delete was not applied"
            );
        }
        Ok(())
    }

    /// Lists a directory.
    ///
    /// Entries are keyed by full path and keep the order the cluster returned
    /// them in. Subdirectories appear as empty listings unless `recursive`
    /// is set, in which case they are expanded.
    ///
    /// # Errors
    ///
    /// * [`Error::NotFound`] if the directory is absent.
    /// * [`Error::IncorrectType`] if the path is a file.
    /// * [`Error::MalformedResponse`] if the node has neither children nor
    ///   a value, which includes an empty directory.
    pub async fn ls(&self, path: &str, recursive: bool) -> Result<Listing> {
        let mut request = KeyRequest::new(Method::GET, path);
        if recursive {
            request = request.with_query_param("recursive", "true");
        }

        let response = self.dispatch(request).await?;
        if response.status_code() == 404 {
            return Err(Error::NotFound {
                path: path.to_string(),
            });
        }

        match response_node(&response) {
            Some(WireNode {
                nodes: Some(nodes), ..
            }) => Ok(Listing::from_wire(&nodes)),
            Some(WireNode { value: Some(_), .. }) => Err(Error::IncorrectType {
                path: path.to_string(),
                expected: NodeKind::Directory,
            }),
            _ => Err(malformed(path, &response)),
        }
    }

    async fn write(&self, key: &str, value: &str, ttl: i64, prev_exist: PrevExist) -> Result<()> {
        let response = self
            .dispatch(KeyRequest::write(key, value, ttl, prev_exist))
            .await?;
        if response.is_success() {
            return Ok(());
        }

        let error: Option<ServerError> = response.json_as();
        let code = error.as_ref().map(|e| e.error_code);

        match (response.status_code(), code) {
            (404, _) | (_, Some(ServerError::KEY_NOT_FOUND)) => Err(Error::NotFound {
                path: key.to_string(),
            }),
            (_, Some(ServerError::NODE_EXIST)) => Err(Error::AlreadyExists {
                key: key.to_string(),
            }),
            (412, None) | (_, Some(ServerError::TEST_FAILED))
                if prev_exist == PrevExist::MustNotExist =>
            {
                Err(Error::AlreadyExists {
                    key: key.to_string(),
                })
            }
            (_, Some(ServerError::TEST_FAILED)) if prev_exist == PrevExist::MustExist => {
                Err(Error::NotFound {
                    path: key.to_string(),
                })
            }
            (_, Some(ServerError::NOT_FILE)) => Err(Error::IncorrectType {
                path: key.to_string(),
                expected: NodeKind::File,
            }),
            _ => Err(Error::Server {
                key: key.to_string(),
                status: response.status(),
                error,
                raw_response: response.raw_body().to_string(),
            }),
        }
    }

    async fn dispatch(&self, request: KeyRequest) -> Result<HttpResponse> {
        let hosts = self.hosts();
        self.inner.dispatcher.dispatch(&hosts, &request).await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("hosts", &self.hosts())
            .field("default_port", &self.inner.default_port)
            .field("dispatcher", &self.inner.dispatcher)
            .finish()
    }
}

fn response_node(response: &HttpResponse) -> Option<WireNode> {
    response
        .json_as::<Envelope>()
        .and_then(|envelope| envelope.node)
}

fn malformed(key: &str, response: &HttpResponse) -> Error {
    tracing::error!(
        key = key,
        status = response.status_code(),
        raw_response = %response.raw_body(),
        "Unexpected etcd response"
    );
    Error::MalformedResponse {
        key: key.to_string(),
        status: response.status(),
        raw_response: response.raw_body().to_string(),
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use etcd_v2_client::ClientBuilder;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), etcd_v2_client::Error> {
/// let client = ClientBuilder::new()
///     .hosts(vec!["etcd-0", "etcd-1:4001"])
///     .default_port(2379)
///     .attempts(3)
///     .timeout(Duration::from_secs(2))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    hosts: Vec<String>,
    default_port: u16,
    attempts: usize,
    timeout: Duration,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            hosts: Vec::new(),
            default_port: DEFAULT_PORT,
            attempts: DEFAULT_ATTEMPTS,
            timeout: DEFAULT_TIMEOUT,
            transport: None,
        }
    }

    /// Sets the cluster members, replacing any set before.
    ///
    /// Accepts a comma-separated string or a sequence of `host[:port]`
    /// entries.
    pub fn hosts(mut self, hosts: impl HostSource) -> Self {
        self.hosts = hosts.host_entries();
        self
    }

    /// Sets the port for entries that do not name one. Defaults to 2379.
    pub fn default_port(mut self, port: u16) -> Self {
        self.default_port = port;
        self
    }

    /// Sets how many passes over the host list a request makes before
    /// failing. Defaults to 2; values below 1 are treated as 1.
    pub fn attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts;
        self
    }

    /// Sets the per-request timeout. Defaults to 10 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the transport requests are sent through.
    ///
    /// By default a [`ReqwestTransport`] is used.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if no hosts were provided or if the default
    /// transport cannot be created.
    pub fn build(self) -> Result<Client> {
        let hosts = HostList::parse(self.hosts, self.default_port);
        if hosts.is_empty() {
            return Err(Error::Configuration(
                "At least one host is required".to_string(),
            ));
        }

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                dispatcher: ClusterDispatcher::new(transport, self.attempts, self.timeout),
                hosts: RwLock::new(Arc::new(hosts)),
                default_port: self.default_port,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
