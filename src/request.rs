//! Request shaping for the keys API.

use http::Method;

/// Prefix of every key path on the wire.
pub const KEYS_PREFIX: &str = "/v2/keys/";

/// Builds the wire path for a logical key.
///
/// Leading slashes on `key` are stripped so the result never contains a
/// doubled slash after the prefix.
///
/// # Examples
///
/// ```
/// use etcd_v2_client::request::key_path;
///
/// assert_eq!(key_path("/app/port"), "/v2/keys/app/port");
/// assert_eq!(key_path("//app/port"), "/v2/keys/app/port");
/// assert_eq!(key_path("app"), "/v2/keys/app");
/// ```
pub fn key_path(key: &str) -> String {
    format!("{}{}", KEYS_PREFIX, key.trim_start_matches('/'))
}

/// The existence condition attached to a write.
///
/// # Examples
///
/// ```
/// use etcd_v2_client::request::PrevExist;
///
/// assert_eq!(PrevExist::Absent.as_param(), None);
/// assert_eq!(PrevExist::MustNotExist.as_param(), Some("false"));
/// assert_eq!(PrevExist::MustExist.as_param(), Some("true"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrevExist {
    /// Unconditional write.
    #[default]
    Absent,
    /// The key must not exist yet (create).
    MustNotExist,
    /// The key must already exist (update).
    MustExist,
}

impl PrevExist {
    /// Returns the wire value of the `prevExist` parameter, if one is sent.
    pub fn as_param(self) -> Option<&'static str> {
        match self {
            PrevExist::Absent => None,
            PrevExist::MustNotExist => Some("false"),
            PrevExist::MustExist => Some("true"),
        }
    }
}

/// A single request against the keys API, independent of which host serves it.
#[derive(Debug, Clone)]
pub struct KeyRequest {
    /// The HTTP method (GET, PUT or DELETE).
    pub method: Method,

    /// The path relative to the host, starting with `/v2/keys/`.
    pub path: String,

    /// Form parameters sent as an urlencoded body, in insertion order.
    pub form: Vec<(String, String)>,

    /// Query parameters appended to the path, in insertion order.
    pub query: Vec<(String, String)>,
}

impl KeyRequest {
    /// Creates a request for `key` with no parameters.
    pub fn new(method: Method, key: &str) -> Self {
        Self {
            method,
            path: key_path(key),
            form: Vec::new(),
            query: Vec::new(),
        }
    }

    /// Creates a PUT that writes `value` under `key`.
    ///
    /// `ttl` is only sent when positive.
    pub fn write(key: &str, value: &str, ttl: i64, prev_exist: PrevExist) -> Self {
        let mut request = Self::new(Method::PUT, key).with_param("value", value);
        if let Some(prev_exist) = prev_exist.as_param() {
            request = request.with_param("prevExist", prev_exist);
        }
        request.with_ttl(ttl)
    }

    /// Adds a form parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((key.into(), value.into()));
        self
    }

    /// Adds a query parameter.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets the `ttl` form parameter when `ttl > 0`, and removes any
    /// existing one otherwise.
    pub fn with_ttl(mut self, ttl: i64) -> Self {
        self.form.retain(|(key, _)| key != "ttl");
        if ttl > 0 {
            self.form.push(("ttl".to_string(), ttl.to_string()));
        }
        self
    }

    /// Returns the path with any query string attached.
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        format!("{}?{}", self.path, encode_pairs(&self.query))
    }

    /// Returns the urlencoded form body, or `None` when there are no form
    /// parameters.
    pub fn form_body(&self) -> Option<String> {
        if self.form.is_empty() {
            None
        } else {
            Some(encode_pairs(&self.form))
        }
    }
}

fn encode_pairs(pairs: &[(String, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}
