//! Parsed responses from a cluster member.
//!
//! An [`HttpResponse`] is built once per completed transport call from the
//! status code, the raw header block and the body. It keeps the raw body for
//! error reporting next to an optional JSON decoding of it.

use http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;

/// A completed HTTP response.
///
/// # Examples
///
/// ```
/// use etcd_v2_client::HttpResponse;
///
/// let response = HttpResponse::from_raw(
///     200,
///     "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nX-Etcd-Index: 7\r\n",
///     r#"{"action":"get","node":{"key":"/k","value":"v"}}"#,
/// );
///
/// assert_eq!(response.status_code(), 200);
/// assert_eq!(response.header("X-Etcd-Index"), Some("7"));
/// assert_eq!(response.json_body().unwrap()["node"]["value"], "v");
/// ```
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: u16,
    headers: HashMap<String, String>,
    raw_body: String,
    json_body: Option<Value>,
}

impl HttpResponse {
    /// Builds a response from its raw parts.
    ///
    /// A body that is not valid JSON leaves [`json_body`](Self::json_body)
    /// as `None`; a body of literal `null` yields `Some(Value::Null)`.
    pub fn from_raw(status: u16, header_block: &str, body: impl Into<String>) -> Self {
        let raw_body = body.into();
        let json_body = serde_json::from_str(&raw_body).ok();

        Self {
            status,
            headers: parse_header_block(header_block),
            raw_body,
            json_body,
        }
    }

    /// Returns the numeric status code.
    pub fn status_code(&self) -> u16 {
        self.status
    }

    /// Returns the status as a typed `StatusCode`.
    ///
    /// Codes outside the range `http` accepts map to `500`.
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns all headers, with names in the case they were received.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Returns a header value by exact name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Returns a header value by exact name, or `default` if absent.
    pub fn header_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.header(name).unwrap_or(default)
    }

    /// Returns the body exactly as received.
    pub fn raw_body(&self) -> &str {
        &self.raw_body
    }

    /// Returns the body decoded as JSON, or `None` if it was not JSON.
    pub fn json_body(&self) -> Option<&Value> {
        self.json_body.as_ref()
    }

    /// Decodes the JSON body into `T`, or `None` if it does not fit.
    pub fn json_as<T: DeserializeOwned>(&self) -> Option<T> {
        T::deserialize(self.json_body.as_ref()?).ok()
    }
}

/// Splits a raw header block into a name/value map.
///
/// Lines may end in CRLF or LF. Lines without a colon (such as the status
/// line) are skipped. Later duplicates overwrite earlier ones.
pub fn parse_header_block(block: &str) -> HashMap<String, String> {
    block
        .lines()
        .map(str::trim)
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lines_split_on_first_colon() {
        let headers = parse_header_block(
            "HTTP/1.1 200 OK\r\nLocation: http://a:2379/v2/keys/x\r\n  X-Raft-Term :  4 \n\r\n",
        );
        assert_eq!(headers.len(), 2);
        assert_eq!(headers["Location"], "http://a:2379/v2/keys/x");
        assert_eq!(headers["X-Raft-Term"], "4");
    }

    #[test]
    fn duplicate_headers_keep_last_value() {
        let headers = parse_header_block("Set-Cookie: a=1\r\nSet-Cookie: b=2\r\n");
        assert_eq!(headers["Set-Cookie"], "b=2");
    }

    #[test]
    fn header_names_keep_their_case() {
        let response = HttpResponse::from_raw(200, "X-Etcd-Cluster-Id: abc\r\n", "");
        assert_eq!(response.header("X-Etcd-Cluster-Id"), Some("abc"));
        assert_eq!(response.header("x-etcd-cluster-id"), None);
        assert_eq!(response.header_or("x-etcd-cluster-id", "none"), "none");
    }

    #[test]
    fn invalid_json_is_distinct_from_json_null() {
        let response = HttpResponse::from_raw(200, "", "not json");
        assert!(response.json_body().is_none());
        assert_eq!(response.raw_body(), "not json");

        let response = HttpResponse::from_raw(200, "", "null");
        assert_eq!(response.json_body(), Some(&Value::Null));
    }

    #[test]
    fn error_statuses_are_still_responses() {
        let response = HttpResponse::from_raw(404, "", r#"{"errorCode":100}"#);
        assert!(!response.is_success());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.json_body().unwrap()["errorCode"], 100);
    }
}
