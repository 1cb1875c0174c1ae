//! Delivery of one logical request to whichever cluster member answers.
//!
//! The dispatcher walks a freshly shuffled copy of the host list, trying each
//! host in turn, and repeats the walk up to `attempts` times. The first host
//! that produces any HTTP response wins. Retries are immediate; there is no
//! backoff and no deadline spanning the whole walk, so the worst case is
//! `attempts * hosts * timeout`.

use crate::hosts::HostList;
use crate::request::KeyRequest;
use crate::response::HttpResponse;
use crate::transport::{Transport, TransportError, TransportRequest};
use crate::{Error, Result};
use http::Method;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Number of passes over the host list.
pub const DEFAULT_ATTEMPTS: usize = 2;

/// Per-request transport timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends requests to a cluster with per-host failover.
#[derive(Clone)]
pub struct ClusterDispatcher {
    transport: Arc<dyn Transport>,
    attempts: usize,
    timeout: Duration,
}

impl ClusterDispatcher {
    /// Creates a dispatcher. `attempts` below one is raised to one.
    pub fn new(transport: Arc<dyn Transport>, attempts: usize, timeout: Duration) -> Self {
        Self {
            transport,
            attempts: attempts.max(1),
            timeout,
        }
    }

    /// Returns the number of passes over the host list.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Returns the per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Delivers `request` to the first host that answers.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidMethod`] for methods other than GET, PUT and DELETE.
    /// * [`Error::NoHosts`] if `hosts` is empty.
    /// * [`Error::TransportExhausted`] if no host answered in any pass.
    pub async fn dispatch(&self, hosts: &HostList, request: &KeyRequest) -> Result<HttpResponse> {
        if !matches!(request.method, Method::GET | Method::PUT | Method::DELETE) {
            return Err(Error::InvalidMethod(request.method.clone()));
        }
        if hosts.is_empty() {
            return Err(Error::NoHosts);
        }

        let order = hosts.shuffled();
        let path_and_query = request.path_and_query();
        let form_body = match request.method {
            Method::GET => None,
            _ => request.form_body(),
        };

        let mut calls = 0;
        let mut last_error = None;

        for attempt in 1..=self.attempts {
            let fresh_connection = attempt > 1;

            for host in &order {
                let url = match Url::parse(&format!(
                    "http://{}:{}{}",
                    host.host, host.port, path_and_query
                )) {
                    Ok(url) => url,
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            host = %host,
                            attempt = attempt,
                            "Skipping cluster member with unusable address"
                        );
                        last_error = Some(TransportError::Other(format!(
                            "Invalid URL for {}: {}",
                            host, e
                        )));
                        continue;
                    }
                };

                tracing::debug!(
                    method = %request.method,
                    url = %url,
                    attempt = attempt,
                    fresh_connection = fresh_connection,
                    "Executing etcd request"
                );

                calls += 1;
                let outcome = self
                    .send_with_timeout(TransportRequest {
                        method: request.method.clone(),
                        url,
                        form_body: form_body.clone(),
                        timeout: self.timeout,
                        fresh_connection,
                    })
                    .await;

                match outcome {
                    Ok(raw) => {
                        tracing::info!(
                            status = raw.status,
                            host = %host,
                            attempt = attempt,
                            calls = calls,
                            "Received etcd response"
                        );
                        return Ok(HttpResponse::from_raw(raw.status, &raw.header_block, raw.body));
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            host = %host,
                            attempt = attempt,
                            method = %request.method,
                            path = %request.path,
                            "Cluster member did not respond"
                        );
                        last_error = Some(e);
                    }
                }
            }
        }

        tracing::error!(
            method = %request.method,
            path = %request.path,
            calls = calls,
            "All cluster members failed"
        );

        Err(Error::TransportExhausted {
            method: request.method.clone(),
            path: path_and_query,
            attempts: calls,
            last_error,
        })
    }

    // Bounds transports that ignore `TransportRequest::timeout`.
    async fn send_with_timeout(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<crate::transport::RawResponse, TransportError> {
        match tokio::time::timeout(self.timeout, self.transport.send(request)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(TransportError::Timeout),
        }
    }
}

impl std::fmt::Debug for ClusterDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterDispatcher")
            .field("attempts", &self.attempts)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosts::{Host, HostList};
    use crate::transport::RawResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers only for hosts in `alive`; records every call.
    #[derive(Default)]
    struct FakeTransport {
        alive: Vec<String>,
        calls: Mutex<Vec<(String, bool)>>,
        hang: bool,
    }

    impl FakeTransport {
        fn alive(hosts: &[&str]) -> Self {
            Self {
                alive: hosts.iter().map(|h| h.to_string()).collect(),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<(String, bool)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(
            &self,
            request: TransportRequest,
        ) -> std::result::Result<RawResponse, TransportError> {
            let host = request.url.host_str().unwrap_or_default().to_string();
            self.calls
                .lock()
                .unwrap()
                .push((host.clone(), request.fresh_connection));

            if self.hang {
                std::future::pending::<()>().await;
            }

            if self.alive.contains(&host) {
                Ok(RawResponse {
                    status: 404,
                    header_block: format!("X-Served-By: {}\r\n", host),
                    body: format!("{}|{}", request.url.path(), request.form_body.unwrap_or_default()),
                })
            } else {
                Err(TransportError::Connect(format!("{} refused", host)))
            }
        }
    }

    fn hosts(names: &[&str]) -> HostList {
        HostList::from(names.iter().map(|n| Host::new(*n, 2379)).collect::<Vec<_>>())
    }

    fn dispatcher(transport: Arc<FakeTransport>, attempts: usize) -> ClusterDispatcher {
        ClusterDispatcher::new(transport, attempts, Duration::from_secs(10))
    }

    #[tokio::test]
    async fn single_live_host_among_dead_ones_answers() {
        let transport = Arc::new(FakeTransport::alive(&["h3"]));
        let dispatcher = dispatcher(transport.clone(), 2);

        for _ in 0..20 {
            let response = dispatcher
                .dispatch(&hosts(&["h1", "h2", "h3", "h4"]), &KeyRequest::new(Method::GET, "/k"))
                .await
                .unwrap();
            // An error status from a live host is still a response.
            assert_eq!(response.status_code(), 404);
            assert_eq!(response.header("X-Served-By"), Some("h3"));
        }

        let calls = transport.calls();
        assert!(calls.iter().all(|(_, fresh)| !fresh));
        assert!(calls.len() >= 20 && calls.len() <= 80);
    }

    #[tokio::test]
    async fn stops_at_first_response() {
        let transport = Arc::new(FakeTransport::alive(&["a", "b", "c"]));
        let response = dispatcher(transport.clone(), 2)
            .dispatch(&hosts(&["a", "b", "c"]), &KeyRequest::new(Method::DELETE, "/k"))
            .await
            .unwrap();

        assert_eq!(transport.calls().len(), 1);
        assert_eq!(response.raw_body(), "/v2/keys/k|");
    }

    #[tokio::test]
    async fn exhaustion_after_attempts_times_hosts_calls() {
        let transport = Arc::new(FakeTransport::alive(&[]));
        let err = dispatcher(transport.clone(), 3)
            .dispatch(&hosts(&["a", "b"]), &KeyRequest::new(Method::GET, "/k"))
            .await
            .unwrap_err();

        match err {
            Error::TransportExhausted {
                method,
                path,
                attempts,
                last_error,
            } => {
                assert_eq!(method, Method::GET);
                assert_eq!(path, "/v2/keys/k");
                assert_eq!(attempts, 6);
                assert!(matches!(last_error, Some(TransportError::Connect(_))));
            }
            other => panic!("Expected TransportExhausted, got {:?}", other),
        }

        let calls = transport.calls();
        assert_eq!(calls.len(), 6);
        // Only the first pass may reuse connections.
        assert!(calls[..2].iter().all(|(_, fresh)| !fresh));
        assert!(calls[2..].iter().all(|(_, fresh)| *fresh));
        // Every pass walks the same shuffled order.
        assert_eq!(calls[0].0, calls[2].0);
        assert_eq!(calls[1].0, calls[3].0);
    }

    #[tokio::test(start_paused = true)]
    async fn no_deadline_spans_the_whole_walk() {
        let transport = Arc::new(FakeTransport {
            hang: true,
            ..Default::default()
        });
        let dispatcher = ClusterDispatcher::new(transport.clone(), 2, Duration::from_secs(10));

        let started = tokio::time::Instant::now();
        let err = dispatcher
            .dispatch(&hosts(&["a", "b", "c"]), &KeyRequest::new(Method::GET, "/k"))
            .await
            .unwrap_err();

        // Worst case is attempts * hosts * timeout; nothing cuts it short.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(60), "{:?}", elapsed);
        assert!(elapsed < Duration::from_secs(61), "{:?}", elapsed);
        assert_eq!(transport.calls().len(), 6);
        assert!(matches!(
            err,
            Error::TransportExhausted {
                last_error: Some(TransportError::Timeout),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn unusable_address_fails_over_to_the_next_host() {
        let transport = Arc::new(FakeTransport::alive(&["live"]));
        let dispatcher = dispatcher(transport.clone(), 2);

        for _ in 0..40 {
            let response = dispatcher
                .dispatch(&hosts(&["live", "["]), &KeyRequest::new(Method::GET, "/k"))
                .await
                .unwrap();
            assert_eq!(response.header("X-Served-By"), Some("live"));
        }
        // The unusable entry never reaches the transport.
        assert_eq!(transport.calls().len(), 40);

        let err = dispatcher
            .dispatch(&hosts(&["["]), &KeyRequest::new(Method::GET, "/k"))
            .await
            .unwrap_err();
        match err {
            Error::TransportExhausted {
                attempts,
                last_error,
                ..
            } => {
                assert_eq!(attempts, 0);
                assert!(matches!(last_error, Some(TransportError::Other(_))));
            }
            other => panic!("Expected TransportExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn form_body_only_for_writes() {
        let transport = Arc::new(FakeTransport::alive(&["a"]));
        let dispatcher = dispatcher(transport, 1);

        let put = KeyRequest::new(Method::PUT, "/k").with_param("value", "v");
        let response = dispatcher.dispatch(&hosts(&["a"]), &put).await.unwrap();
        assert_eq!(response.raw_body(), "/v2/keys/k|value=v");

        let get = KeyRequest::new(Method::GET, "/k").with_param("value", "v");
        let response = dispatcher.dispatch(&hosts(&["a"]), &get).await.unwrap();
        assert_eq!(response.raw_body(), "/v2/keys/k|");
    }

    #[tokio::test]
    async fn rejects_unsupported_methods_and_empty_host_lists() {
        let transport = Arc::new(FakeTransport::alive(&["a"]));
        let dispatcher = dispatcher(transport.clone(), 2);

        let err = dispatcher
            .dispatch(&hosts(&["a"]), &KeyRequest::new(Method::POST, "/k"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidMethod(m) if m == Method::POST));

        let err = dispatcher
            .dispatch(&HostList::default(), &KeyRequest::new(Method::GET, "/k"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoHosts));
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn attempts_has_a_floor_of_one() {
        let transport = Arc::new(FakeTransport::default());
        assert_eq!(dispatcher(transport, 0).attempts(), 1);
    }
}
