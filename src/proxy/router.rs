// src/proxy/router.rs
use super::headers::HeaderFilter;
use super::outcome::RouteOutcome;
use crate::config::BackendConfig;
use crate::dispatch::{HttpDispatcher, OutboundRequest};
use crate::metrics::{MetricsCollector, Timer};
use crate::selector::Selector;
use hyper::HeaderMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Routes one inbound request: select a backend, forward, classify.
pub struct Router {
    selector: Arc<Selector>,
    headers: HeaderFilter,
    dispatcher: Arc<dyn HttpDispatcher>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl Router {
    pub fn new(
        selector: Arc<Selector>,
        dispatcher: Arc<dyn HttpDispatcher>,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        Self {
            selector,
            headers: HeaderFilter::new(),
            dispatcher,
            metrics,
        }
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub async fn route(
        &self,
        body: String,
        headers: &HeaderMap,
        path: &str,
        backends: &[BackendConfig],
    ) -> RouteOutcome {
        let timer = Timer::new();
        let outcome = self.forward(body, headers, path, backends).await;

        if let Some(metrics) = &self.metrics {
            metrics.record_route(outcome.label(), timer.elapsed());
        }
        outcome
    }

    async fn forward(
        &self,
        body: String,
        headers: &HeaderMap,
        path: &str,
        backends: &[BackendConfig],
    ) -> RouteOutcome {
        let selected = match self.selector.select(backends) {
            Ok(backend) => backend,
            Err(e) => {
                error!("No available servers for routing: {}", e);
                return RouteOutcome::NoBackendAvailable;
            }
        };

        let forward_headers = self.headers.filter(headers);
        let request = OutboundRequest::routing(&selected.url, path, forward_headers, body);
        let target = request.url.clone();
        info!(selector = self.selector.name(), "Routing request to: {}", target);

        let response = match self.dispatcher.send(request).await {
            Ok(response) => response,
            Err(e) => {
                error!("Unexpected error routing to {}: {}", target, e);
                self.record_backend(&selected.url, "error");
                return RouteOutcome::DispatchFailure {
                    message: e.to_string(),
                };
            }
        };

        let status = response.status;
        self.record_backend(&selected.url, status.as_str());

        if status.is_client_error() {
            warn!(
                "Client error from {}: status={}, body={}",
                target, status, response.body
            );
            RouteOutcome::BackendError {
                status,
                body: response.body,
            }
        } else if status.is_server_error() {
            error!(
                "Server error from {}: status={}, body={}",
                target, status, response.body
            );
            RouteOutcome::BackendError {
                status,
                body: response.body,
            }
        } else {
            info!("Response received from {}: status={}", target, status);
            RouteOutcome::Success {
                status,
                headers: response.headers,
                body: response.body,
            }
        }
    }

    fn record_backend(&self, backend: &str, status: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_backend_request(backend, status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectorKind;
    use crate::dispatch::{DispatchError, DispatchResponse};
    use crate::health::HealthRegistry;
    use crate::selector::{create_selector, RandomSelector};
    use async_trait::async_trait;
    use hyper::header::{HeaderValue, ACCEPT, HOST};
    use hyper::StatusCode;
    use std::sync::Mutex;

    /// Records every request and replies from a fixed script.
    struct ScriptedDispatcher {
        seen: Mutex<Vec<OutboundRequest>>,
        reply: fn(&OutboundRequest) -> Result<DispatchResponse, DispatchError>,
    }

    impl ScriptedDispatcher {
        fn new(
            reply: fn(&OutboundRequest) -> Result<DispatchResponse, DispatchError>,
        ) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                reply,
            })
        }

        fn seen(&self) -> Vec<OutboundRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpDispatcher for ScriptedDispatcher {
        async fn send(&self, request: OutboundRequest) -> Result<DispatchResponse, DispatchError> {
            let reply = (self.reply)(&request);
            self.seen.lock().unwrap().push(request);
            reply
        }
    }

    fn answer(status: StatusCode, body: &str) -> Result<DispatchResponse, DispatchError> {
        Ok(DispatchResponse {
            status,
            headers: HeaderMap::new(),
            body: body.to_string(),
        })
    }

    fn router(dispatcher: Arc<ScriptedDispatcher>) -> Router {
        Router::new(Arc::new(Selector::Random(RandomSelector::new())), dispatcher, None)
    }

    #[tokio::test]
    async fn test_no_backends_makes_no_call() {
        let dispatcher = ScriptedDispatcher::new(|_| answer(StatusCode::OK, "unused"));
        let router = router(dispatcher.clone());

        let outcome = router.route("{}".into(), &HeaderMap::new(), "/api/echo", &[]).await;

        assert!(matches!(outcome, RouteOutcome::NoBackendAvailable));
        assert!(dispatcher.seen().is_empty());
    }

    #[tokio::test]
    async fn test_forwards_filtered_post() {
        let dispatcher = ScriptedDispatcher::new(|_| answer(StatusCode::OK, r#"{"ok":true}"#));
        let router = router(dispatcher.clone());
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("router.local"));
        headers.append(ACCEPT, HeaderValue::from_static("a"));
        headers.append(ACCEPT, HeaderValue::from_static("b"));

        let outcome = router
            .route(
                r#"{"msg":"hi"}"#.into(),
                &headers,
                "/api/echo",
                &[BackendConfig::new("http://a:9001")],
            )
            .await;

        match outcome {
            RouteOutcome::Success { status, body, .. } => {
                assert_eq!(status, StatusCode::OK);
                assert_eq!(body, r#"{"ok":true}"#);
            }
            other => panic!("unexpected outcome {other:?}"),
        }

        let seen = dispatcher.seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].url, "http://a:9001/api/echo");
        assert_eq!(seen[0].method, crate::dispatch::Method::Post);
        assert_eq!(seen[0].body.as_deref(), Some(r#"{"msg":"hi"}"#));
        assert!(seen[0].headers.get(HOST).is_none());
        assert_eq!(seen[0].headers.get_all(ACCEPT).iter().count(), 2);
    }

    #[tokio::test]
    async fn test_backend_errors_passed_through() {
        let dispatcher = ScriptedDispatcher::new(|_| answer(StatusCode::BAD_GATEWAY, "oops"));
        let outcome = router(dispatcher)
            .route(String::new(), &HeaderMap::new(), "/x", &[BackendConfig::new("http://a:1")])
            .await;

        match outcome {
            RouteOutcome::BackendError { status, body } => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(body, "oops");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_client_errors_passed_through() {
        let dispatcher = ScriptedDispatcher::new(|_| answer(StatusCode::NOT_FOUND, "no route"));
        let outcome = router(dispatcher)
            .route(String::new(), &HeaderMap::new(), "/x", &[BackendConfig::new("http://a:1")])
            .await;

        assert_eq!(outcome.status(), StatusCode::NOT_FOUND);
        assert!(matches!(outcome, RouteOutcome::BackendError { .. }));
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let dispatcher = ScriptedDispatcher::new(|request| {
            Err(DispatchError::Connect {
                url: request.url.clone(),
                reason: "connection refused".into(),
            })
        });
        let outcome = router(dispatcher)
            .route(String::new(), &HeaderMap::new(), "/x", &[BackendConfig::new("http://a:1")])
            .await;

        match outcome {
            RouteOutcome::DispatchFailure { message } => {
                assert!(message.contains("connection refused"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_dispatch_failure() {
        let dispatcher = ScriptedDispatcher::new(|request| {
            Err(DispatchError::Timeout {
                url: request.url.clone(),
            })
        });
        let outcome = router(dispatcher)
            .route(String::new(), &HeaderMap::new(), "/x", &[BackendConfig::new("http://a:1")])
            .await;

        match outcome {
            RouteOutcome::DispatchFailure { message } => {
                assert_eq!(message, "Request to http://a:1/x timed out");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_round_robin_spreads_requests() {
        let dispatcher = ScriptedDispatcher::new(|_| answer(StatusCode::OK, ""));
        let selector = create_selector(SelectorKind::RoundRobin, Arc::new(HealthRegistry::new()));
        let router = Router::new(selector, dispatcher.clone(), None);
        let backends = vec![BackendConfig::new("http://a:1"), BackendConfig::new("http://b:2")];

        for _ in 0..4 {
            router.route(String::new(), &HeaderMap::new(), "/p", &backends).await;
        }

        let urls: Vec<_> = dispatcher.seen().into_iter().map(|r| r.url).collect();
        assert_eq!(urls, vec!["http://a:1/p", "http://b:2/p", "http://a:1/p", "http://b:2/p"]);
    }
}
