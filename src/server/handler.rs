// src/server/handler.rs
use hyper::header::{HeaderValue, ALLOW};
use hyper::{Body, Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;
use tower::Service;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::BackendConfig;
use crate::proxy::Router;

/// Hands every inbound `POST` to the [`Router`] with the configured backend set.
#[derive(Clone)]
pub struct RequestHandler {
    router: Arc<Router>,
    backends: Arc<Vec<BackendConfig>>,
}

impl RequestHandler {
    pub fn new(router: Arc<Router>, backends: Vec<BackendConfig>) -> Self {
        Self {
            router,
            backends: Arc::new(backends),
        }
    }

    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        let request_id = Uuid::new_v4();
        let path = req.uri().path().to_string();
        let span = info_span!("request", id = %request_id, method = %req.method(), path = %path);

        async move {
            if req.method() != Method::POST {
                return method_not_allowed();
            }
            info!("Received POST request for path: {}", path);

            let (parts, body) = req.into_parts();
            let body = match hyper::body::to_bytes(body).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    warn!(%e, "Failed to read request body");
                    return status_response(StatusCode::BAD_REQUEST, "Failed to read request body");
                }
            };

            let outcome = self
                .router
                .route(body, &parts.headers, &path, &self.backends)
                .await;
            info!(status = %outcome.status(), outcome = outcome.label(), "Request completed");
            outcome.into()
        }
        .instrument(span)
        .await
    }
}

impl Service<Request<Body>> for RequestHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = self.clone();
        Box::pin(async move { Ok(handler.handle(req).await) })
    }
}

fn method_not_allowed() -> Response<Body> {
    let mut response = status_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static("POST"));
    response
}

fn status_response(status: StatusCode, message: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(message));
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{DispatchError, DispatchResponse, HttpDispatcher, OutboundRequest};
    use crate::selector::{RandomSelector, Selector};
    use async_trait::async_trait;
    use hyper::HeaderMap;

    struct EchoDispatcher;

    #[async_trait]
    impl HttpDispatcher for EchoDispatcher {
        async fn send(&self, request: OutboundRequest) -> Result<DispatchResponse, DispatchError> {
            Ok(DispatchResponse {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: format!("{}|{}", request.url, request.body.unwrap_or_default()),
            })
        }
    }

    fn handler(backends: Vec<BackendConfig>) -> RequestHandler {
        let router = Router::new(
            Arc::new(Selector::Random(RandomSelector::new())),
            Arc::new(EchoDispatcher),
            None,
        );
        RequestHandler::new(Arc::new(router), backends)
    }

    async fn body_text(response: Response<Body>) -> String {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_post_is_routed_with_path() {
        let handler = handler(vec![BackendConfig::new("http://a:9001")]);
        let req = Request::post("/api/echo?debug=1")
            .body(Body::from("payload"))
            .unwrap();

        let response = handler.handle(req).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "http://a:9001/api/echo|payload");
    }

    #[tokio::test]
    async fn test_non_post_rejected() {
        let handler = handler(vec![BackendConfig::new("http://a:9001")]);
        let req = Request::get("/api/echo").body(Body::empty()).unwrap();

        let response = handler.handle(req).await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "POST");
    }

    #[tokio::test]
    async fn test_no_backends_configured() {
        let handler = handler(Vec::new());
        let req = Request::post("/api/echo").body(Body::from("{}")).unwrap();

        let response = handler.handle(req).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, crate::proxy::NO_BACKEND_BODY);
    }
}
