// src/proxy/outcome.rs
use hyper::header::{
    HeaderMap, HeaderValue, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING,
};
use hyper::{Body, Response, StatusCode};

pub const NO_BACKEND_BODY: &str = r#"{"status":"error","message":"No available servers"}"#;
pub const ROUTING_ERROR_BODY: &str = "Internal routing error";

/// Result of routing one inbound request.
#[derive(Debug, Clone)]
pub enum RouteOutcome {
    /// The backend answered with a non-error status.
    Success {
        status: StatusCode,
        headers: HeaderMap,
        body: String,
    },
    /// The backend answered 4xx or 5xx; passed through verbatim.
    BackendError { status: StatusCode, body: String },
    /// The backend set was empty, so nothing was selected.
    NoBackendAvailable,
    /// No response could be obtained from the selected backend.
    DispatchFailure { message: String },
}

impl RouteOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RouteOutcome::Success { .. } => "success",
            RouteOutcome::BackendError { .. } => "backend_error",
            RouteOutcome::NoBackendAvailable => "no_backend",
            RouteOutcome::DispatchFailure { .. } => "dispatch_failure",
        }
    }

    /// Status code the caller will receive.
    pub fn status(&self) -> StatusCode {
        match self {
            RouteOutcome::Success { status, .. } | RouteOutcome::BackendError { status, .. } => {
                *status
            }
            RouteOutcome::NoBackendAvailable | RouteOutcome::DispatchFailure { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// The transport cause of a DispatchFailure is logged by the router, never sent back.
impl From<RouteOutcome> for Response<Body> {
    fn from(outcome: RouteOutcome) -> Self {
        let status = outcome.status();
        let mut response = match outcome {
            RouteOutcome::Success { headers, body, .. } => {
                let mut response = Response::new(Body::from(body));
                for (name, value) in &headers {
                    if *name != CONTENT_LENGTH
                        && *name != TRANSFER_ENCODING
                        && *name != CONNECTION
                    {
                        response.headers_mut().append(name.clone(), value.clone());
                    }
                }
                response
            }
            RouteOutcome::BackendError { body, .. } => Response::new(Body::from(body)),
            RouteOutcome::NoBackendAvailable => {
                let mut response = Response::new(Body::from(NO_BACKEND_BODY));
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                response
            }
            RouteOutcome::DispatchFailure { .. } => Response::new(Body::from(ROUTING_ERROR_BODY)),
        };
        *response.status_mut() = status;
        response
    }
}
