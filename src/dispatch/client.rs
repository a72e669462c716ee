// src/dispatch/client.rs
use super::request::{DispatchResponse, OutboundRequest};
use crate::config::DispatchConfig;
use async_trait::async_trait;
use reqwest::{redirect, Client};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Connection to {url} failed: {reason}")]
    Connect { url: String, reason: String },

    #[error("Failed to read response body from {url}: {reason}")]
    Body { url: String, reason: String },

    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Every outbound HTTP call goes through this seam.
///
/// Any HTTP status, including 4xx and 5xx, is a successful dispatch; only
/// failures to obtain a response are errors.
#[async_trait]
pub trait HttpDispatcher: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<DispatchResponse, DispatchError>;
}

pub struct ReqwestDispatcher {
    client: Client,
}

impl ReqwestDispatcher {
    pub fn new(config: &DispatchConfig) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| DispatchError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpDispatcher for ReqwestDispatcher {
    async fn send(&self, request: OutboundRequest) -> Result<DispatchResponse, DispatchError> {
        debug!("Sending {}", request);

        let has_body = request.has_body();
        let OutboundRequest {
            url,
            method,
            headers,
            body,
        } = request;

        let mut builder = self.client.request(method.into(), &url).headers(headers);
        if has_body {
            if let Some(body) = body {
                builder = builder.body(body);
            }
        }

        let response = builder.send().await.map_err(|e| classify(&url, e))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(|e| DispatchError::Body {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        debug!(%url, %status, "Request completed");
        Ok(DispatchResponse {
            status,
            headers,
            body,
        })
    }
}

fn classify(url: &str, err: reqwest::Error) -> DispatchError {
    let url = url.to_string();
    if err.is_timeout() {
        warn!(%url, "Request timed out");
        DispatchError::Timeout { url }
    } else if err.is_connect() {
        DispatchError::Connect {
            url,
            reason: err.to_string(),
        }
    } else {
        DispatchError::Transport {
            url,
            reason: err.to_string(),
        }
    }
}
