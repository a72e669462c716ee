// src/dispatch/request.rs
use hyper::{HeaderMap, StatusCode};
use std::fmt;

/// Path polled on every backend by the health monitor.
pub const HEALTH_ENDPOINT: &str = "/health";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        }
    }
}

/// A single outbound call, built fresh per request.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: String,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl OutboundRequest {
    /// `POST {base}{path}` carrying the caller's (already filtered) headers and body.
    pub fn routing(base: &str, path: &str, headers: HeaderMap, body: String) -> Self {
        Self {
            url: join_url(base, path),
            method: Method::Post,
            headers,
            body: Some(body),
        }
    }

    /// `GET {base}/health` with no headers and no body.
    pub fn health_check(base: &str) -> Self {
        Self {
            url: join_url(base, HEALTH_ENDPOINT),
            method: Method::Get,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn has_body(&self) -> bool {
        self.body.as_deref().map_or(false, |b| !b.is_empty())
    }
}

impl fmt::Display for OutboundRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (headers={}, body={})",
            self.method,
            self.url,
            self.headers.len(),
            self.has_body()
        )
    }
}

/// Backend URLs are concatenated with the path; a trailing slash on the
/// base is folded so `http://a/` + `/x` does not become `http://a//x`.
pub fn join_url(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_string();
    }
    if path.starts_with('/') {
        format!("{}{}", base.trim_end_matches('/'), path)
    } else {
        format!("{}/{}", base.trim_end_matches('/'), path)
    }
}

/// Whatever the backend answered, regardless of status class.
#[derive(Debug, Clone)]
pub struct DispatchResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}
