// src/proxy/headers.rs
use hyper::header::{HeaderMap, HeaderName};

/// Request headers that must not be forwarded as received; the outbound
/// client recomputes them for the backend it talks to.
pub const SKIPPED_HEADERS: [&str; 2] = ["host", "content-length"];

#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderFilter;

impl HeaderFilter {
    pub fn new() -> Self {
        Self
    }

    /// Copy `headers`, dropping skipped names with all their values.
    /// Other headers keep every value, in the order received.
    pub fn filter(&self, headers: &HeaderMap) -> HeaderMap {
        let mut forwarded = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            if !Self::should_skip(name) {
                forwarded.append(name.clone(), value.clone());
            }
        }
        forwarded
    }

    pub fn skipped_headers(&self) -> &'static [&'static str] {
        &SKIPPED_HEADERS
    }

    fn should_skip(name: &HeaderName) -> bool {
        SKIPPED_HEADERS
            .iter()
            .any(|skipped| name.as_str().eq_ignore_ascii_case(skipped))
    }
}
