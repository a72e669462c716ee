mod client;
mod request;

pub use client::{DispatchError, HttpDispatcher, ReqwestDispatcher};
pub use request::{join_url, DispatchResponse, Method, OutboundRequest, HEALTH_ENDPOINT};
