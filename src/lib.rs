// src/lib.rs
pub mod config;
pub mod dispatch;
pub mod health;
pub mod metrics;
pub mod proxy;
pub mod selector;
pub mod server;
