// src/health/mod.rs
mod checker;
mod registry;
mod scheduler;
mod status;

pub use checker::{is_valid_health_response, HealthMonitor, HealthSummary, ProbeError};
pub use registry::HealthRegistry;
pub use scheduler::HealthScheduler;
pub use status::{HealthRecord, HealthStatus};
