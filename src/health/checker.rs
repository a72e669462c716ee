// src/health/checker.rs
use super::registry::HealthRegistry;
use super::status::{HealthRecord, HealthStatus};
use crate::config::{BackendConfig, HealthCheckConfig};
use crate::dispatch::{DispatchError, HttpDispatcher, OutboundRequest};
use crate::metrics::{MetricsCollector, Timer};
use hyper::StatusCode;
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

const EXPECTED_STATUS: &str = "UP";

/// Why a backend failed its health probe.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Invalid health response: {0}")]
    InvalidResponse(String),

    #[error("Health check timed out after {0}ms")]
    Timeout(u128),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HealthSummary {
    pub total: usize,
    pub healthy: usize,
    pub unhealthy: usize,
}

/// Polls `GET {url}/health` on every registered backend and records the result.
pub struct HealthMonitor {
    registry: Arc<HealthRegistry>,
    dispatcher: Arc<dyn HttpDispatcher>,
    timeout: Duration,
    metrics: Option<Arc<MetricsCollector>>,
}

impl HealthMonitor {
    pub fn new(
        config: &HealthCheckConfig,
        registry: Arc<HealthRegistry>,
        dispatcher: Arc<dyn HttpDispatcher>,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            timeout: config.timeout(),
            metrics,
        }
    }

    pub fn registry(&self) -> &Arc<HealthRegistry> {
        &self.registry
    }

    /// Register every configured backend and run the first pass.
    pub async fn on_startup(&self, backends: &[BackendConfig]) -> HealthSummary {
        info!("Starting health check for all configured servers...");
        if backends.is_empty() {
            warn!("No servers configured for health checking");
            return HealthSummary::default();
        }

        for backend in backends {
            self.registry.register(&backend.url);
        }

        let summary = self.check_all().await;
        self.log_details(true);
        summary
    }

    /// One scheduled pass. A no-op while nothing is registered.
    pub async fn on_tick(&self) -> Option<HealthSummary> {
        if self.registry.is_empty() {
            debug!("No servers configured for scheduled health check");
            return None;
        }

        debug!(
            "Running scheduled health check for {} servers",
            self.registry.len()
        );
        let summary = self.check_all().await;
        if summary.unhealthy > 0 {
            self.log_details(false);
        } else {
            info!(
                "Scheduled health check completed - All {} servers are HEALTHY",
                summary.total
            );
        }
        Some(summary)
    }

    /// Check every registered backend concurrently, once each.
    pub async fn check_all(&self) -> HealthSummary {
        let urls = self.registry.urls();
        futures::future::join_all(urls.iter().map(|url| self.check_one(url))).await;

        let summary = HealthSummary {
            total: self.registry.len(),
            healthy: self.registry.healthy_count(),
            unhealthy: self.registry.unhealthy_count(),
        };

        if let Some(metrics) = &self.metrics {
            metrics.update_backend_counts(summary.healthy, summary.total);
        }

        if summary.unhealthy > 0 {
            warn!(
                "Health check completed - Total: {}, Healthy: {}, Unhealthy: {}",
                summary.total, summary.healthy, summary.unhealthy
            );
        } else {
            info!(
                "Health check completed - Total: {}, Healthy: {}, Unhealthy: {}",
                summary.total, summary.healthy, summary.unhealthy
            );
        }
        summary
    }

    /// Probe a single registered backend and store the outcome.
    ///
    /// Returns `None` without any network call if `url` is not registered.
    pub async fn check_one(&self, url: &str) -> Option<HealthRecord> {
        if !self.registry.contains(url) {
            debug!(backend = %url, "Skipping health check for unregistered backend");
            return None;
        }

        let timer = Timer::new();
        let result = self.probe(url).await;

        if let Some(metrics) = &self.metrics {
            metrics.observe_health_check(url, result.is_ok(), timer.elapsed());
        }

        match result {
            Ok(()) => {
                info!("Server {} is HEALTHY", url);
                self.registry.set_status(url, HealthStatus::Healthy, None)
            }
            Err(e) => {
                match &e {
                    ProbeError::Status { .. } | ProbeError::InvalidResponse(_) => {
                        warn!("Server {} is UNHEALTHY - {}", url, e)
                    }
                    ProbeError::Timeout(_) | ProbeError::Dispatch(_) => {
                        error!("Server {} is UNHEALTHY - Error: {}", url, e)
                    }
                }
                self.registry
                    .set_status(url, HealthStatus::Unhealthy, Some(e.to_string()))
            }
        }
    }

    async fn probe(&self, url: &str) -> Result<(), ProbeError> {
        let request = OutboundRequest::health_check(url);
        debug!("Checking health for server: {}", request.url);

        let response = timeout(self.timeout, self.dispatcher.send(request))
            .await
            .map_err(|_| ProbeError::Timeout(self.timeout.as_millis()))??;

        if response.status != StatusCode::OK {
            return Err(ProbeError::Status {
                status: response.status,
                body: response.body,
            });
        }

        if is_valid_health_response(&response.body) {
            Ok(())
        } else {
            Err(ProbeError::InvalidResponse(response.body))
        }
    }

    fn log_details(&self, include_healthy: bool) {
        let mut records: Vec<_> = self.registry.all().into_values().collect();
        records.sort_by(|a, b| a.url.cmp(&b.url));

        for record in records {
            if record.is_healthy() {
                if include_healthy {
                    info!("✓ {} - HEALTHY", record.url);
                }
            } else {
                warn!(
                    "✗ {} - UNHEALTHY ({})",
                    record.url,
                    record.error_message.as_deref().unwrap_or("not checked yet")
                );
            }
        }
    }
}

/// A healthy body is a JSON object whose `status` is the string `"UP"`.
pub fn is_valid_health_response(body: &str) -> bool {
    if body.trim().is_empty() {
        return false;
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => json.get("status").and_then(|s| s.as_str()) == Some(EXPECTED_STATUS),
        Err(_) => {
            debug!("Failed to parse health response as JSON: {}", body);
            false
        }
    }
}
