// src/metrics/collector.rs
use anyhow::{Context, Result};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .context("Failed to encode metrics")?;
        Ok(buffer)
    }
}

pub struct MetricsCollector {
    // Routing metrics
    pub route_requests_total: IntCounterVec,
    pub route_duration_seconds: HistogramVec,

    // Backend metrics
    pub backend_requests_total: IntCounterVec,
    pub backend_health_status: IntGaugeVec,
    pub health_check_duration_seconds: HistogramVec,

    // Fleet metrics
    pub healthy_backends: IntGauge,
    pub total_backends: IntGauge,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let route_requests_total = IntCounterVec::new(
            Opts::new("lb_route_requests_total", "Routed requests by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(route_requests_total.clone()))?;

        let route_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "lb_route_duration_seconds",
                "Time spent routing a request, including the backend call",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(route_duration_seconds.clone()))?;

        let backend_requests_total = IntCounterVec::new(
            Opts::new("lb_backend_requests_total", "Forwarded requests by backend and status"),
            &["backend", "status"],
        )?;
        registry.register(Box::new(backend_requests_total.clone()))?;

        let backend_health_status = IntGaugeVec::new(
            Opts::new(
                "lb_backend_health_status",
                "Backend health status (1=healthy, 0=unhealthy)",
            ),
            &["backend"],
        )?;
        registry.register(Box::new(backend_health_status.clone()))?;

        let health_check_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "lb_health_check_duration_seconds",
                "Health probe duration",
            ),
            &["backend"],
        )?;
        registry.register(Box::new(health_check_duration_seconds.clone()))?;

        let healthy_backends =
            IntGauge::new("lb_healthy_backends", "Number of healthy backends")?;
        registry.register(Box::new(healthy_backends.clone()))?;

        let total_backends =
            IntGauge::new("lb_total_backends", "Total number of backends")?;
        registry.register(Box::new(total_backends.clone()))?;

        Ok(Self {
            route_requests_total,
            route_duration_seconds,
            backend_requests_total,
            backend_health_status,
            health_check_duration_seconds,
            healthy_backends,
            total_backends,
        })
    }

    pub fn record_route(&self, outcome: &str, duration: Duration) {
        self.route_requests_total.with_label_values(&[outcome]).inc();
        self.route_duration_seconds
            .with_label_values(&[outcome])
            .observe(duration.as_secs_f64());
    }

    pub fn record_backend_request(&self, backend: &str, status: &str) {
        self.backend_requests_total
            .with_label_values(&[backend, status])
            .inc();
    }

    pub fn observe_health_check(&self, backend: &str, healthy: bool, duration: Duration) {
        self.backend_health_status
            .with_label_values(&[backend])
            .set(i64::from(healthy));
        self.health_check_duration_seconds
            .with_label_values(&[backend])
            .observe(duration.as_secs_f64());
    }

    pub fn update_backend_counts(&self, healthy: usize, total: usize) {
        self.healthy_backends.set(healthy as i64);
        self.total_backends.set(total as i64);
    }
}

// Helper for timing operations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
