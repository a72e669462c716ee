// src/selector/health_aware.rs
use super::{RandomSelector, SelectError};
use crate::config::BackendConfig;
use crate::health::{HealthRegistry, HealthStatus};
use std::sync::Arc;
use tracing::{debug, warn};

/// Narrows a backend set to its healthy members.
///
/// When nothing is known to be healthy the full set is returned instead:
/// an unverified fleet keeps serving rather than failing every request.
#[derive(Debug, Clone)]
pub struct HealthAwareSelector {
    registry: Arc<HealthRegistry>,
    random: RandomSelector,
}

impl HealthAwareSelector {
    pub fn new(registry: Arc<HealthRegistry>) -> Self {
        Self {
            registry,
            random: RandomSelector::new(),
        }
    }

    /// Members of `backends` whose registry status is `Healthy`, in input order.
    /// Backends the registry has never seen count as unhealthy.
    pub fn healthy_subset(
        &self,
        backends: &[BackendConfig],
    ) -> Result<Vec<BackendConfig>, SelectError> {
        if backends.is_empty() {
            return Err(SelectError::EmptyServerSet);
        }

        Ok(backends
            .iter()
            .filter(|b| self.registry.status(&b.url) == Some(HealthStatus::Healthy))
            .cloned()
            .collect())
    }

    /// The set a policy should choose from: the healthy subset, or everything.
    pub fn candidates(
        &self,
        backends: &[BackendConfig],
    ) -> Result<Vec<BackendConfig>, SelectError> {
        let healthy = self.healthy_subset(backends)?;
        if healthy.is_empty() {
            warn!(
                total = backends.len(),
                "No healthy servers available, falling back to all servers"
            );
            Ok(backends.to_vec())
        } else {
            debug!(
                "Selecting from {} healthy servers out of {} total servers",
                healthy.len(),
                backends.len()
            );
            Ok(healthy)
        }
    }

    pub fn select(&self, backends: &[BackendConfig]) -> Result<BackendConfig, SelectError> {
        let candidates = self.candidates(backends)?;
        self.random.select(&candidates)
    }
}
