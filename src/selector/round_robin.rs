// src/selector/round_robin.rs
use super::{HealthAwareSelector, SelectError};
use crate::config::BackendConfig;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Cycles through the health-aware candidate set.
///
/// The counter is shared across calls and never resynchronised when the
/// candidate set changes. `fetch_add` wraps on overflow, so the index stays
/// in range past `usize::MAX`.
#[derive(Debug)]
pub struct RoundRobinSelector {
    health: HealthAwareSelector,
    counter: AtomicUsize,
}

impl RoundRobinSelector {
    pub fn new(health: HealthAwareSelector) -> Self {
        Self {
            health,
            counter: AtomicUsize::new(0),
        }
    }

    pub fn select(&self, backends: &[BackendConfig]) -> Result<BackendConfig, SelectError> {
        let mut candidates = self.health.candidates(backends)?;

        let index = self.counter.fetch_add(1, Ordering::Relaxed) % candidates.len();
        tracing::debug!(
            "Round-robin selected server {}/{}: {}",
            index + 1,
            candidates.len(),
            candidates[index]
        );
        Ok(candidates.swap_remove(index))
    }

    pub fn reset_counter(&self) {
        self.counter.store(0, Ordering::Relaxed);
        tracing::debug!("Round-robin counter reset");
    }

    pub fn current_counter(&self) -> usize {
        self.counter.load(Ordering::Relaxed)
    }
}
