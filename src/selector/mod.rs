// src/selector/mod.rs
mod health_aware;
mod random;
mod round_robin;

pub use health_aware::HealthAwareSelector;
pub use random::RandomSelector;
pub use round_robin::RoundRobinSelector;

use crate::config::{BackendConfig, SelectorKind};
use crate::health::HealthRegistry;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectError {
    #[error("Server set cannot be empty")]
    EmptyServerSet,
}

/// The selection policies behind a single `select` contract.
#[derive(Debug)]
pub enum Selector {
    Random(RandomSelector),
    RoundRobin(RoundRobinSelector),
    HealthAware(HealthAwareSelector),
}

impl Selector {
    /// Pick exactly one member of `backends`.
    pub fn select(&self, backends: &[BackendConfig]) -> Result<BackendConfig, SelectError> {
        match self {
            Selector::Random(selector) => selector.select(backends),
            Selector::RoundRobin(selector) => selector.select(backends),
            Selector::HealthAware(selector) => selector.select(backends),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Selector::Random(_) => "random",
            Selector::RoundRobin(_) => "round_robin",
            Selector::HealthAware(_) => "health_aware",
        }
    }
}

pub fn create_selector(kind: SelectorKind, registry: Arc<HealthRegistry>) -> Arc<Selector> {
    let selector = match kind {
        SelectorKind::Random => Selector::Random(RandomSelector::new()),
        SelectorKind::RoundRobin => {
            Selector::RoundRobin(RoundRobinSelector::new(HealthAwareSelector::new(registry)))
        }
        SelectorKind::HealthAware => Selector::HealthAware(HealthAwareSelector::new(registry)),
    };
    tracing::info!(selector = selector.name(), "Server selector configured");
    Arc::new(selector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_builds_requested_variant() {
        let registry = Arc::new(HealthRegistry::new());

        for (kind, name) in [
            (SelectorKind::Random, "random"),
            (SelectorKind::RoundRobin, "round_robin"),
            (SelectorKind::HealthAware, "health_aware"),
        ] {
            let selector = create_selector(kind, registry.clone());
            assert_eq!(selector.name(), name);
            assert_eq!(selector.select(&[]), Err(SelectError::EmptyServerSet));

            let only = vec![BackendConfig::new("http://a:1")];
            assert_eq!(selector.select(&only).unwrap(), only[0]);
        }
    }
}
