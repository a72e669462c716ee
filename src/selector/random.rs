// src/selector/random.rs
use super::SelectError;
use crate::config::BackendConfig;
use rand::seq::SliceRandom;

/// Uniformly random choice, no state between calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSelector;

impl RandomSelector {
    pub fn new() -> Self {
        Self
    }

    pub fn select(&self, backends: &[BackendConfig]) -> Result<BackendConfig, SelectError> {
        let selected = backends
            .choose(&mut rand::thread_rng())
            .ok_or(SelectError::EmptyServerSet)?;

        tracing::debug!(
            backend = %selected,
            candidates = backends.len(),
            "Randomly selected server"
        );
        Ok(selected.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn backends(n: usize) -> Vec<BackendConfig> {
        (0..n)
            .map(|i| BackendConfig::new(format!("http://backend-{i}:80")))
            .collect()
    }

    #[test]
    fn test_empty_set_rejected() {
        assert_eq!(
            RandomSelector::new().select(&[]),
            Err(SelectError::EmptyServerSet)
        );
    }

    #[test]
    fn test_single_backend() {
        let servers = backends(1);
        assert_eq!(RandomSelector::new().select(&servers).unwrap(), servers[0]);
    }

    #[test]
    fn test_every_backend_gets_picked() {
        let servers = backends(4);
        let selector = RandomSelector::new();
        let mut hits: HashMap<String, usize> = HashMap::new();

        for _ in 0..4000 {
            let selected = selector.select(&servers).unwrap();
            *hits.entry(selected.url).or_default() += 1;
        }

        assert_eq!(hits.len(), 4);
        // ~1000 each; the bound is loose enough to never flake
        assert!(hits.values().all(|&count| count > 700), "{hits:?}");
    }
}
