// src/health/registry.rs
use super::status::{HealthRecord, HealthStatus};
use chrono::Utc;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};

/// Thread-safe store of `url -> HealthRecord`.
///
/// Records are replaced wholesale under the shard lock, so readers observe
/// either the previous or the next record. No lock is held across I/O:
/// callers probe first and write the result afterwards.
#[derive(Debug, Default)]
pub struct HealthRegistry {
    records: DashMap<String, HealthRecord>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `url`, starting `Unhealthy`. Returns false if it was already tracked.
    pub fn register(&self, url: &str) -> bool {
        if self.records.contains_key(url) {
            return false;
        }
        let mut inserted = false;
        self.records.entry(url.to_string()).or_insert_with(|| {
            inserted = true;
            HealthRecord::new(url)
        });
        if inserted {
            tracing::debug!(backend = %url, "Registered backend for health tracking");
        }
        inserted
    }

    pub fn get(&self, url: &str) -> Option<HealthRecord> {
        self.records.get(url).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.records.contains_key(url)
    }

    pub fn status(&self, url: &str) -> Option<HealthStatus> {
        self.records.get(url).map(|entry| entry.status)
    }

    pub fn all(&self) -> HashMap<String, HealthRecord> {
        self.records
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn urls(&self) -> Vec<String> {
        self.records.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn healthy_urls(&self) -> HashSet<String> {
        self.urls_with(HealthStatus::Healthy)
    }

    pub fn unhealthy_urls(&self) -> HashSet<String> {
        self.urls_with(HealthStatus::Unhealthy)
    }

    pub fn healthy_count(&self) -> usize {
        self.records.iter().filter(|entry| entry.is_healthy()).count()
    }

    pub fn unhealthy_count(&self) -> usize {
        self.records.iter().filter(|entry| entry.is_unhealthy()).count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record the outcome of a check, stamping `last_checked`.
    ///
    /// Returns the updated record, or `None` if `url` was never registered.
    pub fn set_status(
        &self,
        url: &str,
        status: HealthStatus,
        error_message: Option<String>,
    ) -> Option<HealthRecord> {
        let mut entry = self.records.get_mut(url)?;
        let next = entry.with_status(status, error_message, Utc::now());
        *entry = next.clone();
        Some(next)
    }

    fn urls_with(&self, status: HealthStatus) -> HashSet<String> {
        self.records
            .iter()
            .filter(|entry| entry.status == status)
            .map(|entry| entry.key().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_register_is_idempotent() {
        let registry = HealthRegistry::new();

        assert!(registry.register("http://a:1"));
        registry.set_status("http://a:1", HealthStatus::Healthy, None);
        assert!(!registry.register("http://a:1"));

        // re-registering must not reset the existing record
        assert_eq!(registry.status("http://a:1"), Some(HealthStatus::Healthy));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_set_status_unknown_url() {
        let registry = HealthRegistry::new();
        assert!(registry
            .set_status("http://missing:1", HealthStatus::Healthy, None)
            .is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_set_status_stamps_and_clears() {
        let registry = HealthRegistry::new();
        registry.register("http://a:1");

        let failed = registry
            .set_status("http://a:1", HealthStatus::Unhealthy, Some("HTTP 500".into()))
            .unwrap();
        assert_eq!(failed.error_message.as_deref(), Some("HTTP 500"));
        let first_check = failed.last_checked.unwrap();

        let healthy = registry
            .set_status("http://a:1", HealthStatus::Healthy, None)
            .unwrap();
        assert!(healthy.error_message.is_none());
        assert!(healthy.last_checked.unwrap() >= first_check);
        assert_eq!(registry.get("http://a:1"), Some(healthy));
    }

    #[test]
    fn test_healthy_and_unhealthy_sets() {
        let registry = HealthRegistry::new();
        for url in ["http://a:1", "http://b:2", "http://c:3"] {
            registry.register(url);
        }
        registry.set_status("http://b:2", HealthStatus::Healthy, None);

        assert_eq!(registry.healthy_urls(), HashSet::from(["http://b:2".to_string()]));
        assert_eq!(
            registry.unhealthy_urls(),
            HashSet::from(["http://a:1".to_string(), "http://c:3".to_string()])
        );
        assert_eq!(registry.healthy_count(), 1);
        assert_eq!(registry.unhealthy_count(), 2);
        assert_eq!(registry.all().len(), 3);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let registry = HealthRegistry::new();
        registry.register("http://a:1");

        let snapshot = registry.all();
        registry.set_status("http://a:1", HealthStatus::Healthy, None);

        assert!(snapshot["http://a:1"].is_unhealthy());
        assert!(registry.get("http://a:1").unwrap().is_healthy());
    }

    #[test]
    fn test_concurrent_writers_and_readers() {
        const WRITERS: usize = 8;
        const READERS: usize = 4;
        const ROUNDS: usize = 500;

        let registry = Arc::new(HealthRegistry::new());
        let urls: Vec<String> = (0..WRITERS).map(|i| format!("http://backend-{i}:80")).collect();
        for url in &urls {
            registry.register(url);
        }

        std::thread::scope(|scope| {
            for url in &urls {
                let registry = registry.clone();
                scope.spawn(move || {
                    for round in 0..ROUNDS {
                        if round % 2 == 0 {
                            registry.set_status(url, HealthStatus::Healthy, None);
                        } else {
                            registry.set_status(
                                url,
                                HealthStatus::Unhealthy,
                                Some(format!("failure {round}")),
                            );
                        }
                    }
                });
            }
            for _ in 0..READERS {
                let registry = registry.clone();
                scope.spawn(move || {
                    for _ in 0..ROUNDS {
                        let healthy = registry.healthy_urls();
                        assert!(healthy.len() <= WRITERS);
                        for record in registry.all().values() {
                            // a torn record would carry an error while healthy
                            if record.is_healthy() {
                                assert!(record.error_message.is_none());
                            } else {
                                assert!(
                                    record.last_checked.is_some()
                                        || record.error_message.is_none()
                                );
                            }
                        }
                    }
                });
            }
        });

        // last round is odd, so every record ends unhealthy with its final error
        for url in &urls {
            let record = registry.get(url).unwrap();
            assert!(record.is_unhealthy());
            assert_eq!(record.error_message.as_deref(), Some("failure 499"));
        }
    }
}
