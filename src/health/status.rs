// src/health/status.rs
use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => f.write_str("HEALTHY"),
            HealthStatus::Unhealthy => f.write_str("UNHEALTHY"),
        }
    }
}

/// Last observed health of one backend.
///
/// A fresh record is `Unhealthy` and has never been checked. `error_message`
/// is only ever present on an `Unhealthy` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthRecord {
    pub url: String,
    pub status: HealthStatus,
    pub last_checked: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl HealthRecord {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: HealthStatus::Unhealthy,
            last_checked: None,
            error_message: None,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }

    pub fn is_unhealthy(&self) -> bool {
        self.status == HealthStatus::Unhealthy
    }

    /// Produce the next version of this record after a check.
    pub(crate) fn with_status(
        &self,
        status: HealthStatus,
        error_message: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        // Clock steps backwards must not make last_checked go backwards.
        let checked_at = match self.last_checked {
            Some(previous) if previous > now => previous,
            _ => now,
        };
        let error_message = match status {
            HealthStatus::Healthy => None,
            HealthStatus::Unhealthy => error_message,
        };

        Self {
            url: self.url.clone(),
            status,
            last_checked: Some(checked_at),
            error_message,
        }
    }
}

impl fmt::Display for HealthRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.status, &self.error_message) {
            (HealthStatus::Unhealthy, Some(error)) => {
                write!(f, "{} - {} ({})", self.url, self.status, error)
            }
            _ => write!(f, "{} - {}", self.url, self.status),
        }
    }
}
