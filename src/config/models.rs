// src/config/models.rs
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub health_check: HealthCheckConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoutingConfig {
    #[serde(default)]
    pub servers: Vec<BackendConfig>,
    #[serde(default)]
    pub selector: SelectorKind,
}

/// A configured downstream server. Identity is the exact URL string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct BackendConfig {
    pub url: String,
}

impl BackendConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl fmt::Display for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    Random,
    #[default]
    RoundRobin,
    HealthAware,
}

impl FromStr for SelectorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "random" => Ok(SelectorKind::Random),
            "round_robin" => Ok(SelectorKind::RoundRobin),
            "health_aware" => Ok(SelectorKind::HealthAware),
            other => bail!("Unknown selector '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthCheckConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_health_timeout_ms")]
    pub timeout_ms: u64,
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            timeout_ms: default_health_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_dispatch_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl DispatchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_dispatch_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
            path: default_metrics_path(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_interval_ms() -> u64 {
    10_000
}

fn default_health_timeout_ms() -> u64 {
    3_000
}

fn default_dispatch_timeout_ms() -> u64 {
    5_000
}

fn default_connect_timeout_ms() -> u64 {
    2_000
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Config {
    /// Check URLs and timings, dropping duplicate backends in place.
    pub fn validate(&mut self) -> Result<()> {
        let mut seen = HashSet::new();
        let mut servers = Vec::with_capacity(self.routing.servers.len());

        for server in self.routing.servers.drain(..) {
            let parsed = Url::parse(&server.url)
                .with_context(|| format!("Invalid backend URL '{}'", server.url))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                bail!("Backend URL '{}' must use http or https", server.url);
            }
            if seen.insert(server.url.clone()) {
                servers.push(server);
            } else {
                tracing::warn!(backend = %server.url, "Duplicate backend URL ignored");
            }
        }
        self.routing.servers = servers;

        if self.routing.servers.is_empty() {
            tracing::warn!("No servers configured for routing");
        }
        if self.health_check.interval_ms == 0 {
            bail!("health_check.interval_ms must be greater than zero");
        }
        if self.health_check.timeout_ms == 0 {
            bail!("health_check.timeout_ms must be greater than zero");
        }
        if self.dispatch.timeout_ms == 0 || self.dispatch.connect_timeout_ms == 0 {
            bail!("dispatch timeouts must be greater than zero");
        }
        if !self.metrics.path.starts_with('/') {
            bail!("metrics.path must start with '/'");
        }

        Ok(())
    }

    /// Overlay values from a layered source (typically the process environment).
    pub fn apply_overrides(&mut self, overrides: &::config::Config) -> Result<()> {
        if let Some(servers) = lookup::<String>(overrides, "routing.servers")? {
            self.routing.servers = servers
                .split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(BackendConfig::new)
                .collect();
        }
        if let Some(selector) = lookup::<String>(overrides, "routing.selector")? {
            self.routing.selector = selector.parse()?;
        }
        if let Some(interval) = lookup::<u64>(overrides, "health_check.interval_ms")? {
            self.health_check.interval_ms = interval;
        }
        if let Some(timeout) = lookup::<u64>(overrides, "health_check.timeout_ms")? {
            self.health_check.timeout_ms = timeout;
        }
        if let Some(timeout) = lookup::<u64>(overrides, "dispatch.timeout_ms")? {
            self.dispatch.timeout_ms = timeout;
        }
        if let Some(addr) = lookup::<String>(overrides, "server.listen_addr")? {
            self.server.listen_addr = addr
                .parse()
                .with_context(|| format!("Invalid listen address '{}'", addr))?;
        }
        Ok(())
    }
}

fn lookup<T: DeserializeOwned>(overrides: &::config::Config, key: &str) -> Result<Option<T>> {
    match overrides.get::<T>(key) {
        Ok(value) => Ok(Some(value)),
        Err(::config::ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Invalid override for '{}'", key)),
    }
}
