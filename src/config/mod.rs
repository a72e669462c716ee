// src/config/mod.rs
mod models;

pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Prefix for environment overrides, e.g. `ROUTER__HEALTH_CHECK__INTERVAL_MS`.
pub const ENV_PREFIX: &str = "ROUTER";

/// Load configuration from a file (YAML or JSON), then apply environment overrides
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let mut config = parse_config(path, &contents)?;
    config.apply_overrides(&env_overrides()?)?;
    config.validate()?;
    Ok(config)
}

fn parse_config(path: &Path, contents: &str) -> Result<Config> {
    let config = match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?
        }
        _ => serde_json::from_str(contents).context("Failed to parse JSON config")?,
    };
    Ok(config)
}

fn env_overrides() -> Result<::config::Config> {
    ::config::Config::builder()
        .add_source(::config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .context("Failed to read environment overrides")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_config() {
        let json = r#"{"routing": {"servers": [{"url": "http://localhost:9001"}], "selector": "random"}}"#;
        let config = parse_config(Path::new("config.json"), json).unwrap();

        assert_eq!(config.routing.servers.len(), 1);
        assert_eq!(config.routing.selector, SelectorKind::Random);
    }

    #[test]
    fn test_parse_yaml_config() {
        let yaml = "routing:\n  servers:\n    - url: http://localhost:9001\n    - url: http://localhost:9002\nhealth_check:\n  interval_ms: 500\n";
        let config = parse_config(Path::new("config.yml"), yaml).unwrap();

        assert_eq!(config.routing.servers[1].url, "http://localhost:9002");
        assert_eq!(config.health_check.interval_ms, 500);
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        assert!(load_config("/nonexistent/routing.yaml").await.is_err());
    }
}
