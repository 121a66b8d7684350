//! Client configuration.
//!
//! Values are resolved in layers: built-in defaults, then the environment
//! (a `.env` file in the working directory is loaded first), then
//! command-line flags.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;

/// Ask endpoint of a locally running answering service.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/ask";

const ENV_ENDPOINT: &str = "LAWMATE_ENDPOINT";
const ENV_IDLE_TIMEOUT: &str = "LAWMATE_IDLE_TIMEOUT_SECS";
const ENV_EXPORT_DIR: &str = "LAWMATE_EXPORT_DIR";

/// Values given on the command line. `None` falls through to lower layers.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub endpoint: Option<String>,
    pub idle_timeout_secs: Option<u64>,
    pub export_dir: Option<PathBuf>,
}

/// Resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Ask endpoint of the answering service.
    pub endpoint: Url,
    /// Maximum wait between stream events. `None` waits indefinitely.
    pub idle_timeout: Option<Duration>,
    /// Directory exported transcripts are written to.
    pub export_dir: PathBuf,
}

impl Config {
    /// Load configuration from `.env`, the process environment and `overrides`.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        // A missing .env file is not an error.
        dotenvy::dotenv().ok();
        Self::resolve(overrides, |key| std::env::var(key).ok())
    }

    fn resolve<F>(overrides: &ConfigOverrides, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = overrides
            .endpoint
            .clone()
            .or_else(|| env(ENV_ENDPOINT))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let endpoint = Url::parse(&endpoint)
            .with_context(|| format!("Invalid answering service endpoint: {endpoint}"))?;

        let idle_timeout_secs = match overrides.idle_timeout_secs {
            Some(secs) => Some(secs),
            None => env(ENV_IDLE_TIMEOUT)
                .map(|raw| {
                    raw.trim()
                        .parse::<u64>()
                        .with_context(|| format!("{ENV_IDLE_TIMEOUT} must be a number of seconds, got '{raw}'"))
                })
                .transpose()?,
        };
        // Zero disables the timeout.
        let idle_timeout = idle_timeout_secs
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs);

        let export_dir = overrides
            .export_dir
            .clone()
            .or_else(|| env(ENV_EXPORT_DIR).map(PathBuf::from))
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            endpoint,
            idle_timeout,
            export_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(overrides: &ConfigOverrides, vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::resolve(overrides, |key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = resolve(&ConfigOverrides::default(), &[]).unwrap();
        assert_eq!(config.endpoint.as_str(), DEFAULT_ENDPOINT);
        assert_eq!(config.idle_timeout, None);
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = resolve(
            &ConfigOverrides::default(),
            &[
                (ENV_ENDPOINT, "http://answers.internal:8080/ask"),
                (ENV_IDLE_TIMEOUT, "30"),
                (ENV_EXPORT_DIR, "/tmp/exports"),
            ],
        )
        .unwrap();
        assert_eq!(config.endpoint.as_str(), "http://answers.internal:8080/ask");
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.export_dir, PathBuf::from("/tmp/exports"));
    }

    #[test]
    fn flags_override_environment() {
        let overrides = ConfigOverrides {
            endpoint: Some("http://127.0.0.1:9000/ask".to_string()),
            idle_timeout_secs: Some(0),
            export_dir: Some(PathBuf::from("out")),
        };
        let config = resolve(
            &overrides,
            &[(ENV_ENDPOINT, "http://elsewhere/ask"), (ENV_IDLE_TIMEOUT, "30")],
        )
        .unwrap();
        assert_eq!(config.endpoint.as_str(), "http://127.0.0.1:9000/ask");
        assert_eq!(config.idle_timeout, None);
        assert_eq!(config.export_dir, PathBuf::from("out"));
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(resolve(&ConfigOverrides::default(), &[(ENV_IDLE_TIMEOUT, "soon")]).is_err());
        assert!(resolve(&ConfigOverrides::default(), &[(ENV_ENDPOINT, "not a url")]).is_err());
    }
}
