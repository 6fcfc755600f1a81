//! Runtime configuration.
//!
//! Values come from the built-in defaults, then an optional TOML file, then
//! `CHECKOUT_*` environment variables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::feedback::ToastManager;
use crate::postal::DEFAULT_VIACEP_URL;

const DEFAULT_DEBOUNCE_MS: u64 = 500;
const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_TOAST_MAX_VISIBLE: usize = 5;
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },
    #[error("{0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckoutConfig {
    pub debounce_ms: u64,
    pub viacep_base_url: String,
    pub lookup_timeout_ms: u64,
    pub toast_max_visible: usize,
    pub log_filter: String,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            viacep_base_url: DEFAULT_VIACEP_URL.to_string(),
            lookup_timeout_ms: DEFAULT_LOOKUP_TIMEOUT_MS,
            toast_max_visible: DEFAULT_TOAST_MAX_VISIBLE,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl CheckoutConfig {
    /// Defaults, overlaid by `path` when given, overlaid by the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_env(std::env::vars())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str::<Self>(&raw)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
            .validated()
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str::<Self>(raw)
            .map_err(|source| ConfigError::Parse {
                path: PathBuf::from("<inline>"),
                source,
            })?
            .validated()
    }

    pub fn with_env(
        mut self,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, ConfigError> {
        let vars = vars.into_iter().collect::<HashMap<_, _>>();
        if let Some(value) = vars.get("CHECKOUT_DEBOUNCE_MS") {
            self.debounce_ms = parse_env("CHECKOUT_DEBOUNCE_MS", value)?;
        }
        if let Some(value) = vars.get("CHECKOUT_VIACEP_URL") {
            self.viacep_base_url = value.trim().to_string();
        }
        if let Some(value) = vars.get("CHECKOUT_LOOKUP_TIMEOUT_MS") {
            self.lookup_timeout_ms = parse_env("CHECKOUT_LOOKUP_TIMEOUT_MS", value)?;
        }
        if let Some(value) = vars.get("CHECKOUT_LOG") {
            self.log_filter = value.trim().to_string();
        }
        self.validated()
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    /// A toast queue sized by `toast_max_visible`.
    pub fn toast_manager(&self) -> ToastManager {
        ToastManager::with_max_visible(self.toast_max_visible)
    }

    /// Installs the global subscriber with `log_filter` as the fallback
    /// directive.
    pub fn init_logging(&self) -> bool {
        crate::logging::init(&self.log_filter)
    }

    fn validated(self) -> Result<Self, ConfigError> {
        let url = &self.viacep_base_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "viacep_base_url must be an http(s) URL, got {:?}",
                self.viacep_base_url
            )));
        }
        if self.lookup_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "lookup_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.toast_max_visible == 0 {
            return Err(ConfigError::Invalid(
                "toast_max_visible must be at least one".to_string(),
            ));
        }
        Ok(self)
    }
}

fn parse_env(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn defaults_match_the_storefront() {
        let config = CheckoutConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(500));
        assert_eq!(config.viacep_base_url, "https://viacep.com.br/ws");
    }

    #[test]
    fn toml_overrides_only_given_keys() {
        let config = CheckoutConfig::from_toml_str("debounce_ms = 250\nlog_filter = \"debug\"\n")
            .expect("parse");
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.lookup_timeout_ms, 5_000);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            CheckoutConfig::from_toml_str("debounce = 1"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn env_overrides_file_values() {
        let config = CheckoutConfig::from_toml_str("debounce_ms = 250")
            .and_then(|config| {
                config.with_env(env(&[
                    ("CHECKOUT_DEBOUNCE_MS", "800"),
                    ("CHECKOUT_VIACEP_URL", "http://localhost:8080/ws"),
                ]))
            })
            .expect("config");
        assert_eq!(config.debounce_ms, 800);
        assert_eq!(config.viacep_base_url, "http://localhost:8080/ws");
    }

    #[test]
    fn bad_env_values_are_reported() {
        let error = CheckoutConfig::default()
            .with_env(env(&[("CHECKOUT_LOOKUP_TIMEOUT_MS", "soon")]))
            .expect_err("not a number");
        assert!(matches!(
            error,
            ConfigError::InvalidEnv {
                name: "CHECKOUT_LOOKUP_TIMEOUT_MS",
                ..
            }
        ));

        let error = CheckoutConfig::default()
            .with_env(env(&[("CHECKOUT_VIACEP_URL", "viacep.com.br")]))
            .expect_err("not a url");
        assert!(matches!(error, ConfigError::Invalid(_)));
    }

    #[test]
    fn toast_queue_follows_config() {
        let config = CheckoutConfig::from_toml_str("toast_max_visible = 1").expect("parse");
        let toasts = config.toast_manager();
        toasts.show(crate::feedback::Notification::info("first"));
        toasts.show(crate::feedback::Notification::info("second"));
        assert_eq!(toasts.list().len(), 1);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let error = CheckoutConfig::from_file(Path::new("/nonexistent/checkout.toml"))
            .expect_err("missing");
        assert!(matches!(error, ConfigError::Read { .. }));
    }
}
