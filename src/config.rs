//! Environment configuration.

use std::env;
use std::time::Duration;

use sahayak_api::config::DEFAULT_MODEL;
use sahayak_api::url::DEFAULT_BASE_URL;
use sahayak_api::SahayakConfig;

pub const BASE_URL_ENV_VAR: &str = "SAHAYAK_BASE_URL";
pub const MODEL_ENV_VAR: &str = "SAHAYAK_MODEL";
pub const TIMEOUT_ENV_VAR: &str = "SAHAYAK_TIMEOUT_SECS";
pub const LOG_ENV_VAR: &str = "SAHAYAK_LOG";

pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub base_url: String,
    pub model: String,
    pub timeout: Option<Duration>,
    pub log_filter: String,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl EnvConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env_string_opt(BASE_URL_ENV_VAR).unwrap_or(defaults.base_url),
            model: env_string_opt(MODEL_ENV_VAR).unwrap_or(defaults.model),
            timeout: env_string_opt(TIMEOUT_ENV_VAR).and_then(|value| parse_timeout_secs(&value)),
            log_filter: env_string_opt(LOG_ENV_VAR).unwrap_or(defaults.log_filter),
        }
    }

    /// Apply command-line overrides on top of the environment.
    pub fn with_overrides(
        mut self,
        base_url: Option<String>,
        model: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Self {
        if let Some(base_url) = non_blank(base_url) {
            self.base_url = base_url;
        }
        if let Some(model) = non_blank(model) {
            self.model = model;
        }
        if let Some(secs) = timeout_secs.filter(|secs| *secs > 0) {
            self.timeout = Some(Duration::from_secs(secs));
        }
        self
    }

    pub fn api_config(&self) -> SahayakConfig {
        let config = SahayakConfig::new(&self.base_url)
            .with_model(&self.model)
            .with_user_agent(concat!("sahayak/", env!("CARGO_PKG_VERSION")));
        match self.timeout {
            Some(timeout) => config.with_timeout(timeout),
            None => config,
        }
    }
}

fn parse_timeout_secs(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
