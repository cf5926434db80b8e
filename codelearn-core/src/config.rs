//! # Configuration
//!
//! Everything an analysis needs from the environment, resolved once and
//! passed down by value. Nothing here reads process state on its own except
//! `AppConfig::from_env`.

use crate::error::{Error, Result};
use crate::provider::{ProviderConfig, ProviderType};
use crate::retry::RetryPolicy;
use crate::vcs::DiffOptions;
use std::path::PathBuf;
use std::time::Duration;

pub const PROVIDER_VAR: &str = "CODELEARN_PROVIDER";
pub const BASE_URL_VAR: &str = "CODELEARN_BASE_URL";
pub const MODEL_VAR: &str = "CODELEARN_MODEL";
pub const TIMEOUT_VAR: &str = "CODELEARN_TIMEOUT_SECS";
pub const RETRIES_VAR: &str = "CODELEARN_RETRIES";
pub const DOCS_DIR_VAR: &str = "CODELEARN_DOCS_DIR";
pub const HISTORY_LIMIT_VAR: &str = "CODELEARN_HISTORY_LIMIT";

pub const DEFAULT_DOCS_DIR: &str = "learning_docs";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub retry: RetryPolicy,
    pub docs_dir: PathBuf,
    /// Defaults for diff fetching; per-request flags override them
    pub diff: DiffOptions,
}

impl AppConfig {
    /// Build from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider_type = match get(PROVIDER_VAR) {
            Some(name) => ProviderType::parse(&name).ok_or_else(|| {
                Error::config_invalid(format!("unknown provider '{}'", name))
                    .with_operation("config::load")
                    .with_context("var", PROVIDER_VAR)
            })?,
            None => ProviderType::OpenAI,
        };

        let timeout_secs = parse_var(&get, TIMEOUT_VAR)?.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(Error::config_invalid("timeout must be at least one second")
                .with_operation("config::load")
                .with_context("var", TIMEOUT_VAR));
        }
        let retries: u32 = parse_var(&get, RETRIES_VAR)?.unwrap_or(1);

        let base_url = get(BASE_URL_VAR);
        let model = get(MODEL_VAR);

        let mut provider = match provider_type.api_key_var() {
            Some(key_var) => {
                let key = get(key_var).ok_or_else(|| {
                    Error::config_invalid(format!(
                        "{} is required for provider '{}'",
                        key_var,
                        provider_type.as_str()
                    ))
                    .with_operation("config::load")
                    .with_context("var", key_var)
                })?;
                match provider_type {
                    ProviderType::Anthropic => ProviderConfig::anthropic(key),
                    ProviderType::DeepSeek => ProviderConfig::deepseek(key),
                    _ => ProviderConfig::openai(key),
                }
            }
            None => {
                let url = base_url.clone().ok_or_else(|| {
                    Error::config_invalid("a local provider needs a base URL")
                        .with_operation("config::load")
                        .with_context("var", BASE_URL_VAR)
                })?;
                let model = model.clone().ok_or_else(|| {
                    Error::config_invalid("a local provider needs a model name")
                        .with_operation("config::load")
                        .with_context("var", MODEL_VAR)
                })?;
                ProviderConfig::local(url, model)
            }
        };

        if let Some(url) = base_url {
            provider = provider.with_base_url(url);
        }
        if let Some(model) = model {
            provider = provider.with_model(model);
        }
        provider = provider.with_timeout(timeout_secs);

        let mut diff = DiffOptions::default();
        if let Some(limit) = parse_var(&get, HISTORY_LIMIT_VAR)? {
            diff.history_limit = limit;
        }

        Ok(Self {
            provider,
            retry: RetryPolicy::new(Duration::from_secs(timeout_secs)).with_retries(retries),
            docs_dir: get(DOCS_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DOCS_DIR)),
            diff,
        })
    }

    /// Per-call timeout. Also applied to the HTTP client.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.provider = self.provider.with_timeout(secs);
        self.retry.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.provider = self.provider.with_model(model);
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.provider = self.provider.with_base_url(url);
        self
    }

    pub fn with_docs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.docs_dir = dir.into();
        self
    }
}

fn parse_var<T, G>(get: &G, key: &'static str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|e: T::Err| {
            Error::config_invalid(format!("invalid value '{}' for {}: {}", raw, key, e))
                .with_operation("config::load")
                .with_context("var", key)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_openai_key() {
        let config = AppConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-1")])).unwrap();
        assert_eq!(config.provider.provider_type, ProviderType::OpenAI);
        assert_eq!(config.provider.api_key.as_deref(), Some("sk-1"));
        assert_eq!(config.docs_dir, PathBuf::from("learning_docs"));
        assert_eq!(config.retry.timeout, Duration::from_secs(120));
        assert_eq!(config.retry.attempts(), 2);
        assert_eq!(config.diff.history_limit, 10);
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let err = AppConfig::from_lookup(lookup(&[("CODELEARN_PROVIDER", "deepseek")])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert_eq!(err.context_value("var"), Some("DEEPSEEK_API_KEY"));
    }

    #[test]
    fn test_empty_key_counts_as_missing() {
        let err = AppConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "  ")])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("CODELEARN_PROVIDER", "anthropic"),
            ("ANTHROPIC_API_KEY", "sk-ant"),
            ("CODELEARN_MODEL", "claude-opus-4"),
            ("CODELEARN_TIMEOUT_SECS", "30"),
            ("CODELEARN_RETRIES", "0"),
            ("CODELEARN_DOCS_DIR", "/tmp/docs"),
            ("CODELEARN_HISTORY_LIMIT", "3"),
        ]))
        .unwrap();

        assert_eq!(config.provider.provider_type, ProviderType::Anthropic);
        assert_eq!(config.provider.default_model.as_deref(), Some("claude-opus-4"));
        assert_eq!(config.provider.timeout_secs, Some(30));
        assert_eq!(config.retry.attempts(), 1);
        assert_eq!(config.docs_dir, PathBuf::from("/tmp/docs"));
        assert_eq!(config.diff.history_limit, 3);
    }

    #[test]
    fn test_local_provider_needs_url_and_model() {
        let err = AppConfig::from_lookup(lookup(&[("CODELEARN_PROVIDER", "local")])).unwrap_err();
        assert_eq!(err.context_value("var"), Some("CODELEARN_BASE_URL"));

        let config = AppConfig::from_lookup(lookup(&[
            ("CODELEARN_PROVIDER", "local"),
            ("CODELEARN_BASE_URL", "http://localhost:11434/v1"),
            ("CODELEARN_MODEL", "llama3"),
        ]))
        .unwrap();
        assert!(config.provider.api_key.is_none());
    }

    #[test]
    fn test_invalid_values() {
        let err = AppConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "k"), ("CODELEARN_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert_eq!(err.context_value("var"), Some("CODELEARN_TIMEOUT_SECS"));

        let err = AppConfig::from_lookup(lookup(&[("CODELEARN_PROVIDER", "parrot")])).unwrap_err();
        assert_eq!(err.context_value("var"), Some("CODELEARN_PROVIDER"));
    }

    #[test]
    fn test_builder_overrides() {
        let config = AppConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "k")]))
            .unwrap()
            .with_timeout(5)
            .with_docs_dir("out");
        assert_eq!(config.retry.timeout, Duration::from_secs(5));
        assert_eq!(config.provider.timeout_secs, Some(5));
        assert_eq!(config.docs_dir, PathBuf::from("out"));
    }
}
