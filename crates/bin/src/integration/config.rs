//! Run configuration read from the environment.

use super::store_manager::default_database_path;
use kabu_data::MarketCode;
use kabu_data::jquants::DEFAULT_BASE_URL;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors in the environment configuration.
#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

const DATABASE_PATH: &str = "KABU_DATABASE_PATH";
const EMAIL: &str = "JQUANTS_EMAIL";
const PASSWORD: &str = "JQUANTS_PASSWORD";
const BASE_URL: &str = "JQUANTS_BASE_URL";
const REQUEST_INTERVAL: &str = "KABU_REQUEST_INTERVAL_SECS";
const EXCLUDED_MARKET: &str = "KABU_EXCLUDED_MARKET_CODE";

/// Default pause between per-issuer or per-date fetches.
pub(crate) const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub(crate) struct AppConfig {
    pub(crate) database_path: PathBuf,
    pub(crate) email: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) base_url: String,
    pub(crate) request_interval: Duration,
    pub(crate) excluded_market_code: String,
}

impl AppConfig {
    /// Read the process environment. Call after `dotenvy::dotenv()`.
    pub(crate) fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any name-to-value lookup; empty values count as unset.
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let request_interval = match get(REQUEST_INTERVAL) {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::Invalid {
                    name: REQUEST_INTERVAL,
                    value: v,
                })?,
            None => DEFAULT_REQUEST_INTERVAL,
        };

        Ok(Self {
            database_path: get(DATABASE_PATH).map_or_else(default_database_path, PathBuf::from),
            email: get(EMAIL),
            password: get(PASSWORD),
            base_url: get(BASE_URL).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            request_interval,
            excluded_market_code: get(EXCLUDED_MARKET)
                .unwrap_or_else(|| MarketCode::EXCLUDED_DEFAULT.code().to_string()),
        })
    }

    /// J-Quants credentials, required by every fetch command.
    pub(crate) fn credentials(&self) -> Result<(&str, &str), ConfigError> {
        let email = self.email.as_deref().ok_or(ConfigError::Missing(EMAIL))?;
        let password = self
            .password
            .as_deref()
            .ok_or(ConfigError::Missing(PASSWORD))?;
        Ok((email, password))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();

        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.request_interval, DEFAULT_REQUEST_INTERVAL);
        assert_eq!(cfg.excluded_market_code, "0109");
        assert_eq!(cfg.database_path, default_database_path());
        assert!(matches!(cfg.credentials(), Err(ConfigError::Missing(EMAIL))));
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            (DATABASE_PATH, "/tmp/kabu-test.db"),
            (EMAIL, "user@example.com"),
            (PASSWORD, "secret"),
            (BASE_URL, "http://localhost:8080/v1"),
            (REQUEST_INTERVAL, "2"),
            (EXCLUDED_MARKET, "0105"),
        ])
        .unwrap();

        assert_eq!(cfg.database_path, PathBuf::from("/tmp/kabu-test.db"));
        assert_eq!(cfg.credentials().unwrap(), ("user@example.com", "secret"));
        assert_eq!(cfg.base_url, "http://localhost:8080/v1");
        assert_eq!(cfg.request_interval, Duration::from_secs(2));
        assert_eq!(cfg.excluded_market_code, "0105");
    }

    #[test]
    fn test_blank_values_are_unset() {
        let cfg = config(&[(EMAIL, "user@example.com"), (PASSWORD, "  ")]).unwrap();
        assert!(matches!(cfg.credentials(), Err(ConfigError::Missing(PASSWORD))));
    }

    #[test]
    fn test_invalid_interval() {
        let err = config(&[(REQUEST_INTERVAL, "soon")]).unwrap_err();
        assert!(err.to_string().contains(REQUEST_INTERVAL));
    }
}
