//! Endpoint settings per environment, with JSON overrides.

use std::time::Duration;

use serde::Deserialize;
use strum::EnumString;

/// Backend environment the metadata endpoint lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Environment {
    /// Staging backend.
    Staging,
    /// Production backend.
    Production,
}

const PRODUCTION_BASE_URL: &str = "https://api.blockchain.info/metadata";
const STAGING_BASE_URL: &str = "https://api.staging.blockchain.info/metadata";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_SAVE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Settings for talking to the metadata endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataConfig {
    /// URL records live under; the address is appended as the last path segment.
    pub base_url: String,
    /// Timeout applied to each HTTP request.
    pub request_timeout: Duration,
    /// Pause before the single save retry.
    pub save_retry_delay: Duration,
}

#[derive(Deserialize)]
struct RawConfig {
    base_url: String,
    request_timeout_ms: Option<u64>,
    save_retry_delay_ms: Option<u64>,
}

impl MetadataConfig {
    /// Default settings for an environment.
    #[must_use]
    pub fn from_environment(environment: &Environment) -> Self {
        let base_url = match environment {
            Environment::Staging => STAGING_BASE_URL,
            Environment::Production => PRODUCTION_BASE_URL,
        };
        Self {
            base_url: base_url.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            save_retry_delay: DEFAULT_SAVE_RETRY_DELAY,
        }
    }

    /// Parses settings from JSON, e.g. `{"base_url": "...", "save_retry_delay_ms": 1000}`.
    ///
    /// # Errors
    /// Returns the parser's message if the JSON is malformed or `base_url` is missing.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let raw: RawConfig = serde_json::from_str(json).map_err(|err| err.to_string())?;
        Ok(Self {
            base_url: raw.base_url.trim_end_matches('/').to_string(),
            request_timeout: raw
                .request_timeout_ms
                .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_millis),
            save_retry_delay: raw
                .save_retry_delay_ms
                .map_or(DEFAULT_SAVE_RETRY_DELAY, Duration::from_millis),
        })
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::from_environment(&Environment::Production)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_environment_from_str() {
        assert_eq!(Environment::from_str("staging").unwrap(), Environment::Staging);
        assert_eq!(
            Environment::from_str("production").unwrap(),
            Environment::Production
        );
        assert!(Environment::from_str("devnet").is_err());
    }

    #[test]
    fn test_default_is_production() {
        let config = MetadataConfig::default();
        assert_eq!(config.base_url, PRODUCTION_BASE_URL);
        assert_eq!(config.save_retry_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_from_json() {
        let config = MetadataConfig::from_json(
            r#"{"base_url": "https://example.com/metadata/", "save_retry_delay_ms": 250}"#,
        )
        .unwrap();
        assert_eq!(config.base_url, "https://example.com/metadata");
        assert_eq!(config.save_retry_delay, Duration::from_millis(250));
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);

        assert!(MetadataConfig::from_json(r#"{"save_retry_delay_ms": 1}"#).is_err());
    }
}
