use std::time::Duration;

use thiserror::Error;

/// Token refresh period observed against the production backend.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(4 * 60);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a whole number of seconds, got '{value}'")]
    InvalidSeconds { var: &'static str, value: String },
    #[error("{var} must be greater than zero")]
    Zero { var: &'static str },
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST backend, without a trailing slash.
    pub api_url: String,
    pub request_timeout: Duration,
    pub refresh_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Read configuration from the environment, loading `.env` if present.
    ///
    /// - `GOODTRIP_API_URL`
    /// - `GOODTRIP_REQUEST_TIMEOUT_SECS`
    /// - `GOODTRIP_REFRESH_INTERVAL_SECS`
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let api_url = std::env::var("GOODTRIP_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());
        let mut config = Self::new(api_url);

        if let Some(timeout) = secs_from_env("GOODTRIP_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = timeout;
        }
        if let Some(interval) = secs_from_env("GOODTRIP_REFRESH_INTERVAL_SECS")? {
            config.refresh_interval = interval;
        }

        Ok(config)
    }
}

fn secs_from_env(var: &'static str) -> Result<Option<Duration>, ConfigError> {
    match std::env::var(var) {
        Ok(value) => parse_secs(var, &value).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_secs(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = value.trim().parse().map_err(|_| ConfigError::InvalidSeconds {
        var,
        value: value.to_string(),
    })?;
    if secs == 0 {
        return Err(ConfigError::Zero { var });
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_stripped() {
        let config = ClientConfig::new("http://api.example.com/");
        assert_eq!(config.api_url, "http://api.example.com");
        assert_eq!(config.refresh_interval, DEFAULT_REFRESH_INTERVAL);
    }

    #[test]
    fn seconds_are_parsed() {
        assert_eq!(parse_secs("X", " 90 ").unwrap(), Duration::from_secs(90));
        assert!(matches!(parse_secs("X", "soon"), Err(ConfigError::InvalidSeconds { .. })));
        assert!(matches!(parse_secs("X", "0"), Err(ConfigError::Zero { .. })));
    }
}
