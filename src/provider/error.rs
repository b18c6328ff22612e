//! Errors raised by model providers

use std::time::Duration;
use thiserror::Error;

/// Failure reported by a completion or embedding provider
///
/// `status` carries the HTTP status for API errors and is absent for
/// transport failures, timeouts and local misconfiguration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", describe(.status, .message))]
pub struct ProviderError {
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }

    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::new(Some(status), body)
    }

    pub fn timeout(limit: Duration) -> Self {
        Self::new(None, format!("request timed out after {}ms", limit.as_millis()))
    }

    pub fn missing_key(key_env: &str) -> Self {
        Self::new(None, format!("{key_env} is not set in the environment"))
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == Some(429)
    }

    pub fn is_auth(&self) -> bool {
        matches!(self.status, Some(401) | Some(403))
    }
}

fn describe(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("provider API error {}: {}", status, message),
        None => format!("provider request failed: {}", message),
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(source: reqwest::Error) -> Self {
        match source.status() {
            Some(status) => Self::api(status.as_u16(), source.to_string()),
            None => Self::transport(source.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_distinguishes_api_and_transport() {
        assert_eq!(
            ProviderError::api(429, "slow down").to_string(),
            "provider API error 429: slow down"
        );
        assert_eq!(
            ProviderError::transport("connection refused").to_string(),
            "provider request failed: connection refused"
        );
    }

    #[test]
    fn test_classification_helpers() {
        assert!(ProviderError::api(429, "").is_rate_limited());
        assert!(ProviderError::api(401, "").is_auth());
        assert!(!ProviderError::timeout(Duration::from_secs(5)).is_rate_limited());
    }

    #[test]
    fn test_sub_second_timeout_is_reported() {
        assert_eq!(
            ProviderError::timeout(Duration::from_millis(250)).to_string(),
            "provider request failed: request timed out after 250ms"
        );
    }
}
