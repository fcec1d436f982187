//! Test helpers for the VCFA API

use super::client::{Client, ClientConfig, Credentials, RetryConfig};
use std::time::Duration;

/// Retries and task polling shrunk so mocked failures stay fast
pub fn test_config(url: &str, org: &str, credentials: Credentials) -> ClientConfig {
    ClientConfig::new(url, org, credentials)
        .with_task_poll_interval(Duration::from_millis(10))
        .with_max_retry_timeout(Duration::from_secs(5))
        .with_retry(RetryConfig {
            max_retries: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            timeout_seconds: 5,
        })
}

/// A System client already holding the bearer token `test-token`
pub fn test_client(url: &str) -> Client {
    Client::new(test_config(
        url,
        "System",
        Credentials::Token("test-token".to_string()),
    ))
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_retry_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_backoff_ms, 100);
        assert_eq!(config.max_backoff_ms, 10000);
        assert_eq!(config.timeout_seconds, 30);
    }

    #[test]
    fn test_client_config_defaults() {
        let config = ClientConfig::new(
            "https://vcfa.example.com",
            "System",
            Credentials::Token("t".to_string()),
        );
        assert!(!config.allow_unverified_ssl);
        assert_eq!(config.max_retry_timeout.as_secs(), 60);
        assert_eq!(config.task_poll_interval.as_secs(), 1);
    }

    #[test]
    fn test_api_error_formatting() {
        let error = ApiError::Api {
            status: 400,
            message: "Bad Request".to_string(),
            minor_code: Some("BAD_REQUEST".to_string()),
        };

        let error_str = error.to_string();
        assert!(error_str.contains("HTTP 400"));
        assert!(error_str.contains("Bad Request"));
    }
}
