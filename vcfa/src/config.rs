//! Provider configuration
//!
//! Every setting can come from the provider block or from a `VCFA_*`
//! environment variable; the provider block wins.

use crate::api::{ClientConfig, Credentials, SYSTEM_ORG};
use std::str::FromStr;
use std::time::Duration;
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

pub const DEFAULT_IMPORT_SEPARATOR: &str = ".";
const DEFAULT_MAX_RETRY_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    /// user and password, logged in through the sessions endpoint
    Integrated,
    Token,
    ApiToken,
}

impl AuthType {
    pub const VALUES: [&'static str; 3] = ["integrated", "token", "api_token"];
}

impl FromStr for AuthType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "integrated" => Ok(AuthType::Integrated),
            "token" => Ok(AuthType::Token),
            "api_token" => Ok(AuthType::ApiToken),
            other => Err(format!(
                "unsupported auth_type '{}', expected one of: {}",
                other,
                AuthType::VALUES.join(", ")
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub url: String,
    pub org: String,
    pub credentials: Credentials,
    pub allow_unverified_ssl: bool,
    pub max_retry_timeout: Duration,
    pub import_separator: String,
}

impl ProviderConfig {
    /// Reads the provider block. All problems are reported together, each
    /// diagnostic pointing at the attribute at fault.
    pub fn from_config(config: &DynamicValue) -> Result<Self, Vec<Diagnostic>> {
        let mut diagnostics = Vec::new();

        let url = match string_setting(config, "url", "VCFA_URL") {
            Some(raw) => match normalize_url(&raw) {
                Ok(url) => Some(url),
                Err(detail) => {
                    diagnostics.push(
                        Diagnostic::error("Invalid url", detail)
                            .with_attribute(AttributePath::new("url")),
                    );
                    None
                }
            },
            None => {
                diagnostics.push(missing("url", "VCFA_URL", None));
                None
            }
        };

        let org = string_setting(config, "org", "VCFA_ORG")
            .unwrap_or_else(|| SYSTEM_ORG.to_string());

        let auth_type = match string_setting(config, "auth_type", "VCFA_AUTH_TYPE") {
            None => Some(AuthType::Integrated),
            Some(raw) => match raw.parse::<AuthType>() {
                Ok(auth_type) => Some(auth_type),
                Err(detail) => {
                    diagnostics.push(
                        Diagnostic::error("Invalid auth_type", detail)
                            .with_attribute(AttributePath::new("auth_type")),
                    );
                    None
                }
            },
        };

        let credentials = match auth_type {
            Some(AuthType::Integrated) => {
                let user = string_setting(config, "user", "VCFA_USER");
                let password = string_setting(config, "password", "VCFA_PASSWORD");
                if user.is_none() {
                    diagnostics.push(missing("user", "VCFA_USER", Some("integrated")));
                }
                if password.is_none() {
                    diagnostics.push(missing("password", "VCFA_PASSWORD", Some("integrated")));
                }
                user.zip(password)
                    .map(|(user, password)| Credentials::Password { user, password })
            }
            Some(AuthType::Token) => match string_setting(config, "token", "VCFA_TOKEN") {
                Some(token) => Some(Credentials::Token(token)),
                None => {
                    diagnostics.push(missing("token", "VCFA_TOKEN", Some("token")));
                    None
                }
            },
            Some(AuthType::ApiToken) => {
                match string_setting(config, "api_token", "VCFA_API_TOKEN") {
                    Some(token) => Some(Credentials::ApiToken(token)),
                    None => {
                        diagnostics.push(missing("api_token", "VCFA_API_TOKEN", Some("api_token")));
                        None
                    }
                }
            }
            None => None,
        };

        let allow_unverified_ssl =
            match bool_setting(config, "allow_unverified_ssl", "VCFA_ALLOW_UNVERIFIED_SSL") {
                Ok(value) => value.unwrap_or(false),
                Err(diag) => {
                    diagnostics.push(diag);
                    false
                }
            };

        let max_retry_timeout =
            match seconds_setting(config, "max_retry_timeout", "VCFA_MAX_RETRY_TIMEOUT") {
                Ok(value) => value.unwrap_or(DEFAULT_MAX_RETRY_TIMEOUT_SECS),
                Err(diag) => {
                    diagnostics.push(diag);
                    DEFAULT_MAX_RETRY_TIMEOUT_SECS
                }
            };

        let import_separator = string_setting(config, "import_separator", "VCFA_IMPORT_SEPARATOR")
            .unwrap_or_else(|| DEFAULT_IMPORT_SEPARATOR.to_string());

        match (url, credentials) {
            (Some(url), Some(credentials)) if diagnostics.is_empty() => Ok(Self {
                url,
                org,
                credentials,
                allow_unverified_ssl,
                max_retry_timeout: Duration::from_secs(max_retry_timeout),
                import_separator,
            }),
            _ => Err(diagnostics),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.url, &self.org, self.credentials.clone())
            .with_allow_unverified_ssl(self.allow_unverified_ssl)
            .with_max_retry_timeout(self.max_retry_timeout)
    }
}

/// Strips a trailing `/` and `/api`, so both `https://host` and
/// `https://host/api` name the same endpoint
pub fn normalize_url(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_suffix("/api").unwrap_or(trimmed);
    let trimmed = trimmed.trim_end_matches('/');

    let parsed =
        url::Url::parse(trimmed).map_err(|e| format!("'{}' is not a valid URL: {}", raw, e))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("'{}' must use http or https", raw));
    }
    if parsed.host_str().is_none() {
        return Err(format!("'{}' has no host", raw));
    }

    Ok(trimmed.to_string())
}

fn missing(attribute: &str, env: &str, auth_type: Option<&str>) -> Diagnostic {
    let summary = match auth_type {
        Some(auth_type) => format!("{} is required for auth_type '{}'", attribute, auth_type),
        None => format!("{} is required", attribute),
    };
    Diagnostic::error(
        summary,
        format!("Set '{}' in the provider block or the {} environment variable", attribute, env),
    )
    .with_attribute(AttributePath::new(attribute))
}

fn env_value(env: &str) -> Option<String> {
    std::env::var(env).ok().filter(|v| !v.is_empty())
}

fn string_setting(config: &DynamicValue, attribute: &str, env: &str) -> Option<String> {
    config
        .get_string(&AttributePath::new(attribute))
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| env_value(env))
}

fn bool_setting(
    config: &DynamicValue,
    attribute: &str,
    env: &str,
) -> Result<Option<bool>, Diagnostic> {
    if let Ok(value) = config.get_bool(&AttributePath::new(attribute)) {
        return Ok(Some(value));
    }

    match env_value(env) {
        None => Ok(None),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Some(true)),
            "false" | "0" => Ok(Some(false)),
            _ => Err(Diagnostic::error(
                format!("Invalid {}", env),
                format!("expected a boolean, got '{}'", raw),
            )
            .with_attribute(AttributePath::new(attribute))),
        },
    }
}

fn seconds_setting(
    config: &DynamicValue,
    attribute: &str,
    env: &str,
) -> Result<Option<u64>, Diagnostic> {
    let invalid = |value: String| {
        Diagnostic::error(
            format!("Invalid {}", attribute),
            format!("expected a positive number of seconds, got {}", value),
        )
        .with_attribute(AttributePath::new(attribute))
    };

    if let Ok(value) = config.get_number(&AttributePath::new(attribute)) {
        if value < 1.0 || value.fract() != 0.0 {
            return Err(invalid(value.to_string()));
        }
        return Ok(Some(value as u64));
    }

    match env_value(env) {
        None => Ok(None),
        Some(raw) => match raw.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Some(secs)),
            _ => Err(invalid(format!("'{}'", raw))),
        },
    }
}
