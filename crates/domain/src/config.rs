//! Client configuration structures

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::errors::{ClientError, Result};
use crate::types::JsonFormat;

/// Configuration for a client session against one service root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Absolute service root, e.g. `https://graph.microsoft.com/v1.0/`.
    pub service_root_url: String,
    #[serde(default)]
    pub json_format: JsonFormat,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Transport-level attempts per request (1 = no retry).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Static bearer token; real deployments plug in a token provider.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Whether `execute` coalesces the queue into one `$batch` request.
    #[serde(default)]
    pub batch_by_default: bool,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_attempts() -> usize {
    DEFAULT_MAX_ATTEMPTS
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl ClientConfig {
    pub fn new(service_root_url: impl Into<String>) -> Self {
        Self {
            service_root_url: service_root_url.into(),
            json_format: JsonFormat::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            user_agent: default_user_agent(),
            access_token: None,
            batch_by_default: false,
        }
    }

    /// Check invariants and normalise the service root to end with `/`.
    pub fn validate(mut self) -> Result<Self> {
        let root = self.service_root_url.trim();
        if root.is_empty() {
            return Err(ClientError::config("service root URL is empty"));
        }
        if !(root.starts_with("https://") || root.starts_with("http://")) {
            return Err(ClientError::config(format!(
                "service root URL must be absolute http(s): {root}"
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ClientError::config("timeout must be greater than zero"));
        }
        if self.max_attempts == 0 {
            return Err(ClientError::config("max_attempts must be at least 1"));
        }
        self.service_root_url = normalize_service_root(root);
        Ok(self)
    }
}

/// Ensure a trailing slash so relative paths join under the root.
pub fn normalize_service_root(root: &str) -> String {
    if root.ends_with('/') {
        root.to_string()
    } else {
        format!("{root}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JsonDialect;

    #[test]
    fn validate_normalises_trailing_slash() {
        let config = ClientConfig::new("https://graph.example.com/v1.0").validate().unwrap();
        assert_eq!(config.service_root_url, "https://graph.example.com/v1.0/");
    }

    #[test]
    fn validate_rejects_relative_root() {
        let err = ClientConfig::new("/v1.0").validate().unwrap_err();
        assert!(matches!(err, ClientError::Config { .. }));
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = ClientConfig::new("https://host/");
        config.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_defaults_fill_missing_fields() {
        let config: ClientConfig = toml::from_str(
            r#"
service_root_url = "https://host/_api/"

[json_format]
dialect = "verbose"
"#,
        )
        .unwrap();
        assert_eq!(config.json_format.dialect, JsonDialect::Verbose);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.max_attempts, 1);
        assert!(!config.batch_by_default);
    }
}
