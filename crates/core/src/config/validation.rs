//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `version` or `cache_prefix` is empty or contains whitespace
    /// - `base_url` is not an absolute http(s) URL
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_body_bytes` is 0 or exceeds 50MB
    /// - `user_agent` is empty
    /// - `shell_manifest` is empty or any path/prefix does not start with `/`
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("version", &self.version), ("cache_prefix", &self.cache_prefix)] {
            if value.is_empty() || value.contains(char::is_whitespace) {
                return Err(ConfigError::Invalid {
                    field: field.into(),
                    reason: "must be non-empty without whitespace".into(),
                });
            }
        }

        match url::Url::parse(&self.base_url) {
            Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {}
            Ok(parsed) => {
                return Err(ConfigError::Invalid {
                    field: "base_url".into(),
                    reason: format!("unsupported scheme: {}", parsed.scheme()),
                });
            }
            Err(e) => {
                return Err(ConfigError::Invalid { field: "base_url".into(), reason: e.to_string() });
            }
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_body_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_body_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_body_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.shell_manifest.is_empty() {
            return Err(ConfigError::Invalid { field: "shell_manifest".into(), reason: "must not be empty".into() });
        }

        let rooted = |field: &str, values: &[String]| -> Result<(), ConfigError> {
            for v in values {
                if !v.starts_with('/') {
                    return Err(ConfigError::Invalid {
                        field: field.into(),
                        reason: format!("{v} must start with '/'"),
                    });
                }
            }
            Ok(())
        };
        rooted("shell_manifest", &self.shell_manifest)?;
        rooted("api_prefixes", &self.api_prefixes)?;
        rooted("static_prefixes", &self.static_prefixes)?;
        if !self.offline_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                field: "offline_path".into(),
                reason: "must start with '/'".into(),
            });
        }

        if !self.shell_manifest.contains(&self.offline_path) {
            tracing::warn!(
                offline_path = %self.offline_path,
                "offline_path is not in shell_manifest; navigations will fall back \
                 to the synthesized offline document"
            );
        }

        Ok(())
    }
}
