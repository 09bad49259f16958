//! Engine configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (OVERCAST_*)
//! 2. TOML config file (if OVERCAST_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Engine configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (OVERCAST_*)
/// 2. TOML config file (if OVERCAST_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Deployment version token. Store names embed it, and activation
    /// deletes every store carrying any other token.
    #[serde(default = "default_version")]
    pub version: String,

    /// Prefix shared by all store names owned by this engine.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Path to the SQLite store database.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the shell manifest and offline document paths resolve against.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User-Agent string for outgoing requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Largest response body the engine will cache. Bigger responses are
    /// still returned to the caller, just never written to a store.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Application shell: URL paths fetched and cached at install time.
    /// Install fails unless every one of them fetches successfully.
    #[serde(default = "default_shell_manifest")]
    pub shell_manifest: Vec<String>,

    /// Path of the offline fallback document served to navigations when
    /// both network and cache come up empty.
    #[serde(default = "default_offline_path")]
    pub offline_path: String,

    /// Path prefixes routed network-first as API traffic.
    #[serde(default = "default_api_prefixes")]
    pub api_prefixes: Vec<String>,

    /// Path prefixes routed cache-first as static assets.
    #[serde(default = "default_static_prefixes")]
    pub static_prefixes: Vec<String>,

    /// File extensions routed cache-first as static assets.
    #[serde(default = "default_static_extensions")]
    pub static_extensions: Vec<String>,

    /// Optional cap on dynamic-store entries; oldest entries are pruned
    /// past it. None leaves the store unbounded.
    #[serde(default)]
    pub max_dynamic_entries: Option<usize>,
}

fn default_version() -> String {
    "v1".into()
}

fn default_cache_prefix() -> String {
    "overcast".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./overcast-store.sqlite")
}

fn default_base_url() -> String {
    "http://localhost:3000".into()
}

fn default_user_agent() -> String {
    "overcast/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_body_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_shell_manifest() -> Vec<String> {
    vec![
        "/".into(),
        "/index.html".into(),
        "/offline.html".into(),
        "/manifest.json".into(),
    ]
}

fn default_offline_path() -> String {
    "/offline.html".into()
}

fn default_api_prefixes() -> Vec<String> {
    vec!["/api/".into(), "/uploads/".into()]
}

fn default_static_prefixes() -> Vec<String> {
    vec!["/static/".into()]
}

fn default_static_extensions() -> Vec<String> {
    ["js", "css", "png", "jpg", "jpeg", "gif", "svg", "ico", "woff", "woff2", "ttf", "eot", "webp"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            cache_prefix: default_cache_prefix(),
            db_path: default_db_path(),
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_body_bytes: default_max_body_bytes(),
            shell_manifest: default_shell_manifest(),
            offline_path: default_offline_path(),
            api_prefixes: default_api_prefixes(),
            static_prefixes: default_static_prefixes(),
            static_extensions: default_static_extensions(),
            max_dynamic_entries: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Name of the shell store for this deployment version.
    pub fn shell_store(&self) -> String {
        format!("{}-shell-{}", self.cache_prefix, self.version)
    }

    /// Name of the dynamic store for this deployment version.
    pub fn dynamic_store(&self) -> String {
        format!("{}-dynamic-{}", self.cache_prefix, self.version)
    }

    /// The store names activation keeps; everything else is deleted.
    pub fn expected_stores(&self) -> [String; 2] {
        [self.shell_store(), self.dynamic_store()]
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `OVERCAST_`
    /// 2. TOML file from `OVERCAST_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("OVERCAST_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("OVERCAST_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.version, "v1");
        assert_eq!(config.cache_prefix, "overcast");
        assert_eq!(config.db_path, PathBuf::from("./overcast-store.sqlite"));
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.max_body_bytes, 5_242_880);
        assert!(config.max_dynamic_entries.is_none());
        assert!(config.shell_manifest.contains(&"/offline.html".to_string()));
    }

    #[test]
    fn test_store_names_embed_version() {
        let config = AppConfig { version: "v7".into(), ..Default::default() };
        assert_eq!(config.shell_store(), "overcast-shell-v7");
        assert_eq!(config.dynamic_store(), "overcast-dynamic-v7");
    }

    #[test]
    fn test_expected_stores() {
        let config = AppConfig::default();
        let expected = config.expected_stores();
        assert_eq!(expected, [config.shell_store(), config.dynamic_store()]);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }
}
