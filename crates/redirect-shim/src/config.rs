//! Shim configuration

use std::time::Duration;

use crate::error::ConfigError;

/// Environment variable holding the backend API root
pub const ENV_API_ROOT: &str = "LEGACY_SHIM_API_ROOT";
/// Environment variable holding the outbound request timeout, in seconds
pub const ENV_TIMEOUT_SECS: &str = "LEGACY_SHIM_TIMEOUT_SECS";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the shim forwards translated requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShimConfig {
    api_root: String,
    request_timeout: Duration,
}

impl ShimConfig {
    /// Build a config for the given backend root.
    ///
    /// The root is normalized to end with `/`, since endpoint paths are
    /// appended directly to it.
    pub fn new(api_root: impl Into<String>) -> Result<Self, ConfigError> {
        let api_root = api_root.into();
        let trimmed = api_root.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::Missing("api_root"));
        }
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ConfigError::InvalidApiRoot {
                value: api_root.clone(),
                reason: "must be an http(s) URL",
            });
        }

        let mut root = trimmed.to_string();
        if !root.ends_with('/') {
            root.push('/');
        }

        Ok(Self {
            api_root: root,
            request_timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Load from `LEGACY_SHIM_API_ROOT` and `LEGACY_SHIM_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_root = std::env::var(ENV_API_ROOT).map_err(|_| ConfigError::Missing(ENV_API_ROOT))?;
        let config = Self::new(api_root)?;

        match std::env::var(ENV_TIMEOUT_SECS) {
            Ok(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    field: ENV_TIMEOUT_SECS,
                    value: raw.clone(),
                })?;
                Ok(config.with_timeout(Duration::from_secs(secs)))
            }
            Err(_) => Ok(config),
        }
    }

    /// Backend root, always ending in `/`
    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn profile_search_url(&self) -> String {
        format!("{}api/profiles/minecraft", self.api_root)
    }

    pub fn session_profile_url(&self, uuid: &str) -> String {
        format!("{}sessionserver/session/minecraft/profile/{}", self.api_root, uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_gets_trailing_slash() {
        let config = ShimConfig::new("https://auth.example.com/api/yggdrasil").unwrap();
        assert_eq!(config.api_root(), "https://auth.example.com/api/yggdrasil/");
        assert_eq!(
            config.profile_search_url(),
            "https://auth.example.com/api/yggdrasil/api/profiles/minecraft"
        );
        assert_eq!(
            config.session_profile_url("0123abcd"),
            "https://auth.example.com/api/yggdrasil/sessionserver/session/minecraft/profile/0123abcd"
        );
    }

    #[test]
    fn test_existing_slash_kept() {
        let config = ShimConfig::new("http://localhost:8080/").unwrap();
        assert_eq!(config.api_root(), "http://localhost:8080/");
        assert_eq!(config.request_timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_invalid_roots() {
        assert!(matches!(ShimConfig::new("  "), Err(ConfigError::Missing(_))));
        assert!(matches!(
            ShimConfig::new("ftp://example.com"),
            Err(ConfigError::InvalidApiRoot { .. })
        ));
    }

    #[test]
    fn test_with_timeout() {
        let config = ShimConfig::new("http://localhost/")
            .unwrap()
            .with_timeout(Duration::from_secs(3));
        assert_eq!(config.request_timeout(), Duration::from_secs(3));
    }
}
