use crate::LookupError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Endpoint of a tool shed that serves repository dependency metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LookupConfig {
    pub url: String,
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Limit on a whole request, connect to last body byte. `0` disables it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl LookupConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_owned(),
            auth_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: &str) -> Self {
        self.auth_token = Some(token.to_owned());
        self
    }

    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Load config from `~/.config/berth/lookup.json`.
    pub fn load_default() -> Result<Self, LookupError> {
        let path = default_config_path()?;
        Self::load(&path)
    }

    pub fn load(path: &Path) -> Result<Self, LookupError> {
        let content = std::fs::read_to_string(path)?;
        let config: LookupConfig = serde_json::from_str(&content)
            .map_err(|e| LookupError::Malformed(format!("invalid lookup config: {e}")))?;
        Ok(Self {
            url: config.url.trim_end_matches('/').to_owned(),
            ..config
        })
    }
}

fn default_config_path() -> Result<PathBuf, LookupError> {
    let home = std::env::var("HOME")
        .map_err(|_| LookupError::Unreachable("HOME not set".to_owned()))?;
    Ok(PathBuf::from(home).join(".config/berth/lookup.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lookup.json");
        std::fs::write(
            &path,
            r#"{"url": "https://toolshed.example.org", "auth_token": "secret123", "timeout_secs": 5}"#,
        )
        .unwrap();

        let loaded = LookupConfig::load(&path).unwrap();
        assert_eq!(loaded.url, "https://toolshed.example.org");
        assert_eq!(loaded.auth_token.as_deref(), Some("secret123"));
        assert_eq!(loaded.timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn timeout_defaults_and_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lookup.json");
        std::fs::write(&path, r#"{"url": "https://example.com"}"#).unwrap();
        let loaded = LookupConfig::load(&path).unwrap();
        assert_eq!(loaded.timeout_secs, DEFAULT_TIMEOUT_SECS);

        let config = LookupConfig::new("https://example.com").with_timeout_secs(0);
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn config_strips_trailing_slash() {
        let config = LookupConfig::new("https://example.com/");
        assert_eq!(config.url, "https://example.com");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lookup.json");
        std::fs::write(&path, r#"{"url": "https://example.com//"}"#).unwrap();
        assert_eq!(LookupConfig::load(&path).unwrap().url, "https://example.com");
    }

    #[test]
    fn config_rejects_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lookup.json");
        std::fs::write(&path, r#"{"url": "https://example.com", "retries": 3}"#).unwrap();
        assert!(matches!(
            LookupConfig::load(&path),
            Err(LookupError::Malformed(_))
        ));
    }
}
