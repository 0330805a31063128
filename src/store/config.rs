use std::fs;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

// Defaults carried over from the original deployment: signed URLs live for
// 15 minutes, the signer token is refreshed every 30 minutes and requested
// with a 2 hour expiry.
const DEFAULT_URL_EXPIRY_SECS: u64 = 15 * 60;
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30 * 60;
const DEFAULT_TOKEN_EXPIRY_SECS: u64 = 2 * 60 * 60;

fn default_url_expiry_secs() -> u64 {
    DEFAULT_URL_EXPIRY_SECS
}

fn default_refresh_interval_secs() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

fn default_token_expiry_secs() -> u64 {
    DEFAULT_TOKEN_EXPIRY_SECS
}

/// Construction-time configuration for the cloud asset store.
///
/// Immutable once the store is built. The URL prefix actually used for asset
/// URLs is selected by the `public` flag; only the selected prefix has to be
/// present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetStoreConfig {
    pub app_name: String,
    pub host: String,
    pub auth_token: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub public_url_prefix: String,
    #[serde(default)]
    pub private_url_prefix: String,
    #[serde(default = "default_url_expiry_secs")]
    pub url_expiry_secs: u64,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_token_expiry_secs")]
    pub token_expiry_secs: u64,
}

impl AssetStoreConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let raw = fs::read_to_string(path).context("reading asset store config file")?;
        let config: AssetStoreConfig =
            serde_json::from_str(&raw).context("parsing asset store config JSON")?;
        Ok(config)
    }

    /// Reject incomplete configuration before any background activity starts.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.app_name.is_empty() {
            return Err(StoreError::MissingConfig("app name"));
        }
        if self.host.is_empty() {
            return Err(StoreError::MissingConfig("host"));
        }
        if self.auth_token.is_empty() {
            return Err(StoreError::MissingConfig("auth token"));
        }
        if self.public && self.public_url_prefix.is_empty() {
            return Err(StoreError::MissingConfig("public URL prefix"));
        }
        if !self.public && self.private_url_prefix.is_empty() {
            return Err(StoreError::MissingConfig("private URL prefix"));
        }
        // tokio::time::interval panics on a zero period, which would kill
        // the refresh loop inside its spawned task with nothing surfaced.
        if self.url_expiry_secs == 0 {
            return Err(StoreError::ZeroDuration("URL expiry"));
        }
        if self.refresh_interval_secs == 0 {
            return Err(StoreError::ZeroDuration("refresh interval"));
        }
        if self.token_expiry_secs == 0 {
            return Err(StoreError::ZeroDuration("token expiry"));
        }
        Ok(())
    }

    /// The prefix selected by the visibility flag.
    pub fn url_prefix(&self) -> &str {
        if self.public {
            &self.public_url_prefix
        } else {
            &self.private_url_prefix
        }
    }

    pub fn url_expiry(&self) -> Duration {
        Duration::from_secs(self.url_expiry_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn token_expiry(&self) -> Duration {
        Duration::from_secs(self.token_expiry_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn base_config() -> AssetStoreConfig {
        AssetStoreConfig {
            app_name: "app".to_string(),
            host: "https://assets.example.com".to_string(),
            auth_token: "secret".to_string(),
            public: false,
            public_url_prefix: String::new(),
            private_url_prefix: "https://cdn.example.com/assets".to_string(),
            url_expiry_secs: default_url_expiry_secs(),
            refresh_interval_secs: default_refresh_interval_secs(),
            token_expiry_secs: default_token_expiry_secs(),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_missing_fields_rejected() {
        let mut config = base_config();
        config.app_name.clear();
        assert!(matches!(
            config.validate(),
            Err(StoreError::MissingConfig("app name"))
        ));

        let mut config = base_config();
        config.host.clear();
        assert!(matches!(
            config.validate(),
            Err(StoreError::MissingConfig("host"))
        ));

        let mut config = base_config();
        config.auth_token.clear();
        assert!(matches!(
            config.validate(),
            Err(StoreError::MissingConfig("auth token"))
        ));
    }

    #[test]
    fn test_zero_durations_rejected() {
        let mut config = base_config();
        config.refresh_interval_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(StoreError::ZeroDuration("refresh interval"))
        ));

        let mut config = base_config();
        config.url_expiry_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(StoreError::ZeroDuration("URL expiry"))
        ));

        let mut config = base_config();
        config.token_expiry_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(StoreError::ZeroDuration("token expiry"))
        ));
    }

    #[test]
    fn test_prefix_required_only_for_selected_visibility() {
        // Private store: the missing public prefix is fine.
        assert!(base_config().validate().is_ok());

        let mut config = base_config();
        config.public = true;
        assert!(matches!(
            config.validate(),
            Err(StoreError::MissingConfig("public URL prefix"))
        ));

        config.public_url_prefix = "https://cdn.example.com/public".to_string();
        assert!(config.validate().is_ok());
        assert_eq!(config.url_prefix(), "https://cdn.example.com/public");

        let mut config = base_config();
        config.private_url_prefix.clear();
        assert!(matches!(
            config.validate(),
            Err(StoreError::MissingConfig("private URL prefix"))
        ));
    }

    #[test]
    fn test_from_file_applies_duration_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{
                "app_name": "app",
                "host": "https://assets.example.com",
                "auth_token": "secret",
                "private_url_prefix": "https://cdn.example.com/assets"
            }}"#
        )
        .unwrap();

        let config = AssetStoreConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert!(!config.public);
        assert_eq!(config.url_expiry(), Duration::from_secs(900));
        assert_eq!(config.refresh_interval(), Duration::from_secs(1800));
        assert_eq!(config.token_expiry(), Duration::from_secs(7200));
    }

    #[test]
    fn test_from_file_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{not json").unwrap();
        assert!(AssetStoreConfig::from_file(file.path().to_str().unwrap()).is_err());
    }
}
