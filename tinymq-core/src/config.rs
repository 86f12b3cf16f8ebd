//! Broker configuration loaded from a TOML file.
//!
//! ```toml
//! port = 1883
//!
//! [auth]
//! enabled = true
//! username = "admin"
//! password = "<output of `tinymq encrypt-password`>"
//! allow_anonymous = true
//! private_topics = "admin, system/config"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::crypto::{self, CryptoError, DEFAULT_KEY, KEY_LEN};

pub const DEFAULT_PORT: u16 = 1883;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrokerConfig {
    /// Interface to bind (default: 0.0.0.0)
    pub host: String,
    /// Listening port (default: 1883)
    pub port: u16,
    pub auth: AuthConfig,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            auth: AuthConfig::default(),
        }
    }
}

impl BrokerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(ConfigError::Parse)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Require credentials on CONNECT (default: false)
    pub enabled: bool,
    /// The single accepted user name (default: admin)
    pub username: String,
    /// Encrypted password, see [`crate::crypto`]; empty means none configured
    pub password: String,
    /// Base64 encryption key; the built-in key is used when absent
    pub key: Option<String>,
    /// Let clients without a principal use public topics (default: true)
    pub allow_anonymous: bool,
    /// Comma-separated private topic prefixes
    pub private_topics: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            username: "admin".to_string(),
            password: String::new(),
            key: None,
            allow_anonymous: true,
            private_topics: String::new(),
        }
    }
}

impl AuthConfig {
    /// Private topic entries, trimmed, with empty entries dropped
    pub fn private_topic_list(&self) -> Vec<String> {
        self.private_topics
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn encryption_key(&self) -> Result<[u8; KEY_LEN], CryptoError> {
        match &self.key {
            Some(encoded) => crypto::decode_key(encoded),
            None => Ok(DEFAULT_KEY),
        }
    }

    /// Plaintext password, or `None` when no password is configured
    pub fn decrypted_password(&self) -> Result<Option<String>, CryptoError> {
        if self.password.trim().is_empty() {
            return Ok(None);
        }
        let key = self.encryption_key()?;
        crypto::decrypt_password(&self.password, &key).map(Some)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    /// Configuration file could not be read
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Configuration file is not valid TOML or has unexpected fields
    Parse(toml::de::Error),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "Failed to read config {}: {}", path.display(), source)
            }
            ConfigError::Parse(error) => write!(f, "Invalid config: {}", error),
        }
    }
}

impl core::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(error) => Some(error),
        }
    }
}
