//! Authentication and topic authorization for a single configured principal.

use log::{error, info, warn};

use crate::config::AuthConfig;

/// Decides who may connect and which topics a principal may use.
///
/// Built once from configuration and immutable afterwards, so it can be
/// shared by every connection without locking.
#[derive(Clone)]
pub struct AuthGate {
    auth_enabled: bool,
    allow_anonymous: bool,
    username: String,
    password: Option<String>,
    private_topics: Vec<String>,
}

impl AuthGate {
    /// Build a gate with an already decrypted password
    pub fn new(config: &AuthConfig, password: Option<String>) -> Self {
        Self {
            auth_enabled: config.enabled,
            allow_anonymous: config.allow_anonymous,
            username: config.username.clone(),
            password,
            private_topics: config.private_topic_list(),
        }
    }

    /// Build a gate, decrypting the configured password.
    ///
    /// A password that fails to decrypt is logged and treated as absent,
    /// which rejects every credential check while auth is enabled.
    pub fn from_config(config: &AuthConfig) -> Self {
        let password = match config.decrypted_password() {
            Ok(password) => password,
            Err(e) => {
                error!("Failed to decrypt configured password: {}", e);
                None
            }
        };
        if config.enabled && password.is_none() {
            warn!("Authentication enabled but no usable password configured");
        }

        let gate = Self::new(config, password);
        info!(
            "Authentication enabled: {}, anonymous allowed: {}",
            gate.auth_enabled, gate.allow_anonymous
        );
        if !gate.private_topics.is_empty() {
            info!("Private topics: {}", gate.private_topics.join(", "));
        }
        gate
    }

    pub fn is_auth_enabled(&self) -> bool {
        self.auth_enabled
    }

    pub fn allows_anonymous(&self) -> bool {
        self.allow_anonymous
    }

    /// Check CONNECT credentials against the configured principal
    pub fn authenticate(&self, username: Option<&str>, password: Option<&[u8]>) -> bool {
        if !self.auth_enabled {
            return true;
        }
        let (Some(username), Some(password)) = (username, password) else {
            return false;
        };
        if username != self.username {
            return false;
        }
        match &self.password {
            Some(expected) => expected.as_bytes() == password,
            None => false,
        }
    }

    /// Exact match, or a sub-topic of a private entry (`entry/...`)
    pub fn is_private_topic(&self, topic: &str) -> bool {
        self.private_topics.iter().any(|entry| {
            topic == entry
                || topic
                    .strip_prefix(entry.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    pub fn can_publish(&self, principal: Option<&str>, topic: &str) -> bool {
        self.check_access(principal, topic)
    }

    pub fn can_subscribe(&self, principal: Option<&str>, topic: &str) -> bool {
        self.check_access(principal, topic)
    }

    // private topics need a principal even with auth disabled
    fn check_access(&self, principal: Option<&str>, topic: &str) -> bool {
        if self.is_private_topic(topic) {
            return principal.is_some();
        }
        self.allow_anonymous || principal.is_some()
    }
}

impl core::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthGate")
            .field("auth_enabled", &self.auth_enabled)
            .field("allow_anonymous", &self.allow_anonymous)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("private_topics", &self.private_topics)
            .finish()
    }
}
