//! # tinymq core
//!
//! Runtime-agnostic pieces of the tinymq MQTT 3.1.1 broker.
//!
//! ## Contents
//!
//! - **protocol** - fixed header and remaining length codec, packet parsing and building
//! - **auth** - credential check and per-topic authorization gate
//! - **crypto** - AES-256-GCM protection of the configured password
//! - **config** - TOML broker configuration
//! - **payload** - payload classification for logging
//!
//! ## Limitations
//!
//! - QoS 0 only (fire and forget)
//! - No topic wildcards (+, #)
//! - No retained messages
//! - No persistent sessions

pub mod auth;
pub mod config;
pub mod crypto;
pub mod payload;
pub mod protocol;

pub use auth::AuthGate;
pub use config::{AuthConfig, BrokerConfig, ConfigError};
pub use crypto::CryptoError;
pub use payload::PayloadKind;
pub use protocol::ProtocolError;
