//! # tinymq-tokio
//!
//! A Tokio-based MQTT 3.1.1 (QoS 0) broker built on `tinymq-core`.
//!
//! One task serves each connection. Subscriptions live in a shared
//! [`SubscriptionRegistry`] and every accepted PUBLISH is written to the
//! current subscribers of its exact topic.
//!
//! ## Example
//!
//! ```no_run
//! use tinymq_tokio::{BrokerConfig, BrokerServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = BrokerServer::new(BrokerConfig::default());
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

// Re-export core types for convenience
pub use tinymq_core::{AuthConfig, AuthGate, BrokerConfig, ConfigError, ProtocolError};

pub mod codec;
pub mod error;
pub mod handler;
pub mod registry;
pub mod server;
pub mod session;

pub use error::{BrokerError, FrameError};
pub use registry::SubscriptionRegistry;
pub use server::BrokerServer;
pub use session::{FrameSink, Principal, Session};
