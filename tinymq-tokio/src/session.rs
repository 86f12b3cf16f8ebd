use std::hash::{Hash, Hasher};
use std::io;

use log::debug;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Write side of a connection
pub type FrameSink = Box<dyn AsyncWrite + Send + Unpin>;

/// Who a connection acts as, fixed by the CONNECT handshake
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Principal {
    #[default]
    Anonymous,
    User(String),
}

impl Principal {
    pub fn name(&self) -> Option<&str> {
        match self {
            Principal::Anonymous => None,
            Principal::User(name) => Some(name),
        }
    }
}

impl core::fmt::Display for Principal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Principal::Anonymous => write!(f, "anonymous"),
            Principal::User(name) => write!(f, "user '{}'", name),
        }
    }
}

/// One live connection as seen by the subscription registry.
///
/// Identity is the peer address and is the only thing compared or hashed.
/// The sink sits behind its own lock so that frames from concurrent
/// publishers are written whole, one after another.
pub struct Session {
    id: String,
    sink: Mutex<Option<FrameSink>>,
}

impl Session {
    pub fn new(id: impl Into<String>, sink: FrameSink) -> Self {
        Self {
            id: id.into(),
            sink: Mutex::new(Some(sink)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Write and flush one complete frame
    pub async fn send_frame(&self, frame: &[u8]) -> io::Result<()> {
        let mut guard = self.sink.lock().await;
        let sink = guard
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "session closed"))?;
        sink.write_all(frame).await?;
        sink.flush().await
    }

    /// Shut down and drop the sink. Safe to call more than once.
    pub async fn close(&self) {
        let sink = self.sink.lock().await.take();
        if let Some(mut sink) = sink {
            if let Err(e) = sink.shutdown().await {
                debug!("{}: error while closing: {}", self.id, e);
            }
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.sink.lock().await.is_none()
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Session {}

impl Hash for Session {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish()
    }
}
