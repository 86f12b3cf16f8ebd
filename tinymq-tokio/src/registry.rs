use std::sync::Arc;

use dashmap::DashMap;
use log::{debug, warn};

use crate::session::Session;

/// Snapshot of one topic's subscribers
pub type Subscribers = Arc<Vec<Arc<Session>>>;

/// Exact-match topic to subscriber mapping shared by all connections.
///
/// Each topic's list is copy-on-write: readers clone the `Arc` and iterate
/// without holding any map lock, writers replace the list. A fan-out sees
/// either the list before or after a concurrent change, never a partial one.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    topics: DashMap<String, Subscribers>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `session` to the subscribers of `topic`.
    ///
    /// Subscribing twice delivers each message twice.
    pub fn subscribe(&self, topic: &str, session: Arc<Session>) {
        let mut entry = self.topics.entry(topic.to_string()).or_default();
        Arc::make_mut(entry.value_mut()).push(session);
    }

    /// Current subscribers of `topic`, if it was ever subscribed
    pub fn subscribers(&self, topic: &str) -> Option<Subscribers> {
        self.topics.get(topic).map(|entry| Arc::clone(entry.value()))
    }

    /// Write `frame` to every subscriber of `topic`.
    ///
    /// A failed write is logged and skipped; the failing session is left for
    /// its own handler to clean up. Returns the number of successful writes.
    pub async fn publish_to(&self, topic: &str, frame: &[u8]) -> usize {
        // the map guard is released here, before any write
        let Some(subscribers) = self.subscribers(topic) else {
            return 0;
        };

        let mut delivered = 0;
        for session in subscribers.iter() {
            match session.send_frame(frame).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    "Failed to deliver to {} on topic '{}': {}",
                    session.id(),
                    topic,
                    e
                ),
            }
        }
        delivered
    }

    /// Remove `session` from every topic. Topics left empty are kept.
    ///
    /// Returns the number of subscriptions removed.
    pub fn unsubscribe_all(&self, session: &Session) -> usize {
        let mut removed = 0;
        for mut entry in self.topics.iter_mut() {
            if !entry.value().iter().any(|s| s.as_ref() == session) {
                continue;
            }
            let subscribers = Arc::make_mut(entry.value_mut());
            let before = subscribers.len();
            subscribers.retain(|s| s.as_ref() != session);
            removed += before - subscribers.len();
        }
        if removed > 0 {
            debug!("Removed {} subscription(s) of {}", removed, session.id());
        }
        removed
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, |entry| entry.value().len())
    }
}
