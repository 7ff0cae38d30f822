use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::broadcast;
use tracing::trace;

use neon_types::events::{Delivery, GatewayEvent, Topic};

/// Capacity of the shared event channel. Slow receivers that fall further
/// behind than this lose the oldest events.
const CHANNEL_CAPACITY: usize = 1024;

/// Outbound push seam used by the services.
///
/// Publishing is fire-and-forget: there is no acknowledgment, no retry and no
/// queue for absent subscribers. An event published while nobody listens on
/// its topic is dropped, and that is not an error. Durable state lives in the
/// store; a client that missed a push recovers by polling.
pub trait Publish: Send + Sync {
    fn publish(&self, topic: Topic, event: GatewayEvent);
}

/// Fans published events out to every connected gateway client.
/// Each connection filters the stream down to the topics it subscribed to.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Every published event; connections keep only their topics
    tx: broadcast::Sender<Delivery>,

    /// Number of live gateway connections
    connections: AtomicUsize,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(DispatcherInner {
                tx,
                connections: AtomicUsize::new(0),
            }),
        }
    }

    /// Subscribe to all published events.
    pub fn subscribe(&self) -> broadcast::Receiver<Delivery> {
        self.inner.tx.subscribe()
    }

    pub fn connection_opened(&self) -> usize {
        self.inner.connections.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn connection_closed(&self) -> usize {
        self.inner.connections.fetch_sub(1, Ordering::Relaxed).saturating_sub(1)
    }

    pub fn connection_count(&self) -> usize {
        self.inner.connections.load(Ordering::Relaxed)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Publish for Dispatcher {
    fn publish(&self, topic: Topic, event: GatewayEvent) {
        // Err only means there is no receiver at all right now.
        let receivers = self.inner.tx.send(Delivery { topic, event }).unwrap_or(0);
        trace!("Published on {} to {} receivers", topic, receivers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn publish_reaches_subscribers_with_topic() {
        let dispatcher = Dispatcher::new();
        let mut rx = dispatcher.subscribe();
        let user_id = Uuid::new_v4();

        dispatcher.publish(
            Topic::User(user_id),
            GatewayEvent::Ready { session_id: Uuid::nil() },
        );

        let delivery = rx.recv().await.unwrap();
        assert_eq!(delivery.topic, Topic::User(user_id));
        assert!(matches!(delivery.event, GatewayEvent::Ready { .. }));
    }

    #[test]
    fn publish_without_subscribers_is_not_an_error() {
        let dispatcher = Dispatcher::new();
        dispatcher.publish(
            Topic::Chat(Uuid::new_v4()),
            GatewayEvent::Ready { session_id: Uuid::nil() },
        );
    }

    #[test]
    fn connection_counter_tracks_open_and_close() {
        let dispatcher = Dispatcher::new();
        assert_eq!(dispatcher.connection_opened(), 1);
        assert_eq!(dispatcher.connection_opened(), 2);
        assert_eq!(dispatcher.connection_closed(), 1);
        assert_eq!(dispatcher.connection_count(), 1);
    }
}
