//! Event bus implementation
//!
//! This module provides the event bus abstraction and the in-memory
//! implementation used to fan change events out to listeners.

use crate::types::Event;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};

/// Event bus error types.
#[derive(Debug, Error)]
pub enum EventBusError {
    /// Failed to publish event
    #[error("Failed to publish event: {0}")]
    PublishError(String),

    /// Failed to subscribe
    #[error("Failed to subscribe: {0}")]
    SubscribeError(String),

    /// Unknown subscription id
    #[error("Unknown subscription: {0}")]
    UnknownSubscription(String),

    /// Channel closed
    #[error("Channel closed")]
    ChannelClosed,
}

/// Result type for event bus operations.
pub type EventBusResult<T> = Result<T, EventBusError>;

/// Subscription handle for receiving events.
pub struct Subscription {
    /// Subscription ID
    pub id: String,
    /// Topic pattern
    pub topic: String,
    /// Event receiver
    pub receiver: broadcast::Receiver<Event>,
}

impl Subscription {
    /// Receive the next event.
    pub async fn recv(&mut self) -> EventBusResult<Event> {
        self.receiver
            .recv()
            .await
            .map_err(|_| EventBusError::ChannelClosed)
    }

    /// Receive the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }
}

/// Event handler trait for processing events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an event.
    async fn handle(&self, event: Event) -> EventBusResult<()>;

    /// Get the topics this handler is interested in.
    fn topics(&self) -> Vec<String>;
}

/// Event bus trait for publish/subscribe operations.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an event.
    async fn publish(&self, event: Event) -> EventBusResult<()>;

    /// Subscribe to a topic pattern.
    ///
    /// Topic patterns support wildcards:
    /// - `*` matches any single segment
    /// - `#` matches zero or more segments
    ///
    /// Examples:
    /// - `filing.org_unit.*` matches `filing.org_unit.created`, `filing.org_unit.deleted`
    /// - `filing.#` matches every event of the access core
    async fn subscribe(&self, topic: &str) -> EventBusResult<Subscription>;

    /// Register an event handler.
    async fn register_handler(&self, handler: Arc<dyn EventHandler>) -> EventBusResult<()>;

    /// Unsubscribe from a topic.
    async fn unsubscribe(&self, subscription_id: &str) -> EventBusResult<()>;

    /// Get event bus stats.
    async fn stats(&self) -> EventBusStats;
}

/// Event bus statistics.
#[derive(Debug, Clone, Default)]
pub struct EventBusStats {
    /// Total events published
    pub events_published: u64,
    /// Total events delivered
    pub events_delivered: u64,
    /// Active subscriptions
    pub active_subscriptions: usize,
    /// Registered handlers
    pub registered_handlers: usize,
}

/// A live subscription: its pattern and the sending half of its channel.
struct Subscriber {
    pattern: String,
    sender: broadcast::Sender<Event>,
}

/// In-memory event bus implementation.
///
/// Every subscription owns its broadcast channel, so unsubscribing drops the
/// sender and closes the receiver. Delivery to a subscriber preserves publish
/// order. Subscriptions whose receiver was dropped are pruned on publish.
pub struct MemoryEventBus {
    /// Subscribers by subscription id
    subscribers: Arc<RwLock<HashMap<String, Subscriber>>>,
    /// Registered handlers
    handlers: Arc<RwLock<Vec<Arc<dyn EventHandler>>>>,
    /// Statistics
    stats: Arc<RwLock<EventBusStats>>,
    /// Default channel capacity
    channel_capacity: usize,
}

impl std::fmt::Debug for MemoryEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEventBus")
            .field("channel_capacity", &self.channel_capacity)
            .finish()
    }
}

impl MemoryEventBus {
    /// Create a new in-memory event bus.
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create with custom channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            handlers: Arc::new(RwLock::new(Vec::new())),
            stats: Arc::new(RwLock::new(EventBusStats::default())),
            channel_capacity: capacity.max(1),
        }
    }

    /// Check if a topic matches a pattern.
    pub fn topic_matches(pattern: &str, topic: &str) -> bool {
        let pattern_parts: Vec<&str> = pattern.split('.').collect();
        let topic_parts: Vec<&str> = topic.split('.').collect();
        Self::segments_match(&pattern_parts, &topic_parts)
    }

    fn segments_match(pattern: &[&str], topic: &[&str]) -> bool {
        match (pattern.first(), topic.first()) {
            (None, None) => true,
            (Some(&"#"), _) => {
                // Zero segments, or consume one and stay on '#'
                Self::segments_match(&pattern[1..], topic)
                    || (!topic.is_empty() && Self::segments_match(pattern, &topic[1..]))
            }
            (Some(_), None) | (None, Some(_)) => false,
            (Some(&"*"), Some(_)) => Self::segments_match(&pattern[1..], &topic[1..]),
            (Some(p), Some(t)) => p == t && Self::segments_match(&pattern[1..], &topic[1..]),
        }
    }
}

impl Default for MemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(&self, event: Event) -> EventBusResult<()> {
        let topic = event.topic();
        let mut delivered = 0u64;
        let mut dropped = Vec::new();

        // Notify matching subscribers
        {
            let subscribers = self.subscribers.read().await;
            for (id, subscriber) in subscribers.iter() {
                if subscriber.sender.receiver_count() == 0 {
                    dropped.push(id.clone());
                } else if Self::topic_matches(&subscriber.pattern, &topic)
                    && subscriber.sender.send(event.clone()).is_ok()
                {
                    delivered += 1;
                }
            }
        }

        if !dropped.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            let before = subscribers.len();
            for id in &dropped {
                subscribers.remove(id);
            }
            let pruned = before - subscribers.len();
            let mut stats = self.stats.write().await;
            stats.active_subscriptions = stats.active_subscriptions.saturating_sub(pruned);
            tracing::debug!(pruned, "Pruned dropped subscriptions");
        }

        // Notify handlers
        {
            let handlers = self.handlers.read().await;
            for handler in handlers.iter() {
                if handler
                    .topics()
                    .iter()
                    .any(|handler_topic| Self::topic_matches(handler_topic, &topic))
                {
                    let handler = handler.clone();
                    let event = event.clone();
                    delivered += 1;
                    tokio::spawn(async move {
                        if let Err(e) = handler.handle(event).await {
                            tracing::warn!(error = %e, "Event handler failed");
                        }
                    });
                }
            }
        }

        let mut stats = self.stats.write().await;
        stats.events_published += 1;
        stats.events_delivered += delivered;

        tracing::trace!(topic = %topic, event_id = %event.id, delivered, "Event published");
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> EventBusResult<Subscription> {
        if topic.is_empty() {
            return Err(EventBusError::SubscribeError("empty topic pattern".to_string()));
        }
        let id = uuid::Uuid::now_v7().to_string();

        let (sender, receiver) = broadcast::channel(self.channel_capacity);
        self.subscribers.write().await.insert(
            id.clone(),
            Subscriber {
                pattern: topic.to_string(),
                sender,
            },
        );

        {
            let mut stats = self.stats.write().await;
            stats.active_subscriptions += 1;
        }

        Ok(Subscription {
            id,
            topic: topic.to_string(),
            receiver,
        })
    }

    async fn register_handler(&self, handler: Arc<dyn EventHandler>) -> EventBusResult<()> {
        let mut handlers = self.handlers.write().await;
        handlers.push(handler);

        let mut stats = self.stats.write().await;
        stats.registered_handlers += 1;

        Ok(())
    }

    async fn unsubscribe(&self, subscription_id: &str) -> EventBusResult<()> {
        // Dropping the sender closes the subscription's receiver.
        let removed = self.subscribers.write().await.remove(subscription_id);
        if removed.is_none() {
            return Err(EventBusError::UnknownSubscription(subscription_id.to_string()));
        }

        let mut stats = self.stats.write().await;
        stats.active_subscriptions = stats.active_subscriptions.saturating_sub(1);

        Ok(())
    }

    async fn stats(&self) -> EventBusStats {
        self.stats.read().await.clone()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_memory_event_bus_publish_subscribe() {
        let bus = MemoryEventBus::new();

        let mut sub = bus.subscribe("filing.org_unit.*").await.unwrap();

        let event = Event::new("org_unit.created", serde_json::json!({}));
        bus.publish(event.clone()).await.unwrap();

        let received = tokio::time::timeout(Duration::from_millis(100), sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.id, event.id);
    }

    #[tokio::test]
    async fn test_non_matching_subscription_receives_nothing() {
        let bus = MemoryEventBus::new();
        let mut sub = bus.subscribe("filing.access_rule.*").await.unwrap();

        bus.publish(Event::new("org_unit.created", serde_json::json!({})))
            .await
            .unwrap();

        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_topic_matching() {
        // Exact match
        assert!(MemoryEventBus::topic_matches("filing.org_unit.created", "filing.org_unit.created"));

        // Single wildcard
        assert!(MemoryEventBus::topic_matches("filing.org_unit.*", "filing.org_unit.created"));
        assert!(MemoryEventBus::topic_matches("filing.*.deleted", "filing.org_unit.deleted"));
        assert!(MemoryEventBus::topic_matches("*.org_unit.created", "filing.org_unit.created"));

        // Multi-segment wildcard
        assert!(MemoryEventBus::topic_matches("filing.#", "filing.org_unit.created"));
        assert!(MemoryEventBus::topic_matches("#", "filing.org_unit.created"));
        assert!(MemoryEventBus::topic_matches("filing.#.deleted", "filing.org_unit.deleted"));
        assert!(MemoryEventBus::topic_matches("filing.#", "filing"));

        // Non-matches
        assert!(!MemoryEventBus::topic_matches("filing.org_unit.updated", "filing.org_unit.created"));
        assert!(!MemoryEventBus::topic_matches("filing.*", "filing.org_unit.created"));
        assert!(!MemoryEventBus::topic_matches("other.#", "filing.org_unit.created"));
    }

    struct CountingHandler {
        count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _event: Event) -> EventBusResult<()> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn topics(&self) -> Vec<String> {
            vec!["filing.access_override.*".to_string()]
        }
    }

    #[tokio::test]
    async fn test_registered_handler_is_invoked() {
        let bus = MemoryEventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.register_handler(Arc::new(CountingHandler {
            count: count.clone(),
        }))
        .await
        .unwrap();

        bus.publish(Event::new("access_override.granted", serde_json::json!({})))
            .await
            .unwrap();
        bus.publish(Event::new("org_unit.created", serde_json::json!({})))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let bus = MemoryEventBus::new();

        let stats = bus.stats().await;
        assert_eq!(stats.events_published, 0);
        assert_eq!(stats.active_subscriptions, 0);

        let sub = bus.subscribe("filing.#").await.unwrap();
        let stats = bus.stats().await;
        assert_eq!(stats.active_subscriptions, 1);

        bus.publish(Event::new("org_unit.created", serde_json::json!({})))
            .await
            .unwrap();

        let stats = bus.stats().await;
        assert_eq!(stats.events_published, 1);
        assert_eq!(stats.events_delivered, 1);

        bus.unsubscribe(&sub.id).await.unwrap();
        assert_eq!(bus.stats().await.active_subscriptions, 0);
        assert!(bus.unsubscribe(&sub.id).await.is_err());
    }

    #[tokio::test]
    async fn test_unsubscribed_handle_receives_nothing() {
        let bus = MemoryEventBus::new();
        let mut gone = bus.subscribe("filing.#").await.unwrap();
        let mut kept = bus.subscribe("filing.#").await.unwrap();

        bus.unsubscribe(&gone.id).await.unwrap();
        bus.publish(Event::new("org_unit.created", serde_json::json!({})))
            .await
            .unwrap();

        assert!(gone.try_recv().is_none());
        assert!(matches!(gone.recv().await, Err(EventBusError::ChannelClosed)));
        assert_eq!(kept.try_recv().unwrap().event_type, "org_unit.created");
        assert_eq!(bus.stats().await.events_delivered, 1);
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_pruned() {
        let bus = MemoryEventBus::new();
        let sub = bus.subscribe("filing.#").await.unwrap();
        let id = sub.id.clone();
        drop(sub);

        bus.publish(Event::new("org_unit.created", serde_json::json!({})))
            .await
            .unwrap();

        let stats = bus.stats().await;
        assert_eq!(stats.active_subscriptions, 0);
        assert_eq!(stats.events_delivered, 0);
        assert!(bus.unsubscribe(&id).await.is_err());
    }
}
