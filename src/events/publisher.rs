use crate::constants::DEFAULT_EVENT_CHANNEL_CAPACITY;
use crate::state_machine::SequencerEvent;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Broadcast publisher for pipeline lifecycle events
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
    stats: Arc<PublisherCounters>,
}

/// Event that has been published
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub event_id: Uuid,
    pub name: String,
    pub context: Value,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Default)]
struct PublisherCounters {
    published: AtomicU64,
    undelivered: AtomicU64,
}

/// Snapshot of publisher activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventPublisherStats {
    pub published: u64,
    /// Events sent while nobody was subscribed
    pub undelivered: u64,
    pub subscribers: usize,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            stats: Arc::new(PublisherCounters::default()),
        }
    }

    /// Publish an event with the given name and context
    pub fn publish(&self, event_name: impl Into<String>, context: Value) {
        let event = PublishedEvent {
            event_id: Uuid::new_v4(),
            name: event_name.into(),
            context,
            published_at: chrono::Utc::now(),
        };

        self.stats.published.fetch_add(1, Ordering::Relaxed);
        // No subscribers is not an error for lifecycle events
        if self.sender.send(event).is_err() {
            self.stats.undelivered.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn publish_sequencer_event(&self, event: &SequencerEvent) {
        self.publish(event.event_name(), event.context());
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn stats(&self) -> EventPublisherStats {
        EventPublisherStats {
            published: self.stats.published.load(Ordering::Relaxed),
            undelivered: self.stats.undelivered.load(Ordering::Relaxed),
            subscribers: self.subscriber_count(),
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CHANNEL_CAPACITY)
    }
}
