//! Topic bus for stage hand-offs
//!
//! Pub/sub over Tokio broadcast channels: one channel per topic plus a
//! firehose that sees every envelope. Stands in for the external messaging
//! layer; delivery is in-process and best-effort, so publishing to a topic
//! nobody listens on is not an error.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::types::PipelineEvent;
use crate::router::Topic;

/// Default channel capacity per topic
const CHANNEL_CAPACITY: usize = 256;

/// Error type for bus operations
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Cannot publish {event_type} to an empty topic name")]
    EmptyTopic { event_type: &'static str },
}

/// Result type for bus operations
pub type EventBusResult<T> = Result<T, EventBusError>;

/// Shared reference to TopicBus
pub type SharedTopicBus = Arc<TopicBus>;

/// An event together with the topic it was published on
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Envelope {
    pub topic: Topic,
    pub event: PipelineEvent,
}

/// Topic-addressed broadcast bus
pub struct TopicBus {
    channels: RwLock<HashMap<Topic, broadcast::Sender<Envelope>>>,
    firehose: broadcast::Sender<Envelope>,
    capacity: usize,
}

impl TopicBus {
    pub fn new() -> Self {
        Self::with_capacity(CHANNEL_CAPACITY)
    }

    /// Create a bus whose channels buffer `capacity` envelopes each
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (firehose, _) = broadcast::channel(capacity);
        Self {
            channels: RwLock::new(HashMap::new()),
            firehose,
            capacity,
        }
    }

    /// Create a shared reference to this bus
    pub fn shared(self) -> SharedTopicBus {
        Arc::new(self)
    }

    /// Publish an event on `topic`.
    ///
    /// Returns how many receivers the envelope reached, counting topic
    /// subscribers and firehose subscribers. Zero is fine.
    pub fn publish(&self, topic: &Topic, event: PipelineEvent) -> EventBusResult<usize> {
        let event_type = event.event_type();
        if topic.as_str().trim().is_empty() {
            return Err(EventBusError::EmptyTopic { event_type });
        }

        let envelope = Envelope {
            topic: topic.clone(),
            event,
        };

        let mut delivered = 0;
        {
            let channels = self.channels.read().unwrap_or_else(|e| e.into_inner());
            if let Some(sender) = channels.get(topic) {
                delivered += sender.send(envelope.clone()).unwrap_or(0);
            }
        }
        delivered += self.firehose.send(envelope).unwrap_or(0);

        debug!(topic = %topic, event_type, receivers = delivered, "Event published");
        Ok(delivered)
    }

    /// Subscribe to one topic
    pub fn subscribe(&self, topic: &Topic) -> broadcast::Receiver<Envelope> {
        if let Some(sender) = self
            .channels
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(topic)
        {
            return sender.subscribe();
        }

        let mut channels = self.channels.write().unwrap_or_else(|e| e.into_inner());
        channels
            .entry(topic.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Subscribe to every topic
    pub fn subscribe_all(&self) -> broadcast::Receiver<Envelope> {
        self.firehose.subscribe()
    }

    /// Current subscribers on `topic` (firehose excluded)
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.channels
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(topic)
            .map_or(0, |s| s.receiver_count())
    }

    /// Topics that have had at least one subscriber, sorted
    pub fn topics(&self) -> Vec<Topic> {
        let mut topics: Vec<Topic> = self
            .channels
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        topics.sort();
        topics
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for TopicBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Event filter for selective subscription
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Only this topic; `None` subscribes to the firehose
    pub topic: Option<Topic>,
    /// Filter by conversation
    pub context_id: Option<String>,
    /// Filter by event types
    pub event_types: Option<Vec<String>>,
}

impl EventFilter {
    /// Create a new empty filter (matches all events)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn topic(mut self, topic: impl Into<Topic>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn context(mut self, context_id: &str) -> Self {
        self.context_id = Some(context_id.to_string());
        self
    }

    pub fn types(mut self, event_types: Vec<&str>) -> Self {
        self.event_types = Some(event_types.into_iter().map(String::from).collect());
        self
    }

    /// Check if an envelope matches this filter
    pub fn matches(&self, envelope: &Envelope) -> bool {
        if let Some(ref topic) = self.topic {
            if &envelope.topic != topic {
                return false;
            }
        }

        if let Some(ref cid) = self.context_id {
            if envelope.event.context_id() != cid {
                return false;
            }
        }

        if let Some(ref types) = self.event_types {
            if !types.iter().any(|t| t == envelope.event.event_type()) {
                return false;
            }
        }

        true
    }
}

/// Receiver that only yields matching envelopes
pub struct FilteredReceiver {
    receiver: broadcast::Receiver<Envelope>,
    filter: EventFilter,
}

impl FilteredReceiver {
    pub fn new(receiver: broadcast::Receiver<Envelope>, filter: EventFilter) -> Self {
        Self { receiver, filter }
    }

    /// Receive the next matching envelope.
    ///
    /// A lagging receiver skips the envelopes it missed and keeps going;
    /// only a closed bus ends the stream.
    pub async fn recv(&mut self) -> Result<Envelope, broadcast::error::RecvError> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) if self.filter.matches(&envelope) => return Ok(envelope),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Subscriber lagged; skipping missed events");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Take the next matching envelope that is already buffered.
    pub fn try_recv(&mut self) -> Result<Envelope, broadcast::error::TryRecvError> {
        loop {
            match self.receiver.try_recv() {
                Ok(envelope) if self.filter.matches(&envelope) => return Ok(envelope),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Subscriber lagged; skipping missed events");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Extension trait for subscribing with filters
pub trait EventBusExt {
    /// Subscribe with a filter; a topic filter subscribes to that topic only
    fn subscribe_filtered(&self, filter: EventFilter) -> FilteredReceiver;
}

impl EventBusExt for TopicBus {
    fn subscribe_filtered(&self, filter: EventFilter) -> FilteredReceiver {
        let receiver = match &filter.topic {
            Some(topic) => self.subscribe(topic),
            None => self.subscribe_all(),
        };
        FilteredReceiver::new(receiver, filter)
    }
}

impl EventBusExt for SharedTopicBus {
    fn subscribe_filtered(&self, filter: EventFilter) -> FilteredReceiver {
        self.as_ref().subscribe_filtered(filter)
    }
}
