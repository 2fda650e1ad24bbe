//! Event-driven stage hand-offs
//!
//! Stages of the customer-service pipeline talk to each other by publishing
//! [`PipelineEvent`]s on named topics. The [`TopicBus`] is an in-process
//! broadcast bus with the same shape as the external messaging layer.
//!
//! # Event Flow
//!
//! ```text
//! ┌──────────────┐  message_received   ┌──────────────────┐
//! │   Pipeline   │────────────────────▶│ intent-classifier│
//! │  (process)   │  intent_classified  ├──────────────────┤
//! │              │────────────────────▶│ knowledge.<area> │
//! │              │ escalation_raised   ├──────────────────┤
//! │              │────────────────────▶│    escalation    │
//! │              │ analytics_recorded  ├──────────────────┤
//! │              │────────────────────▶│    analytics     │
//! └──────────────┘                     └──────────────────┘
//! ```
//!
//! Every envelope is also delivered to firehose subscribers
//! ([`TopicBus::subscribe_all`]).

pub mod bus;
pub mod types;

// Re-export core types
pub use bus::{
    Envelope, EventBusError, EventBusExt, EventBusResult, EventFilter, FilteredReceiver,
    SharedTopicBus, TopicBus,
};
pub use types::{preview, PipelineEvent, SessionEndReason};
