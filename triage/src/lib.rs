//! Customer-service triage core
//!
//! This library provides the deterministic decision logic behind the
//! customer-service agent pipeline:
//! - Keyword-rule intent classification with best-effort entity extraction
//! - Escalation rule evaluation over the full conversation context
//! - Static topic routing across the fixed stage order
//!   (Intent → Knowledge → Response → Escalation → Analytics)
//! - An in-process topic bus standing in for the external messaging layer
//!
//! # Usage
//!
//! ```ignore
//! use triage::{CustomerMessage, Pipeline, TopicBus, TriageConfig};
//!
//! let config = TriageConfig::load("triage.toml")?;
//! let bus = TopicBus::with_capacity(config.bus.capacity).shared();
//! let pipeline = Pipeline::new(&config, bus.clone());
//!
//! let outcome = pipeline
//!     .process(CustomerMessage::new("session-1", "cust-42", "Where is my order #12345?"))
//!     .await?;
//! assert!(!outcome.decision.should_escalate);
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod analytics;
pub mod config;
pub mod context;
pub mod error;
pub mod escalation;
pub mod events;
pub mod intent;
pub mod lexicon;
pub mod pipeline;
pub mod router;

// Re-export configuration types
pub use config::{
    BusConfig, IntentRule, LexiconConfig, SessionConfig, StageTopics, TopicConfig, TriageConfig,
};

// Re-export error types
pub use error::{ConfigError, ConfigResult, TriageError, TriageResult};

// Re-export intent types
pub use intent::{CustomerMessage, Intent, IntentClassificationResult, IntentClassifier};

// Re-export escalation types
pub use escalation::{
    EscalationDecision, EscalationEngine, EscalationRule, EscalationTrigger, FiredTrigger,
    Priority, SentimentDetector, SentimentScan, TriggerKind,
};

// Re-export context types
pub use context::{ConversationContext, ConversationStore, SharedContext};

// Re-export routing types
pub use router::{PipelineStage, Topic, TopicRouter};

// Re-export event types
pub use events::{
    Envelope, EventBusError, EventBusExt, EventBusResult, EventFilter, FilteredReceiver,
    PipelineEvent, SessionEndReason, SharedTopicBus, TopicBus,
};

// Re-export pipeline and analytics types
pub use analytics::{AnalyticsAggregator, AnalyticsSnapshot};
pub use pipeline::{Pipeline, PipelineOutcome};
