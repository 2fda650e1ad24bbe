//! Event types for the triage pipeline
//!
//! Every stage hand-off is one of these events, published on the topic of
//! the stage that should act on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::escalation::{EscalationDecision, Priority};
use crate::intent::Intent;
use crate::router::Topic;

/// Longest message preview carried on `message_received`
pub const PREVIEW_CHARS: usize = 120;

/// All pipeline events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A customer message entered the pipeline
    MessageReceived {
        context_id: String,
        message_id: Uuid,
        customer_id: String,
        preview: String,
        timestamp: DateTime<Utc>,
    },

    /// A message was classified and routed
    IntentClassified {
        context_id: String,
        message_id: Option<Uuid>,
        intent: Intent,
        confidence: f32,
        #[serde(default)]
        entities: BTreeMap<String, String>,
        route: Topic,
        timestamp: DateTime<Utc>,
    },

    /// The escalation rules were evaluated for a message
    EscalationEvaluated {
        context_id: String,
        should_escalate: bool,
        priority: Priority,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A conversation needs a human; carries what a ticket needs
    EscalationRaised {
        context_id: String,
        customer_id: Option<String>,
        decision: EscalationDecision,
        /// Retained message texts, oldest first
        transcript: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// Per-message record for the analytics stage
    AnalyticsRecorded {
        context_id: String,
        intent: Intent,
        confidence: f32,
        escalated: bool,
        priority: Priority,
        timestamp: DateTime<Utc>,
    },

    /// A conversation was closed or evicted
    SessionClosed {
        context_id: String,
        reason: SessionEndReason,
        messages: u32,
        timestamp: DateTime<Utc>,
    },
}

impl PipelineEvent {
    /// Get the timestamp of this event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            PipelineEvent::MessageReceived { timestamp, .. } => *timestamp,
            PipelineEvent::IntentClassified { timestamp, .. } => *timestamp,
            PipelineEvent::EscalationEvaluated { timestamp, .. } => *timestamp,
            PipelineEvent::EscalationRaised { timestamp, .. } => *timestamp,
            PipelineEvent::AnalyticsRecorded { timestamp, .. } => *timestamp,
            PipelineEvent::SessionClosed { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            PipelineEvent::MessageReceived { .. } => "message_received",
            PipelineEvent::IntentClassified { .. } => "intent_classified",
            PipelineEvent::EscalationEvaluated { .. } => "escalation_evaluated",
            PipelineEvent::EscalationRaised { .. } => "escalation_raised",
            PipelineEvent::AnalyticsRecorded { .. } => "analytics_recorded",
            PipelineEvent::SessionClosed { .. } => "session_closed",
        }
    }

    /// Conversation the event belongs to
    pub fn context_id(&self) -> &str {
        match self {
            PipelineEvent::MessageReceived { context_id, .. }
            | PipelineEvent::IntentClassified { context_id, .. }
            | PipelineEvent::EscalationEvaluated { context_id, .. }
            | PipelineEvent::EscalationRaised { context_id, .. }
            | PipelineEvent::AnalyticsRecorded { context_id, .. }
            | PipelineEvent::SessionClosed { context_id, .. } => context_id,
        }
    }
}

/// Short single-line preview of customer text
pub fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
        format!("{}…", cut)
    }
}

/// Why a conversation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEndReason {
    /// Closed by the caller
    Closed,
    /// Evicted after the idle timeout
    IdleTimeout,
}

impl std::fmt::Display for SessionEndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEndReason::Closed => write!(f, "closed"),
            SessionEndReason::IdleTimeout => write!(f, "idle_timeout"),
        }
    }
}
