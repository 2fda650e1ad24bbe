//! Conversation Context — per-session message and intent history

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::escalation::EscalationDecision;
use crate::intent::{CustomerMessage, IntentClassificationResult};

/// Accumulated state for one customer conversation
///
/// Messages and their classifications are kept in lockstep: index `i` of
/// `intent_history` is the classification of `messages[i]`. Only the most
/// recent `max_history` pairs are retained; `total_messages` keeps counting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationContext {
    /// Conversation identifier
    pub context_id: String,
    /// Customer id from the first message, if any
    pub customer_id: Option<String>,
    messages: Vec<CustomerMessage>,
    intent_history: Vec<IntentClassificationResult>,
    /// Decisions that escalated, oldest first
    escalations: Vec<EscalationDecision>,
    /// Messages ever recorded, including ones trimmed from history
    total_messages: u32,
    max_history: usize,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl ConversationContext {
    pub fn new(context_id: impl Into<String>, max_history: usize) -> Self {
        let now = Utc::now();
        Self {
            context_id: context_id.into(),
            customer_id: None,
            messages: Vec::new(),
            intent_history: Vec::new(),
            escalations: Vec::new(),
            total_messages: 0,
            max_history: max_history.max(1),
            created_at: now,
            last_activity: now,
        }
    }

    /// Append a message together with its classification.
    pub fn record(&mut self, message: CustomerMessage, result: IntentClassificationResult) {
        if self.customer_id.is_none() && !message.customer_id.is_empty() {
            self.customer_id = Some(message.customer_id.clone());
        }
        self.last_activity = message.received_at.max(self.last_activity);
        self.messages.push(message);
        self.intent_history.push(result);
        self.total_messages = self.total_messages.saturating_add(1);

        if self.messages.len() > self.max_history {
            let excess = self.messages.len() - self.max_history;
            self.messages.drain(..excess);
            self.intent_history.drain(..excess);
        }
    }

    /// Keep a decision if it escalated.
    pub fn record_decision(&mut self, decision: &EscalationDecision) {
        if decision.should_escalate {
            self.escalations.push(decision.clone());
        }
    }

    pub fn messages(&self) -> &[CustomerMessage] {
        &self.messages
    }

    pub fn intent_history(&self) -> &[IntentClassificationResult] {
        &self.intent_history
    }

    pub fn escalations(&self) -> &[EscalationDecision] {
        &self.escalations
    }

    pub fn latest_message(&self) -> Option<&CustomerMessage> {
        self.messages.last()
    }

    pub fn latest_classification(&self) -> Option<&IntentClassificationResult> {
        self.intent_history.last()
    }

    /// The last `n` classifications (fewer if history is shorter), oldest first
    pub fn recent_classifications(&self, n: usize) -> &[IntentClassificationResult] {
        let start = self.intent_history.len().saturating_sub(n);
        &self.intent_history[start..]
    }

    /// Messages ever recorded in this conversation
    pub fn message_count(&self) -> u32 {
        self.total_messages
    }

    pub fn is_escalated(&self) -> bool {
        !self.escalations.is_empty()
    }

    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_activity
    }

    /// Message texts, oldest first, for hand-off transcripts
    pub fn transcript(&self) -> Vec<String> {
        self.messages.iter().map(|m| m.text.clone()).collect()
    }
}
