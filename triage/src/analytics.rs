//! Analytics stage aggregation
//!
//! Counts what flowed through the pipeline: messages per intent,
//! escalations per priority, which triggers fired and the mean
//! classification confidence. Fed either directly from pipeline outcomes
//! or from events read off the analytics and escalation topics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::escalation::{EscalationDecision, Priority, TriggerKind};
use crate::events::PipelineEvent;
use crate::intent::{Intent, IntentClassificationResult};

/// Running totals for the analytics stage
#[derive(Debug, Default)]
pub struct AnalyticsAggregator {
    messages: u64,
    by_intent: BTreeMap<Intent, u64>,
    escalations: u64,
    by_priority: BTreeMap<Priority, u64>,
    triggers: BTreeMap<TriggerKind, u64>,
    confidence_sum: f64,
    /// Conversations seen and not yet closed
    open: HashSet<String>,
    conversations: u64,
    sessions_closed: u64,
}

/// Point-in-time view of the aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub total_messages: u64,
    /// Conversations seen; one closed and reopened counts twice
    pub unique_conversations: u64,
    pub open_conversations: usize,
    pub messages_by_intent: BTreeMap<Intent, u64>,
    pub escalations: u64,
    pub escalations_by_priority: BTreeMap<Priority, u64>,
    pub triggers_fired: BTreeMap<TriggerKind, u64>,
    /// Mean classification confidence; 0 before any message
    pub mean_confidence: f32,
    /// Escalated messages / total messages; 0 before any message
    pub escalation_rate: f32,
    pub sessions_closed: u64,
    pub generated_at: DateTime<Utc>,
}

impl AnalyticsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one processed message from its classification and decision.
    pub fn record(&mut self, result: &IntentClassificationResult, decision: &EscalationDecision) {
        self.record_message(
            &decision.context_id,
            result.intent,
            result.confidence,
            decision.should_escalate.then_some(decision.priority),
        );
        if decision.should_escalate {
            self.record_triggers(decision);
        }
    }

    /// Record an event read off the bus. Events the analytics stage does
    /// not track are ignored.
    pub fn record_event(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::AnalyticsRecorded {
                context_id,
                intent,
                confidence,
                escalated,
                priority,
                ..
            } => {
                let escalated = escalated.then_some(*priority);
                self.record_message(context_id, *intent, *confidence, escalated);
            }
            PipelineEvent::EscalationRaised { decision, .. } => self.record_triggers(decision),
            PipelineEvent::SessionClosed { context_id, .. } => {
                self.open.remove(context_id);
                self.sessions_closed += 1;
            }
            _ => {}
        }
    }

    fn record_message(
        &mut self,
        context_id: &str,
        intent: Intent,
        confidence: f32,
        escalated: Option<Priority>,
    ) {
        self.messages += 1;
        *self.by_intent.entry(intent).or_insert(0) += 1;
        self.confidence_sum += f64::from(confidence);
        if !self.open.contains(context_id) {
            self.open.insert(context_id.to_string());
            self.conversations += 1;
        }
        if let Some(priority) = escalated {
            self.escalations += 1;
            *self.by_priority.entry(priority).or_insert(0) += 1;
        }
    }

    fn record_triggers(&mut self, decision: &EscalationDecision) {
        for trigger in &decision.triggers {
            *self.triggers.entry(trigger.kind).or_insert(0) += 1;
        }
    }

    pub fn total_messages(&self) -> u64 {
        self.messages
    }

    pub fn snapshot(&self) -> AnalyticsSnapshot {
        let ratio = |n: f64| {
            if self.messages == 0 {
                0.0
            } else {
                (n / self.messages as f64) as f32
            }
        };
        AnalyticsSnapshot {
            total_messages: self.messages,
            unique_conversations: self.conversations,
            open_conversations: self.open.len(),
            messages_by_intent: self.by_intent.clone(),
            escalations: self.escalations,
            escalations_by_priority: self.by_priority.clone(),
            triggers_fired: self.triggers.clone(),
            mean_confidence: ratio(self.confidence_sum),
            escalation_rate: ratio(self.escalations as f64),
            sessions_closed: self.sessions_closed,
            generated_at: Utc::now(),
        }
    }
}
