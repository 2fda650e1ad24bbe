//! Ticket hand-off for escalated conversations
//!
//! [`TicketSink`] is the seam to whatever help-desk system receives
//! escalations. The binary ships with [`LogTicketSink`]; tests inject their
//! own implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use triage::{PipelineEvent, Priority, TriggerKind};

/// Everything a help desk needs to pick up a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRequest {
    pub context_id: String,
    pub customer_id: Option<String>,
    pub priority: Priority,
    pub subject: String,
    /// Reason from the winning escalation rule
    pub reason: String,
    pub triggers: Vec<TriggerKind>,
    /// Message texts, oldest first
    pub transcript: Vec<String>,
    pub raised_at: DateTime<Utc>,
}

impl TicketRequest {
    /// Build from an `escalation_raised` event; `None` for any other event.
    pub fn from_event(event: &PipelineEvent) -> Option<Self> {
        let PipelineEvent::EscalationRaised {
            context_id,
            customer_id,
            decision,
            transcript,
            timestamp,
        } = event
        else {
            return None;
        };

        Some(Self {
            context_id: context_id.clone(),
            customer_id: customer_id.clone(),
            priority: decision.priority,
            subject: format!("[{}] Escalated conversation {}", decision.priority, context_id),
            reason: decision.reason.clone(),
            triggers: decision.triggers.iter().map(|t| t.kind).collect(),
            transcript: transcript.clone(),
            raised_at: *timestamp,
        })
    }
}

/// Acknowledgement from a ticket sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketReceipt {
    pub ticket_id: String,
    pub context_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    #[error("Ticket rejected for {context_id}: {message}")]
    Rejected { context_id: String, message: String },

    #[error("Ticket system unavailable: {0}")]
    Unavailable(String),
}

/// Receiver of escalated conversations
#[async_trait]
pub trait TicketSink: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Open a ticket. No retries are attempted by callers.
    async fn open_ticket(&self, request: &TicketRequest) -> Result<TicketReceipt, TicketError>;
}

/// Sink that writes tickets to the log and numbers them locally
#[derive(Debug, Default)]
pub struct LogTicketSink {
    next_id: AtomicU64,
}

impl LogTicketSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TicketSink for LogTicketSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn open_ticket(&self, request: &TicketRequest) -> Result<TicketReceipt, TicketError> {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let ticket_id = format!("TCK-{:06}", n);
        info!(
            ticket_id = %ticket_id,
            context_id = %request.context_id,
            customer_id = request.customer_id.as_deref().unwrap_or("-"),
            priority = %request.priority,
            messages = request.transcript.len(),
            "Ticket opened: {}",
            request.reason
        );
        Ok(TicketReceipt {
            ticket_id,
            context_id: request.context_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage::{EscalationDecision, FiredTrigger, SessionEndReason};

    fn raised() -> PipelineEvent {
        PipelineEvent::EscalationRaised {
            context_id: "s-1".to_string(),
            customer_id: Some("cust-7".to_string()),
            decision: EscalationDecision {
                should_escalate: true,
                priority: Priority::Critical,
                reason: "missing delivery: customer reports \"never arrived\"".to_string(),
                triggers: vec![FiredTrigger {
                    kind: TriggerKind::MissingDelivery,
                    priority: Priority::Critical,
                    detail: "customer reports \"never arrived\"".to_string(),
                }],
                context_id: "s-1".to_string(),
                decided_at: Utc::now(),
            },
            transcript: vec!["my package never arrived".to_string()],
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_request_from_escalation_event() {
        let request = TicketRequest::from_event(&raised()).unwrap();
        assert_eq!(request.priority, Priority::Critical);
        assert_eq!(request.customer_id.as_deref(), Some("cust-7"));
        assert_eq!(request.triggers, vec![TriggerKind::MissingDelivery]);
        assert!(request.subject.starts_with("[critical]"));
    }

    #[test]
    fn test_other_events_are_not_tickets() {
        let closed = PipelineEvent::SessionClosed {
            context_id: "s-1".to_string(),
            reason: SessionEndReason::Closed,
            messages: 2,
            timestamp: Utc::now(),
        };
        assert!(TicketRequest::from_event(&closed).is_none());
    }

    #[tokio::test]
    async fn test_log_sink_numbers_tickets() {
        let sink = LogTicketSink::new();
        let request = TicketRequest::from_event(&raised()).unwrap();
        let first = sink.open_ticket(&request).await.unwrap();
        let second = sink.open_ticket(&request).await.unwrap();
        assert_eq!(first.ticket_id, "TCK-000001");
        assert_eq!(second.ticket_id, "TCK-000002");
        assert_eq!(first.context_id, "s-1");
    }
}
