//! Escalation agent: turns raised escalations into tickets
//!
//! A conversation gets one ticket. Later escalations of the same
//! conversation open another ticket only when their priority is higher than
//! the one already ticketed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use triage::{
    EventBusExt, EventFilter, FilteredReceiver, PipelineEvent, PipelineStage, Priority,
    TopicBus, TopicRouter,
};

use super::next_envelope;
use crate::tickets::{TicketError, TicketReceipt, TicketRequest, TicketSink};

/// What the agent did before it stopped
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EscalationReport {
    pub opened: Vec<TicketReceipt>,
    /// Tickets the sink refused or could not take
    pub failed: usize,
    /// Escalations of an already-ticketed conversation at no higher priority
    #[serde(default)]
    pub duplicates: usize,
}

pub struct EscalationAgent {
    sink: Arc<dyn TicketSink>,
}

impl EscalationAgent {
    pub fn new(sink: Arc<dyn TicketSink>) -> Self {
        Self { sink }
    }

    /// Subscribe to escalations on the router's escalation stage topic.
    pub fn subscribe(bus: &TopicBus, router: &TopicRouter) -> FilteredReceiver {
        bus.subscribe_filtered(
            EventFilter::new()
                .topic(router.stage_topic(PipelineStage::Escalation).clone())
                .types(vec!["escalation_raised"]),
        )
    }

    /// Open a ticket for an `escalation_raised` event. Other events yield `None`.
    pub async fn handle(
        &self,
        event: &PipelineEvent,
    ) -> Option<Result<TicketReceipt, TicketError>> {
        let request = TicketRequest::from_event(event)?;
        Some(self.sink.open_ticket(&request).await)
    }

    /// Handle escalations until cancelled.
    pub async fn run(
        self,
        mut receiver: FilteredReceiver,
        cancel: CancellationToken,
    ) -> EscalationReport {
        info!(sink = self.sink.name(), "Escalation agent started");
        let mut report = EscalationReport::default();
        let mut ticketed: HashMap<String, Priority> = HashMap::new();

        while let Some(envelope) = next_envelope("escalation", &mut receiver, &cancel).await {
            let priority = match &envelope.event {
                PipelineEvent::EscalationRaised { decision, .. } => decision.priority,
                _ => continue,
            };
            let context_id = envelope.event.context_id();
            if ticketed.get(context_id).is_some_and(|open| *open >= priority) {
                debug!(context_id, %priority, "Conversation already ticketed");
                report.duplicates += 1;
                continue;
            }

            match self.handle(&envelope.event).await {
                Some(Ok(receipt)) => {
                    ticketed.insert(context_id.to_string(), priority);
                    info!(
                        ticket_id = %receipt.ticket_id,
                        context_id = %receipt.context_id,
                        "Escalation handed off"
                    );
                    report.opened.push(receipt);
                }
                Some(Err(e)) => {
                    warn!(
                        context_id = %envelope.event.context_id(),
                        sink = self.sink.name(),
                        "Failed to open ticket: {}",
                        e
                    );
                    report.failed += 1;
                }
                None => {}
            }
        }

        info!(
            opened = report.opened.len(),
            failed = report.failed,
            duplicates = report.duplicates,
            "Escalation agent stopped"
        );
        report
    }
}
