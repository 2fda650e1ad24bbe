//! Pipeline dispatcher
//!
//! Runs one customer message through classification, context update,
//! escalation evaluation and routing, publishing a hand-off event on the
//! topic of each stage it touches.
//!
//! Messages for the same conversation are serialized on that
//! conversation's context lock, and every event for a message is published
//! while the lock is held, so subscribers see a session's events in message
//! order. Different conversations run in parallel.

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument, Span};

use crate::config::TriageConfig;
use crate::context::{ConversationContext, ConversationStore};
use crate::error::TriageResult;
use crate::escalation::{EscalationDecision, EscalationEngine};
use crate::events::{preview, PipelineEvent, SessionEndReason, SharedTopicBus};
use crate::intent::{CustomerMessage, IntentClassificationResult, IntentClassifier};
use crate::router::{PipelineStage, Topic, TopicRouter};

/// What the pipeline decided for one message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub classification: IntentClassificationResult,
    pub decision: EscalationDecision,
    /// Topic the classified message was handed to
    pub route: Topic,
}

pub struct Pipeline {
    classifier: IntentClassifier,
    engine: EscalationEngine,
    router: Arc<TopicRouter>,
    store: Arc<ConversationStore>,
    bus: SharedTopicBus,
    idle_timeout: chrono::Duration,
}

fn message_span(message: &CustomerMessage) -> Span {
    tracing::info_span!(
        "triage.process",
        "context.id" = %message.context_id,
        "message.id" = %message.message_id,
    )
}

impl Pipeline {
    /// Build from an already-validated config.
    pub fn new(config: &TriageConfig, bus: SharedTopicBus) -> Self {
        Self {
            classifier: IntentClassifier::from_config(config),
            engine: EscalationEngine::from_config(config),
            router: TopicRouter::from_config(config).shared(),
            store: ConversationStore::new(config.session.max_history).shared(),
            bus,
            idle_timeout: config.idle_timeout(),
        }
    }

    /// Validate `config`, then build.
    pub fn try_new(config: &TriageConfig, bus: SharedTopicBus) -> TriageResult<Self> {
        config.validate()?;
        Ok(Self::new(config, bus))
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    pub fn engine(&self) -> &EscalationEngine {
        &self.engine
    }

    pub fn router(&self) -> &Arc<TopicRouter> {
        &self.router
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn bus(&self) -> &SharedTopicBus {
        &self.bus
    }

    /// Process one customer message.
    pub async fn process(&self, message: CustomerMessage) -> TriageResult<PipelineOutcome> {
        let span = message_span(&message);
        self.process_inner(message).instrument(span).await
    }

    async fn process_inner(&self, message: CustomerMessage) -> TriageResult<PipelineOutcome> {
        let mut context = self.store.lock_context(&message.context_id).await;
        let context_id = context.context_id.clone();

        self.bus.publish(
            self.router.stage_topic(PipelineStage::Intent),
            PipelineEvent::MessageReceived {
                context_id: context_id.clone(),
                message_id: message.message_id,
                customer_id: message.customer_id.clone(),
                preview: preview(&message.text),
                timestamp: Utc::now(),
            },
        )?;

        let classification = self.classifier.classify_message(&message);
        let route = self.router.route(&classification).clone();
        context.record(message, classification.clone());
        debug!(
            intent = %classification.intent,
            confidence = classification.confidence,
            route = %route,
            "Message classified"
        );

        self.bus.publish(
            &route,
            PipelineEvent::IntentClassified {
                context_id: context_id.clone(),
                message_id: classification.message_id,
                intent: classification.intent,
                confidence: classification.confidence,
                entities: classification.entities.clone(),
                route: route.clone(),
                timestamp: Utc::now(),
            },
        )?;

        let decision = self.engine.evaluate_escalation(&context, &classification);
        context.record_decision(&decision);

        let escalation_topic = self.router.stage_topic(PipelineStage::Escalation);
        self.bus.publish(
            escalation_topic,
            PipelineEvent::EscalationEvaluated {
                context_id: context_id.clone(),
                should_escalate: decision.should_escalate,
                priority: decision.priority,
                reason: decision.reason.clone(),
                timestamp: Utc::now(),
            },
        )?;

        if decision.should_escalate {
            info!(
                priority = %decision.priority,
                reason = %decision.reason,
                "Conversation escalated"
            );
            self.bus.publish(
                escalation_topic,
                PipelineEvent::EscalationRaised {
                    context_id: context_id.clone(),
                    customer_id: context.customer_id.clone(),
                    decision: decision.clone(),
                    transcript: context.transcript(),
                    timestamp: Utc::now(),
                },
            )?;
        }

        self.bus.publish(
            self.router.stage_topic(PipelineStage::Analytics),
            PipelineEvent::AnalyticsRecorded {
                context_id,
                intent: classification.intent,
                confidence: classification.confidence,
                escalated: decision.should_escalate,
                priority: decision.priority,
                timestamp: Utc::now(),
            },
        )?;

        Ok(PipelineOutcome {
            classification,
            decision,
            route,
        })
    }

    /// Process a batch concurrently. Results are in input order; messages
    /// of the same conversation are still applied one at a time.
    pub async fn process_all(
        &self,
        messages: Vec<CustomerMessage>,
    ) -> Vec<TriageResult<PipelineOutcome>> {
        join_all(messages.into_iter().map(|m| self.process(m))).await
    }

    /// Close a conversation and return its final state.
    pub async fn close_session(
        &self,
        context_id: &str,
    ) -> TriageResult<Option<ConversationContext>> {
        let Some(context) = self.store.remove(context_id).await else {
            return Ok(None);
        };
        self.publish_closed(&context, SessionEndReason::Closed)?;
        Ok(Some(context))
    }

    /// Evict conversations idle past the configured timeout.
    pub async fn evict_idle(&self) -> TriageResult<Vec<ConversationContext>> {
        let evicted = self.store.evict_idle(self.idle_timeout).await;
        for context in &evicted {
            self.publish_closed(context, SessionEndReason::IdleTimeout)?;
        }
        if !evicted.is_empty() {
            info!(count = evicted.len(), "Evicted idle conversations");
        }
        Ok(evicted)
    }

    fn publish_closed(
        &self,
        context: &ConversationContext,
        reason: SessionEndReason,
    ) -> TriageResult<()> {
        if context.is_escalated() {
            debug!(context_id = %context.context_id, %reason, "Closing escalated conversation");
        }
        let delivered = self.bus.publish(
            self.router.stage_topic(PipelineStage::Analytics),
            PipelineEvent::SessionClosed {
                context_id: context.context_id.clone(),
                reason,
                messages: context.message_count(),
                timestamp: Utc::now(),
            },
        )?;
        if delivered == 0 {
            warn!(context_id = %context.context_id, "Session closed with no analytics subscriber");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escalation::Priority;
    use crate::events::{EventBusExt, EventFilter, TopicBus};
    use crate::intent::Intent;

    fn pipeline() -> Pipeline {
        Pipeline::new(&TriageConfig::default(), TopicBus::new().shared())
    }

    #[tokio::test]
    async fn test_order_status_routes_to_orders() {
        let pipeline = pipeline();
        let mut rx = pipeline.bus().subscribe(&Topic::from("knowledge.orders"));

        let outcome = pipeline
            .process(CustomerMessage::new("s-1", "c-1", "Where is my order #12345?"))
            .await
            .unwrap();

        assert_eq!(outcome.classification.intent, Intent::OrderStatus);
        assert_eq!(outcome.route.as_str(), "knowledge.orders");
        assert!(!outcome.decision.should_escalate);

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.event.event_type(), "intent_classified");
    }

    #[tokio::test]
    async fn test_escalation_events_in_order() {
        let pipeline = pipeline();
        let mut rx = pipeline
            .bus()
            .subscribe_filtered(EventFilter::new().topic("escalation").context("s-2"));

        let outcome = pipeline
            .process(CustomerMessage::new("s-2", "c-2", "My package never arrived"))
            .await
            .unwrap();
        assert_eq!(outcome.decision.priority, Priority::Critical);

        let evaluated = rx.recv().await.unwrap();
        assert_eq!(evaluated.event.event_type(), "escalation_evaluated");
        let raised = rx.recv().await.unwrap();
        match raised.event {
            PipelineEvent::EscalationRaised {
                customer_id,
                transcript,
                ..
            } => {
                assert_eq!(customer_id.as_deref(), Some("c-2"));
                assert_eq!(transcript, vec!["My package never arrived".to_string()]);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_close_session_publishes_and_removes() {
        let pipeline = pipeline();
        let mut analytics = pipeline.bus().subscribe(&Topic::from("analytics"));
        pipeline
            .process(CustomerMessage::new("s-3", "c", "hello"))
            .await
            .unwrap();

        let closed = pipeline.close_session("s-3").await.unwrap().unwrap();
        assert_eq!(closed.message_count(), 1);
        assert!(pipeline.store().get("s-3").await.is_none());
        assert!(pipeline.close_session("s-3").await.unwrap().is_none());

        assert_eq!(analytics.recv().await.unwrap().event.event_type(), "analytics_recorded");
        assert_eq!(analytics.recv().await.unwrap().event.event_type(), "session_closed");
    }

    #[tokio::test]
    async fn test_message_racing_close_lands_in_fresh_session() {
        let pipeline = Arc::new(pipeline());
        let mut analytics = pipeline.bus().subscribe(&Topic::from("analytics"));
        let stale = pipeline.store().get_or_create("s-4").await;
        let held = stale.clone().lock_owned().await;

        let processing = tokio::spawn({
            let pipeline = pipeline.clone();
            async move {
                pipeline
                    .process(CustomerMessage::new("s-4", "c", "where is my order"))
                    .await
            }
        });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        let closing = tokio::spawn({
            let pipeline = pipeline.clone();
            async move { pipeline.close_session("s-4").await }
        });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        drop(held);

        processing.await.unwrap().unwrap();
        let closed = closing.await.unwrap().unwrap().unwrap();
        assert_eq!(closed.message_count(), 0);

        let live = pipeline.store().get("s-4").await.unwrap();
        assert!(!Arc::ptr_eq(&live, &stale));
        assert_eq!(live.lock().await.message_count(), 1);

        let mut seen = vec![
            analytics.recv().await.unwrap().event.event_type(),
            analytics.recv().await.unwrap().event.event_type(),
        ];
        seen.sort();
        assert_eq!(seen, vec!["analytics_recorded", "session_closed"]);
    }

    #[tokio::test]
    async fn test_try_new_rejects_invalid_config() {
        let mut config = TriageConfig::default();
        config.bus.capacity = 0;
        assert!(Pipeline::try_new(&config, TopicBus::new().shared()).is_err());
    }
}
