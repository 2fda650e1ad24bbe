//! Escalation Engine — deterministic hand-off decisions
//!
//! Consumes a ConversationContext and the latest IntentClassificationResult
//! to produce an EscalationDecision. All decisions are deterministic; the
//! only inputs are the context, the latest classification and the
//! configured rule table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::rules::{EscalationRule, EscalationTrigger, Priority, TriggerKind};
use super::sentiment::{SentimentDetector, SentimentScan};
use crate::config::{LexiconConfig, TriageConfig};
use crate::context::ConversationContext;
use crate::intent::entities::{parse_amount, AMOUNT};
use crate::intent::IntentClassificationResult;

/// A rule that fired during evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiredTrigger {
    pub kind: TriggerKind,
    pub priority: Priority,
    /// What in the conversation caused the rule to fire
    pub detail: String,
}

/// Decision produced by the Escalation Engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationDecision {
    /// Whether the conversation should be handed to a human
    pub should_escalate: bool,
    /// Highest priority among fired rules; `Low` when nothing fired
    pub priority: Priority,
    /// Reason from the winning rule
    pub reason: String,
    /// Every rule that fired, in declaration order
    #[serde(default)]
    pub triggers: Vec<FiredTrigger>,
    /// Conversation this decision belongs to
    pub context_id: String,
    pub decided_at: DateTime<Utc>,
}

impl EscalationDecision {
    fn no_escalation(context_id: &str) -> Self {
        Self {
            should_escalate: false,
            priority: Priority::Low,
            reason: "no escalation rule fired".to_string(),
            triggers: Vec::new(),
            context_id: context_id.to_string(),
            decided_at: Utc::now(),
        }
    }

    /// Whether a given trigger kind contributed to this decision
    pub fn fired(&self, kind: TriggerKind) -> bool {
        self.triggers.iter().any(|t| t.kind == kind)
    }
}

/// The Escalation Engine — evaluates the configured rule table
#[derive(Debug, Clone)]
pub struct EscalationEngine {
    rules: Vec<EscalationRule>,
    detector: SentimentDetector,
}

impl EscalationEngine {
    /// Build from a validated rule table and lexicons
    pub fn new(rules: Vec<EscalationRule>, lexicons: &LexiconConfig) -> Self {
        Self {
            rules,
            detector: SentimentDetector::new(lexicons),
        }
    }

    pub fn from_config(config: &TriageConfig) -> Self {
        Self::new(config.escalation_rules.clone(), &config.lexicons)
    }

    pub fn rules(&self) -> &[EscalationRule] {
        &self.rules
    }

    pub fn detector(&self) -> &SentimentDetector {
        &self.detector
    }

    /// Evaluate every enabled rule against the full context.
    ///
    /// `latest` must already be recorded in `context`; the engine reads the
    /// message it was classified from out of the context history. If any rule
    /// fires, the decision escalates at the highest fired priority, with ties
    /// going to the rule declared first.
    pub fn evaluate_escalation(
        &self,
        context: &ConversationContext,
        latest: &IntentClassificationResult,
    ) -> EscalationDecision {
        let latest_text = latest
            .message_id
            .and_then(|id| context.messages().iter().rev().find(|m| m.message_id == id))
            .or_else(|| context.latest_message())
            .map(|m| m.text.as_str())
            .unwrap_or("");
        let scan = self.detector.scan(latest_text);

        let mut fired: Vec<FiredTrigger> = Vec::new();
        for rule in self.rules.iter().filter(|r| r.enabled) {
            if let Some(detail) = self.check(&rule.trigger, context, latest, &scan) {
                debug!(
                    context_id = %context.context_id,
                    trigger = %rule.trigger.kind(),
                    priority = %rule.priority,
                    detail = %detail,
                    "Escalation rule fired"
                );
                fired.push(FiredTrigger {
                    kind: rule.trigger.kind(),
                    priority: rule.priority,
                    detail,
                });
            }
        }

        let mut winner: Option<&FiredTrigger> = None;
        for trigger in &fired {
            if winner.map_or(true, |w| trigger.priority > w.priority) {
                winner = Some(trigger);
            }
        }

        let Some(winner) = winner else {
            return EscalationDecision::no_escalation(&context.context_id);
        };

        let decision = EscalationDecision {
            should_escalate: true,
            priority: winner.priority,
            reason: format!("{}: {}", winner.kind, winner.detail),
            context_id: context.context_id.clone(),
            decided_at: Utc::now(),
            triggers: fired.clone(),
        };
        info!(
            context_id = %decision.context_id,
            priority = %decision.priority,
            triggers = decision.triggers.len(),
            "Escalating conversation: {}",
            decision.reason
        );
        decision
    }

    /// Returns a detail string if the trigger fires.
    fn check(
        &self,
        trigger: &EscalationTrigger,
        context: &ConversationContext,
        latest: &IntentClassificationResult,
        scan: &SentimentScan,
    ) -> Option<String> {
        match trigger {
            EscalationTrigger::MissingDelivery => scan
                .missing_delivery
                .as_ref()
                .map(|p| format!("customer reports \"{}\"", p)),
            EscalationTrigger::Profanity => scan
                .profanity
                .as_ref()
                .map(|p| format!("abusive language (\"{}\")", p)),
            EscalationTrigger::Frustration { min_messages } => {
                let count = self.detector.frustrated_messages(context);
                (count >= *min_messages)
                    .then(|| format!("{} frustrated messages (threshold: {})", count, min_messages))
            }
            EscalationTrigger::RepeatedContact { threshold } => {
                let count = context.message_count();
                (count >= *threshold).then(|| {
                    format!("{} messages in conversation (threshold: {})", count, threshold)
                })
            }
            EscalationTrigger::RefundAboveLimit { limit } => {
                if !latest.intent.is_refund_related() {
                    return None;
                }
                let amount = latest.entity(AMOUNT).and_then(parse_amount)?;
                (amount > *limit)
                    .then(|| format!("refund of {:.2} exceeds limit {:.2}", amount, limit))
            }
            EscalationTrigger::UnclearResponses {
                consecutive,
                max_confidence,
            } => {
                let n = *consecutive as usize;
                let recent = context.recent_classifications(n);
                if n == 0 || recent.len() < n {
                    return None;
                }
                let first = &recent[0];
                let unclear = recent
                    .iter()
                    .all(|r| r.intent == first.intent && r.is_low_confidence(*max_confidence));
                unclear.then(|| {
                    format!(
                        "{} consecutive {} classifications at confidence <= {:.2}",
                        n, first.intent, max_confidence
                    )
                })
            }
            EscalationTrigger::ExplicitRequest => scan
                .human_request
                .as_ref()
                .map(|p| format!("customer asked for a person (\"{}\")", p)),
        }
    }
}

impl Default for EscalationEngine {
    fn default() -> Self {
        Self::from_config(&TriageConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{CustomerMessage, Intent, IntentClassifier};

    /// Classify and record a message, then evaluate; mirrors the pipeline order.
    fn send(
        engine: &EscalationEngine,
        classifier: &IntentClassifier,
        ctx: &mut ConversationContext,
        text: &str,
    ) -> (IntentClassificationResult, EscalationDecision) {
        let message = CustomerMessage::new(ctx.context_id.clone(), "cust-1", text);
        let result = classifier.classify_message(&message);
        ctx.record(message, result.clone());
        let decision = engine.evaluate_escalation(ctx, &result);
        (result, decision)
    }

    fn setup() -> (EscalationEngine, IntentClassifier, ConversationContext) {
        (
            EscalationEngine::default(),
            IntentClassifier::default(),
            ConversationContext::new("ctx-1", 50),
        )
    }

    #[test]
    fn test_order_status_does_not_escalate() {
        let (engine, classifier, mut ctx) = setup();
        let (result, decision) = send(&engine, &classifier, &mut ctx, "Where is my order #12345?");
        assert_eq!(result.intent, Intent::OrderStatus);
        assert!(!decision.should_escalate);
        assert_eq!(decision.priority, Priority::Low);
        assert!(decision.triggers.is_empty());
    }

    #[test]
    fn test_profanity_escalates_high() {
        let (engine, classifier, mut ctx) = setup();
        let (result, decision) = send(
            &engine,
            &classifier,
            &mut ctx,
            "Your product is garbage and I'm furious",
        );
        assert_eq!(result.intent, Intent::Complaint);
        assert!(decision.should_escalate);
        assert_eq!(decision.priority, Priority::High);
        assert!(decision.fired(TriggerKind::Profanity));
    }

    #[test]
    fn test_profanity_in_latest_message_after_calm_history() {
        let (engine, classifier, mut ctx) = setup();
        send(&engine, &classifier, &mut ctx, "hi, do you ship to Canada?");
        send(&engine, &classifier, &mut ctx, "ok and how long does it take");
        let (_, decision) = send(&engine, &classifier, &mut ctx, "wtf this is taking forever");
        assert!(decision.should_escalate);
        assert!(decision.priority >= Priority::High);
    }

    #[test]
    fn test_missing_delivery_is_critical() {
        let (engine, classifier, mut ctx) = setup();
        let (_, decision) = send(
            &engine,
            &classifier,
            &mut ctx,
            "My package never arrived and this is crap",
        );
        assert!(decision.should_escalate);
        assert_eq!(decision.priority, Priority::Critical);
        assert!(decision.fired(TriggerKind::MissingDelivery));
        assert!(decision.fired(TriggerKind::Profanity));
        assert!(decision.reason.starts_with("missing delivery"));
    }

    #[test]
    fn test_unclear_responses_after_three_messages() {
        let (engine, classifier, mut ctx) = setup();
        let (_, d1) = send(&engine, &classifier, &mut ctx, "hmm");
        let (_, d2) = send(&engine, &classifier, &mut ctx, "ok then");
        assert!(!d1.should_escalate);
        assert!(!d2.should_escalate);

        let (result, d3) = send(&engine, &classifier, &mut ctx, "what?");
        assert_eq!(result.intent, Intent::GeneralInquiry);
        assert!(d3.should_escalate);
        assert_eq!(d3.priority, Priority::Medium);
        assert!(d3.fired(TriggerKind::UnclearResponses));
    }

    #[test]
    fn test_unclear_responses_reset_by_clear_message() {
        let (engine, classifier, mut ctx) = setup();
        send(&engine, &classifier, &mut ctx, "hmm");
        send(&engine, &classifier, &mut ctx, "ok then");
        send(&engine, &classifier, &mut ctx, "what is your return policy");
        let (_, decision) = send(&engine, &classifier, &mut ctx, "ok");
        assert!(!decision.fired(TriggerKind::UnclearResponses));
    }

    #[test]
    fn test_repeated_contact_threshold() {
        let rules = vec![EscalationRule::new(
            EscalationTrigger::RepeatedContact { threshold: 2 },
            Priority::Low,
        )];
        let engine = EscalationEngine::new(rules, &LexiconConfig::default());
        let classifier = IntentClassifier::default();
        let mut ctx = ConversationContext::new("ctx-2", 50);

        let (_, d1) = send(&engine, &classifier, &mut ctx, "do you sell gift cards");
        assert!(!d1.should_escalate);
        let (_, d2) = send(&engine, &classifier, &mut ctx, "do you sell gift cards");
        assert!(d2.should_escalate);
        assert_eq!(d2.priority, Priority::Low);
    }

    #[test]
    fn test_refund_above_limit() {
        let rules = vec![EscalationRule::new(
            EscalationTrigger::RefundAboveLimit { limit: 100.0 },
            Priority::High,
        )];
        let engine = EscalationEngine::new(rules, &LexiconConfig::default());
        let classifier = IntentClassifier::default();

        let mut ctx = ConversationContext::new("small", 50);
        let (_, small) = send(&engine, &classifier, &mut ctx, "I want a refund of $40");
        assert!(!small.should_escalate);

        let mut ctx = ConversationContext::new("large", 50);
        let (_, large) = send(&engine, &classifier, &mut ctx, "I want a refund of $1,250.00");
        assert!(large.should_escalate);
        assert_eq!(large.priority, Priority::High);

        // Amount without a refund intent never fires
        let mut ctx = ConversationContext::new("price", 50);
        let (_, price) = send(&engine, &classifier, &mut ctx, "is the $500 product in stock");
        assert!(!price.should_escalate);
    }

    #[test]
    fn test_frustration_accumulates_across_context() {
        let rules = vec![EscalationRule::new(
            EscalationTrigger::Frustration { min_messages: 2 },
            Priority::Medium,
        )];
        let engine = EscalationEngine::new(rules, &LexiconConfig::default());
        let classifier = IntentClassifier::default();
        let mut ctx = ConversationContext::new("ctx-3", 50);

        let (_, d1) = send(&engine, &classifier, &mut ctx, "this is ridiculous");
        assert!(!d1.should_escalate);
        let (_, d2) = send(&engine, &classifier, &mut ctx, "can you check my order");
        assert!(!d2.should_escalate);
        let (_, d3) = send(&engine, &classifier, &mut ctx, "I'm really upset now");
        assert!(d3.should_escalate);
    }

    #[test]
    fn test_ties_go_to_first_declared_rule() {
        let rules = vec![
            EscalationRule::new(EscalationTrigger::ExplicitRequest, Priority::High),
            EscalationRule::new(EscalationTrigger::Profanity, Priority::High),
        ];
        let engine = EscalationEngine::new(rules, &LexiconConfig::default());
        let classifier = IntentClassifier::default();
        let mut ctx = ConversationContext::new("ctx-4", 50);

        let (_, decision) = send(
            &engine,
            &classifier,
            &mut ctx,
            "this is crap, let me speak to a manager",
        );
        assert_eq!(decision.triggers.len(), 2);
        assert!(decision.reason.starts_with("explicit human request"));
    }

    #[test]
    fn test_disabled_rules_are_skipped() {
        let rules = vec![
            EscalationRule::new(EscalationTrigger::Profanity, Priority::High).with_enabled(false),
        ];
        let engine = EscalationEngine::new(rules, &LexiconConfig::default());
        let classifier = IntentClassifier::default();
        let mut ctx = ConversationContext::new("ctx-5", 50);
        let (_, decision) = send(&engine, &classifier, &mut ctx, "garbage");
        assert!(!decision.should_escalate);
    }

    #[test]
    fn test_empty_context_does_not_panic() {
        let engine = EscalationEngine::default();
        let ctx = ConversationContext::new("empty", 50);
        let result = IntentClassifier::default().classify_intent("");
        let decision = engine.evaluate_escalation(&ctx, &result);
        assert!(!decision.should_escalate);
        assert_eq!(decision.context_id, "empty");
    }
}
