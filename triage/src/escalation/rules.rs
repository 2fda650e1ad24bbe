//! Escalation rule table types

use serde::{Deserialize, Serialize};

/// Ticket priority for an escalated conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Condition that fires an escalation rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EscalationTrigger {
    /// Latest message reports a delivery that never arrived
    MissingDelivery,
    /// Latest message hits the profanity lexicon
    Profanity,
    /// At least `min_messages` messages in the context hit the frustration lexicon
    Frustration { min_messages: u32 },
    /// The customer has sent at least `threshold` messages in this context
    RepeatedContact { threshold: u32 },
    /// A refund/return message mentions an amount above `limit`
    RefundAboveLimit { limit: f64 },
    /// The last `consecutive` classifications are identical and at or below `max_confidence`
    UnclearResponses { consecutive: u32, max_confidence: f32 },
    /// Customer asks for a human
    ExplicitRequest,
}

impl EscalationTrigger {
    pub fn kind(&self) -> TriggerKind {
        match self {
            Self::MissingDelivery => TriggerKind::MissingDelivery,
            Self::Profanity => TriggerKind::Profanity,
            Self::Frustration { .. } => TriggerKind::Frustration,
            Self::RepeatedContact { .. } => TriggerKind::RepeatedContact,
            Self::RefundAboveLimit { .. } => TriggerKind::RefundAboveLimit,
            Self::UnclearResponses { .. } => TriggerKind::UnclearResponses,
            Self::ExplicitRequest => TriggerKind::ExplicitRequest,
        }
    }
}

impl std::fmt::Display for EscalationTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Frustration { min_messages } => {
                write!(f, "frustration (>= {} messages)", min_messages)
            }
            Self::RepeatedContact { threshold } => {
                write!(f, "repeated contact (>= {} messages)", threshold)
            }
            Self::RefundAboveLimit { limit } => write!(f, "refund above {:.2}", limit),
            Self::UnclearResponses {
                consecutive,
                max_confidence,
            } => write!(
                f,
                "unclear responses ({} consecutive <= {:.2})",
                consecutive, max_confidence
            ),
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// Parameter-free name of a trigger, used in decisions and analytics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    MissingDelivery,
    Profanity,
    Frustration,
    RepeatedContact,
    RefundAboveLimit,
    UnclearResponses,
    ExplicitRequest,
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDelivery => write!(f, "missing delivery"),
            Self::Profanity => write!(f, "profanity"),
            Self::Frustration => write!(f, "frustration"),
            Self::RepeatedContact => write!(f, "repeated contact"),
            Self::RefundAboveLimit => write!(f, "refund above limit"),
            Self::UnclearResponses => write!(f, "unclear responses"),
            Self::ExplicitRequest => write!(f, "explicit human request"),
        }
    }
}

/// One row of the escalation table: a trigger and the priority it assigns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationRule {
    pub trigger: EscalationTrigger,
    pub priority: Priority,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl EscalationRule {
    pub fn new(trigger: EscalationTrigger, priority: Priority) -> Self {
        Self {
            trigger,
            priority,
            enabled: true,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}
