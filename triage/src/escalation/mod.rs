//! Escalation — the second half of the rule evaluator
//!
//! Decides whether a conversation leaves automated handling. Rules are an
//! ordered, configurable table of `{trigger, priority}`; every enabled rule
//! is evaluated against the full conversation context.
//!
//! # Default table
//!
//! ```text
//! missing delivery ("never arrived")        → Critical
//! profanity in latest message                → High
//! refund/return amount above limit           → High
//! explicit request for a human               → High
//! frustration across >= N messages           → Medium
//! >= N messages in one conversation          → Medium
//! N identical low-confidence classifications → Medium  ("unclear responses")
//! ```
//!
//! The highest priority among fired rules wins; equal priorities go to the
//! rule declared first. Thresholds are configuration placeholders, not
//! tuned production values.

pub mod engine;
pub mod rules;
pub mod sentiment;

pub use engine::{EscalationDecision, EscalationEngine, FiredTrigger};
pub use rules::{EscalationRule, EscalationTrigger, Priority, TriggerKind};
pub use sentiment::{SentimentDetector, SentimentScan};
