//! Triage configuration
//!
//! The keyword table, escalation table, lexicons and topic names are all
//! configuration. A [`TriageConfig`] is constructed explicitly (defaults, a
//! file, or a string) and validated before anything is built from it, so a
//! malformed table fails at startup rather than mid-conversation.
//!
//! # File format
//!
//! ```toml
//! default_confidence = 0.5
//!
//! [[intent_keywords]]
//! intent = "ORDER_STATUS"
//! keywords = ["where is my order", "tracking"]
//! confidence = 0.9
//!
//! [[escalation_rules]]
//! trigger = { kind = "missing_delivery" }
//! priority = "critical"
//!
//! [[escalation_rules]]
//! trigger = { kind = "refund_above_limit", limit = 500.0 }
//! priority = "high"
//!
//! [lexicons]
//! profanity = ["garbage", "wtf"]
//!
//! [topics]
//! fallback = "knowledge.general"
//! ```
//!
//! Sections that are left out keep their defaults. YAML and JSON files with
//! the same structure are accepted based on the file extension.
//!
//! # Environment Variables
//!
//! | Variable | Field |
//! |---|---|
//! | `TRIAGE_DEFAULT_CONFIDENCE` | `default_confidence` |
//! | `TRIAGE_MAX_HISTORY` | `session.max_history` |
//! | `TRIAGE_IDLE_TIMEOUT_SECS` | `session.idle_timeout_secs` |
//! | `TRIAGE_BUS_CAPACITY` | `bus.capacity` |

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::escalation::{EscalationRule, EscalationTrigger, Priority};
use crate::intent::Intent;
use crate::lexicon::normalize;
use crate::router::PipelineStage;

/// One keyword rule: any keyword selects `intent` at `confidence`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentRule {
    pub intent: Intent,
    pub keywords: Vec<String>,
    #[serde(default = "default_rule_confidence")]
    pub confidence: f32,
}

fn default_rule_confidence() -> f32 {
    0.8
}

impl IntentRule {
    pub fn new<I, S>(intent: Intent, keywords: I, confidence: f32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            intent,
            keywords: keywords.into_iter().map(Into::into).collect(),
            confidence,
        }
    }
}

/// Phrase lists used by the escalation triggers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexiconConfig {
    pub profanity: Vec<String>,
    pub frustration: Vec<String>,
    pub missing_delivery: Vec<String>,
    pub human_request: Vec<String>,
}

impl Default for LexiconConfig {
    fn default() -> Self {
        Self {
            profanity: strings(&[
                "garbage", "crap", "damn", "wtf", "sucks", "shit", "bullshit", "hell",
                "screw you", "stupid", "idiot", "idiots",
            ]),
            frustration: strings(&[
                "furious", "angry", "frustrated", "frustrating", "unacceptable", "ridiculous",
                "fed up", "annoyed", "upset", "terrible", "worst", "disappointed",
            ]),
            missing_delivery: strings(&[
                "never arrived", "never received", "never got", "not received",
                "didn't arrive", "didn't receive", "hasn't arrived", "lost package",
                "package lost", "missing package", "package missing", "stolen package",
            ]),
            human_request: strings(&[
                "speak to a human", "talk to a human", "speak to someone", "talk to someone",
                "real person", "human agent", "live agent", "supervisor", "manager",
            ]),
        }
    }
}

/// Topic of each pipeline stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageTopics {
    pub intent: String,
    pub knowledge: String,
    pub response: String,
    pub escalation: String,
    pub analytics: String,
}

impl StageTopics {
    pub fn get(&self, stage: PipelineStage) -> &str {
        match stage {
            PipelineStage::Intent => &self.intent,
            PipelineStage::Knowledge => &self.knowledge,
            PipelineStage::Response => &self.response,
            PipelineStage::Escalation => &self.escalation,
            PipelineStage::Analytics => &self.analytics,
        }
    }
}

impl Default for StageTopics {
    fn default() -> Self {
        Self {
            intent: "intent-classifier".to_string(),
            knowledge: "knowledge-retrieval".to_string(),
            response: "response-generator".to_string(),
            escalation: "escalation".to_string(),
            analytics: "analytics".to_string(),
        }
    }
}

/// Routing tables for the topic router
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    /// Intent → topic of the next stage
    pub intents: BTreeMap<Intent, String>,
    pub stages: StageTopics,
    /// Topic for intents with no entry in `intents`
    pub fallback: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        let intents = [
            (Intent::OrderStatus, "knowledge.orders"),
            (Intent::ProductInquiry, "knowledge.products"),
            (Intent::ProductRecommendation, "knowledge.products"),
            (Intent::ReturnRequest, "knowledge.returns"),
            (Intent::RefundStatus, "knowledge.returns"),
            (Intent::ShippingQuestion, "knowledge.shipping"),
            (Intent::AccountSupport, "knowledge.accounts"),
            (Intent::Complaint, "escalation"),
            (Intent::EscalationNeeded, "escalation"),
            (Intent::GeneralInquiry, "knowledge.general"),
        ]
        .into_iter()
        .map(|(intent, topic)| (intent, topic.to_string()))
        .collect();

        Self {
            intents,
            stages: StageTopics::default(),
            fallback: "knowledge.general".to_string(),
        }
    }
}

/// Longest idle timeout a `chrono::Duration` can hold
pub const MAX_IDLE_TIMEOUT_SECS: u64 = (i64::MAX / 1000) as u64;

/// Conversation retention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Messages kept per conversation (oldest dropped first)
    pub max_history: usize,
    /// Idle time after which a conversation may be evicted
    pub idle_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_history: 50,
            idle_timeout_secs: 30 * 60,
        }
    }
}

/// Topic bus sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Per-topic broadcast buffer; slow subscribers skip ahead when it overflows
    pub capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

/// Complete configuration for the triage core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    /// Ordered keyword rules; the first rule with a matching keyword wins
    pub intent_keywords: Vec<IntentRule>,
    /// Ordered escalation rules
    pub escalation_rules: Vec<EscalationRule>,
    /// Confidence assigned to the `GENERAL_INQUIRY` fallback
    pub default_confidence: f32,
    pub lexicons: LexiconConfig,
    pub topics: TopicConfig,
    pub session: SessionConfig,
    pub bus: BusConfig,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            intent_keywords: default_intent_rules(),
            escalation_rules: default_escalation_rules(),
            default_confidence: 0.5,
            lexicons: LexiconConfig::default(),
            topics: TopicConfig::default(),
            session: SessionConfig::default(),
            bus: BusConfig::default(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_intent_rules() -> Vec<IntentRule> {
    vec![
        IntentRule::new(
            Intent::EscalationNeeded,
            [
                "speak to a human", "talk to a human", "speak to someone", "talk to someone",
                "real person", "human agent", "live agent", "supervisor", "manager", "escalate",
            ],
            0.95,
        ),
        IntentRule::new(
            Intent::Complaint,
            [
                "complaint", "complain", "garbage", "terrible", "awful", "horrible",
                "unacceptable", "furious", "disappointed", "worst", "damaged", "defective",
                "broken",
            ],
            0.9,
        ),
        IntentRule::new(
            Intent::RefundStatus,
            ["refund", "refunded", "money back", "reimburse", "reimbursement", "chargeback"],
            0.9,
        ),
        IntentRule::new(
            Intent::ReturnRequest,
            [
                "return", "returns", "send it back", "send back", "exchange", "wrong item",
                "wrong size",
            ],
            0.85,
        ),
        IntentRule::new(
            Intent::OrderStatus,
            [
                "where is my order", "order status", "my order", "track my order", "tracking",
                "tracking number", "order number", "order",
            ],
            0.9,
        ),
        IntentRule::new(
            Intent::AccountSupport,
            [
                "account", "password", "login", "log in", "sign in", "subscription",
                "unsubscribe", "email address",
            ],
            0.85,
        ),
        IntentRule::new(
            Intent::ShippingQuestion,
            [
                "shipping", "ship", "ships", "delivery", "deliver", "package", "arrive",
                "international",
            ],
            0.85,
        ),
        IntentRule::new(
            Intent::ProductRecommendation,
            [
                "recommend", "recommendation", "suggest", "suggestion", "best for", "gift idea",
                "which one should",
            ],
            0.8,
        ),
        IntentRule::new(
            Intent::ProductInquiry,
            [
                "product", "products", "ingredient", "ingredients", "price", "in stock",
                "available", "sizes", "flavor", "gift card", "gift cards",
            ],
            0.8,
        ),
    ]
}

fn default_escalation_rules() -> Vec<EscalationRule> {
    vec![
        EscalationRule::new(EscalationTrigger::MissingDelivery, Priority::Critical),
        EscalationRule::new(EscalationTrigger::Profanity, Priority::High),
        EscalationRule::new(
            EscalationTrigger::RefundAboveLimit { limit: 500.0 },
            Priority::High,
        ),
        EscalationRule::new(EscalationTrigger::ExplicitRequest, Priority::High),
        EscalationRule::new(
            EscalationTrigger::Frustration { min_messages: 2 },
            Priority::Medium,
        ),
        EscalationRule::new(
            EscalationTrigger::RepeatedContact { threshold: 5 },
            Priority::Medium,
        ),
        EscalationRule::new(
            EscalationTrigger::UnclearResponses {
                consecutive: 3,
                max_confidence: 0.5,
            },
            Priority::Medium,
        ),
    ]
}

impl TriageConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Self::parse("toml", "(inline)", content)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        Self::parse("yaml", "(inline)", content)
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        Self::parse("json", "(inline)", content)
    }

    /// Load from a file, choosing the format by extension.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        let format = match extension.as_str() {
            "toml" => "toml",
            "yaml" | "yml" => "yaml",
            "json" => "json",
            _ => return Err(ConfigError::UnsupportedFormat { extension }),
        };

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(format, &path.display().to_string(), &content)?;
        debug!(
            path = %path.display(),
            intent_rules = config.intent_keywords.len(),
            escalation_rules = config.escalation_rules.len(),
            "Loaded triage config"
        );
        Ok(config)
    }

    fn parse(format: &'static str, origin: &str, content: &str) -> ConfigResult<Self> {
        let parse_err = |message: String| ConfigError::Parse {
            format,
            origin: origin.to_string(),
            message,
        };
        let config: Self = match format {
            "toml" => toml::from_str(content).map_err(|e| parse_err(e.to_string()))?,
            "yaml" => serde_yaml::from_str(content).map_err(|e| parse_err(e.to_string()))?,
            _ => serde_json::from_str(content).map_err(|e| parse_err(e.to_string()))?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply `TRIAGE_*` environment overrides. Unparseable values are
    /// ignored with a warning. Call [`TriageConfig::validate`] afterwards.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Same as [`TriageConfig::apply_env_overrides`] with an explicit lookup.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fn parsed<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
        ) -> Option<T> {
            let raw = lookup(key)?;
            match raw.trim().parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(key, value = %raw, "Ignoring unparseable override");
                    None
                }
            }
        }

        if let Some(v) = parsed(&lookup, "TRIAGE_DEFAULT_CONFIDENCE") {
            self.default_confidence = v;
        }
        if let Some(v) = parsed(&lookup, "TRIAGE_MAX_HISTORY") {
            self.session.max_history = v;
        }
        if let Some(v) = parsed(&lookup, "TRIAGE_IDLE_TIMEOUT_SECS") {
            self.session.idle_timeout_secs = v;
        }
        if let Some(v) = parsed(&lookup, "TRIAGE_BUS_CAPACITY") {
            self.bus.capacity = v;
        }
    }

    /// Idle timeout as a chrono duration, saturating at the largest
    /// representable duration
    pub fn idle_timeout(&self) -> chrono::Duration {
        i64::try_from(self.session.idle_timeout_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    /// Check every table. Returns the first problem found.
    pub fn validate(&self) -> ConfigResult<()> {
        check_confidence("default_confidence", self.default_confidence)?;
        self.validate_intent_rules()?;
        self.validate_escalation_rules()?;
        self.validate_topics()?;

        if self.session.max_history == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "session.max_history",
                message: "must be at least 1".to_string(),
            });
        }
        if self.session.idle_timeout_secs > MAX_IDLE_TIMEOUT_SECS {
            return Err(ConfigError::InvalidSetting {
                field: "session.idle_timeout_secs",
                message: format!("must be at most {}", MAX_IDLE_TIMEOUT_SECS),
            });
        }
        if self.bus.capacity == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "bus.capacity",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    fn validate_intent_rules(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for rule in &self.intent_keywords {
            if !seen.insert(rule.intent) {
                return Err(ConfigError::DuplicateIntentRule {
                    intent: rule.intent,
                });
            }
            let invalid = |message: String| ConfigError::InvalidIntentRule {
                intent: rule.intent,
                message,
            };
            if rule.keywords.is_empty() {
                return Err(invalid("keyword set is empty".to_string()));
            }
            if let Some(kw) = rule.keywords.iter().find(|k| normalize(k).is_empty()) {
                return Err(invalid(format!("keyword {:?} has no words", kw)));
            }
            if !(0.0..=1.0).contains(&rule.confidence) {
                return Err(invalid(format!(
                    "confidence {} is outside [0, 1]",
                    rule.confidence
                )));
            }
        }
        Ok(())
    }

    fn validate_escalation_rules(&self) -> ConfigResult<()> {
        for (index, rule) in self.escalation_rules.iter().enumerate() {
            let invalid = |message: String| ConfigError::InvalidEscalationRule {
                index,
                trigger: rule.trigger.kind().to_string(),
                message,
            };
            match &rule.trigger {
                EscalationTrigger::Frustration { min_messages } if *min_messages == 0 => {
                    return Err(invalid("min_messages must be at least 1".to_string()));
                }
                EscalationTrigger::RepeatedContact { threshold } if *threshold == 0 => {
                    return Err(invalid("threshold must be at least 1".to_string()));
                }
                EscalationTrigger::RefundAboveLimit { limit }
                    if !limit.is_finite() || *limit < 0.0 =>
                {
                    return Err(invalid(format!("limit {} must be a non-negative number", limit)));
                }
                EscalationTrigger::UnclearResponses { consecutive, .. } if *consecutive == 0 => {
                    return Err(invalid("consecutive must be at least 1".to_string()));
                }
                EscalationTrigger::UnclearResponses { max_confidence, .. }
                    if !(0.0..=1.0).contains(max_confidence) =>
                {
                    return Err(invalid(format!(
                        "max_confidence {} is outside [0, 1]",
                        max_confidence
                    )));
                }
                _ => {}
            }

            if !rule.enabled {
                continue;
            }
            let lexicon = match rule.trigger {
                EscalationTrigger::MissingDelivery => {
                    Some(("missing_delivery", &self.lexicons.missing_delivery))
                }
                EscalationTrigger::Profanity => Some(("profanity", &self.lexicons.profanity)),
                EscalationTrigger::Frustration { .. } => {
                    Some(("frustration", &self.lexicons.frustration))
                }
                EscalationTrigger::ExplicitRequest => {
                    Some(("human_request", &self.lexicons.human_request))
                }
                _ => None,
            };
            if let Some((name, phrases)) = lexicon {
                check_lexicon(name, phrases)?;
            }
        }
        Ok(())
    }

    fn validate_topics(&self) -> ConfigResult<()> {
        let blank = |s: &str| s.trim().is_empty();
        if blank(&self.topics.fallback) {
            return Err(ConfigError::InvalidTopic {
                message: "fallback topic is empty".to_string(),
            });
        }
        for stage in PipelineStage::ORDER {
            if blank(self.topics.stages.get(stage)) {
                return Err(ConfigError::InvalidTopic {
                    message: format!("{} stage topic is empty", stage),
                });
            }
        }
        if let Some((intent, _)) = self.topics.intents.iter().find(|(_, t)| blank(t)) {
            return Err(ConfigError::InvalidTopic {
                message: format!("topic for {} is empty", intent),
            });
        }
        Ok(())
    }
}

fn check_confidence(field: &'static str, value: f32) -> ConfigResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidSetting {
            field,
            message: format!("{} is outside [0, 1]", value),
        })
    }
}

fn check_lexicon(name: &'static str, phrases: &[String]) -> ConfigResult<()> {
    if phrases.is_empty() {
        return Err(ConfigError::InvalidLexicon {
            name,
            message: "lexicon is empty but an enabled rule uses it".to_string(),
        });
    }
    if let Some(p) = phrases.iter().find(|p| normalize(p).is_empty()) {
        return Err(ConfigError::InvalidLexicon {
            name,
            message: format!("entry {:?} has no words", p),
        });
    }
    Ok(())
}
