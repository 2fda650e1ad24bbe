//! Keyword-rule intent classifier
//!
//! Pure and deterministic: an ordered list of `(intent, keywords, confidence)`
//! rules is tested against the normalized text and the first rule with a
//! matching keyword wins. Empty or unmatched text gets the default
//! `GENERAL_INQUIRY` classification instead of an error.

use tracing::trace;

use super::entities::extract_entities;
use super::types::{CustomerMessage, Intent, IntentClassificationResult};
use crate::config::{IntentRule, TriageConfig};
use crate::lexicon::{Lexicon, NormalizedText};

#[derive(Debug, Clone)]
struct CompiledRule {
    intent: Intent,
    keywords: Lexicon,
    confidence: f32,
}

/// Classifies customer text into an [`Intent`]
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    rules: Vec<CompiledRule>,
    default_confidence: f32,
}

impl IntentClassifier {
    /// Build from rules that have already passed config validation.
    pub fn new(rules: &[IntentRule], default_confidence: f32) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|r| CompiledRule {
                    intent: r.intent,
                    keywords: Lexicon::new(&r.keywords),
                    confidence: r.confidence,
                })
                .collect(),
            default_confidence,
        }
    }

    pub fn from_config(config: &TriageConfig) -> Self {
        Self::new(&config.intent_keywords, config.default_confidence)
    }

    /// Number of compiled rules
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Classify raw text.
    pub fn classify_intent(&self, text: &str) -> IntentClassificationResult {
        let normalized = NormalizedText::new(text);
        let entities = if normalized.is_empty() {
            Default::default()
        } else {
            extract_entities(text)
        };

        let hit = self.rules.iter().find_map(|rule| {
            rule.keywords
                .first_match(&normalized)
                .map(|kw| (rule, kw.to_string()))
        });

        match hit {
            Some((rule, keyword)) => {
                trace!(intent = %rule.intent, keyword = %keyword, "Intent rule matched");
                IntentClassificationResult {
                    intent: rule.intent,
                    confidence: rule.confidence,
                    entities,
                    matched_keyword: Some(keyword),
                    message_id: None,
                }
            }
            None => IntentClassificationResult {
                intent: Intent::GeneralInquiry,
                confidence: self.default_confidence,
                entities,
                matched_keyword: None,
                message_id: None,
            },
        }
    }

    /// Classify a message, tagging the result with its message id.
    pub fn classify_message(&self, message: &CustomerMessage) -> IntentClassificationResult {
        IntentClassificationResult {
            message_id: Some(message.message_id),
            ..self.classify_intent(&message.text)
        }
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::from_config(&TriageConfig::default())
    }
}
