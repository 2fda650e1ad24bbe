//! Sentiment signals — lexicon hits that feed the escalation rules
//!
//! Four lexicons are scanned per message: profanity, frustration,
//! missing-delivery phrases and requests for a human. A scan only records
//! the first hit of each; the escalation engine decides what the hits mean.

use serde::{Deserialize, Serialize};

use crate::config::LexiconConfig;
use crate::context::ConversationContext;
use crate::lexicon::{Lexicon, NormalizedText};

/// Lexicon hits for a single message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentScan {
    pub profanity: Option<String>,
    pub frustration: Option<String>,
    pub missing_delivery: Option<String>,
    pub human_request: Option<String>,
}

impl SentimentScan {
    /// Whether the message reads as hostile or upset
    pub fn is_negative(&self) -> bool {
        self.profanity.is_some() || self.frustration.is_some()
    }

    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SentimentDetector {
    profanity: Lexicon,
    frustration: Lexicon,
    missing_delivery: Lexicon,
    human_request: Lexicon,
}

impl SentimentDetector {
    pub fn new(lexicons: &LexiconConfig) -> Self {
        Self {
            profanity: Lexicon::new(&lexicons.profanity),
            frustration: Lexicon::new(&lexicons.frustration),
            missing_delivery: Lexicon::new(&lexicons.missing_delivery),
            human_request: Lexicon::new(&lexicons.human_request),
        }
    }

    pub fn scan(&self, text: &str) -> SentimentScan {
        let text = NormalizedText::new(text);
        if text.is_empty() {
            return SentimentScan::default();
        }
        let hit = |lexicon: &Lexicon| lexicon.first_match(&text).map(str::to_string);
        SentimentScan {
            profanity: hit(&self.profanity),
            frustration: hit(&self.frustration),
            missing_delivery: hit(&self.missing_delivery),
            human_request: hit(&self.human_request),
        }
    }

    /// Messages in the retained history that hit the frustration lexicon.
    pub fn frustrated_messages(&self, context: &ConversationContext) -> u32 {
        context
            .messages()
            .iter()
            .filter(|m| self.frustration.matches(&NormalizedText::new(&m.text)))
            .count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{CustomerMessage, IntentClassificationResult, Intent};

    fn detector() -> SentimentDetector {
        SentimentDetector::new(&LexiconConfig::default())
    }

    #[test]
    fn test_scan_hits() {
        let scan = detector().scan("Your product is garbage and I'm furious");
        assert_eq!(scan.profanity.as_deref(), Some("garbage"));
        assert_eq!(scan.frustration.as_deref(), Some("furious"));
        assert!(scan.missing_delivery.is_none());
        assert!(scan.is_negative());
    }

    #[test]
    fn test_missing_delivery_and_human_request() {
        let scan = detector().scan("My package never arrived, let me talk to a human");
        assert_eq!(scan.missing_delivery.as_deref(), Some("never arrived"));
        assert!(scan.human_request.is_some());
        assert!(!scan.is_negative());
    }

    #[test]
    fn test_clean_and_empty() {
        assert!(detector().scan("Hello, what sizes do you have?").is_clean());
        assert!(detector().scan("").is_clean());
    }

    #[test]
    fn test_frustrated_messages_counts_history() {
        let detector = detector();
        let mut ctx = ConversationContext::new("ctx", 10);
        for text in ["this is ridiculous", "where is it", "I am so frustrated"] {
            let msg = CustomerMessage::new("ctx", "c", text);
            let result = IntentClassificationResult {
                intent: Intent::GeneralInquiry,
                confidence: 0.5,
                entities: Default::default(),
                matched_keyword: None,
                message_id: Some(msg.message_id),
            };
            ctx.record(msg, result);
        }
        assert_eq!(detector.frustrated_messages(&ctx), 2);
    }
}
