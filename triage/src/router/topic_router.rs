//! Topic Router — intent → next-stage topic lookup
//!
//! Pure lookup over tables fixed at construction. Unmapped intents resolve
//! to the fallback topic; no lookup can fail.

use std::collections::HashMap;
use std::sync::Arc;

use super::topics::{PipelineStage, Topic};
use crate::config::{TopicConfig, TriageConfig};
use crate::intent::{Intent, IntentClassificationResult};

#[derive(Debug, Clone)]
pub struct TopicRouter {
    intent_topics: HashMap<Intent, Topic>,
    stage_topics: HashMap<PipelineStage, Topic>,
    fallback: Topic,
}

impl TopicRouter {
    pub fn new(config: &TopicConfig) -> Self {
        let intent_topics = config
            .intents
            .iter()
            .map(|(intent, topic)| (*intent, Topic::new(topic.as_str())))
            .collect();
        let stage_topics = PipelineStage::ORDER
            .iter()
            .map(|stage| (*stage, Topic::new(config.stages.get(*stage))))
            .collect();
        Self {
            intent_topics,
            stage_topics,
            fallback: Topic::new(config.fallback.as_str()),
        }
    }

    pub fn from_config(config: &TriageConfig) -> Self {
        Self::new(&config.topics)
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Topic that should receive a classified message next.
    pub fn route(&self, result: &IntentClassificationResult) -> &Topic {
        self.route_intent(result.intent)
    }

    pub fn route_intent(&self, intent: Intent) -> &Topic {
        self.intent_topics.get(&intent).unwrap_or(&self.fallback)
    }

    /// Whether `intent` has its own entry (rather than the fallback)
    pub fn is_mapped(&self, intent: Intent) -> bool {
        self.intent_topics.contains_key(&intent)
    }

    pub fn stage_topic(&self, stage: PipelineStage) -> &Topic {
        self.stage_topics.get(&stage).unwrap_or(&self.fallback)
    }

    pub fn next_stage(&self, stage: PipelineStage) -> Option<PipelineStage> {
        stage.next()
    }

    /// Topic of the stage after `stage`; `None` after Analytics
    pub fn next_topic(&self, stage: PipelineStage) -> Option<&Topic> {
        stage.next().map(|s| self.stage_topic(s))
    }

    pub fn fallback(&self) -> &Topic {
        &self.fallback
    }

    /// Every distinct topic this router can produce, sorted
    pub fn all_topics(&self) -> Vec<&Topic> {
        let mut topics: Vec<&Topic> = self
            .intent_topics
            .values()
            .chain(self.stage_topics.values())
            .chain(std::iter::once(&self.fallback))
            .collect();
        topics.sort();
        topics.dedup();
        topics
    }
}

impl Default for TopicRouter {
    fn default() -> Self {
        Self::new(&TopicConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_every_intent_has_a_default_topic() {
        let router = TopicRouter::default();
        for intent in Intent::ALL {
            assert!(router.is_mapped(intent), "{intent} has no topic");
            assert!(!router.route_intent(intent).as_str().is_empty());
        }
    }

    #[test]
    fn test_unmapped_intent_uses_fallback() {
        let mut intents = BTreeMap::new();
        intents.insert(Intent::OrderStatus, "knowledge.orders".to_string());
        let config = TopicConfig {
            intents,
            fallback: "knowledge.general".to_string(),
            ..Default::default()
        };
        let router = TopicRouter::new(&config);

        assert_eq!(router.route_intent(Intent::OrderStatus).as_str(), "knowledge.orders");
        for intent in Intent::ALL.into_iter().filter(|i| *i != Intent::OrderStatus) {
            assert_eq!(router.route_intent(intent).as_str(), "knowledge.general");
        }
    }

    #[test]
    fn test_stage_topics_follow_pipeline_order() {
        let router = TopicRouter::default();
        assert_eq!(
            router.next_topic(PipelineStage::Intent),
            Some(router.stage_topic(PipelineStage::Knowledge))
        );
        assert!(router.next_topic(PipelineStage::Analytics).is_none());
        assert_eq!(router.stage_topic(PipelineStage::Analytics).as_str(), "analytics");
    }

    #[test]
    fn test_all_topics_deduplicated() {
        let router = TopicRouter::default();
        let topics = router.all_topics();
        let mut unique = topics.clone();
        unique.dedup();
        assert_eq!(topics.len(), unique.len());
        assert!(topics.iter().any(|t| t.as_str() == "escalation"));
    }

    #[test]
    fn test_router_is_shareable_across_threads() {
        let router = TopicRouter::default().shared();
        let handles: Vec<_> = Intent::ALL
            .into_iter()
            .map(|intent| {
                let router = router.clone();
                std::thread::spawn(move || router.route_intent(intent).clone())
            })
            .collect();
        for handle in handles {
            assert!(!handle.join().unwrap().as_str().is_empty());
        }
    }
}
