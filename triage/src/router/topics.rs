//! Topic names and pipeline stages

use serde::{Deserialize, Serialize};

/// Named destination on the messaging layer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Topic {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Topic {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Fixed processing order: Intent → Knowledge → Response → Escalation → Analytics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Intent,
    Knowledge,
    Response,
    Escalation,
    Analytics,
}

impl PipelineStage {
    /// All stages in processing order
    pub const ORDER: [PipelineStage; 5] = [
        PipelineStage::Intent,
        PipelineStage::Knowledge,
        PipelineStage::Response,
        PipelineStage::Escalation,
        PipelineStage::Analytics,
    ];

    /// The stage after this one; `None` after Analytics
    pub fn next(&self) -> Option<PipelineStage> {
        let idx = Self::ORDER.iter().position(|s| s == self)?;
        Self::ORDER.get(idx + 1).copied()
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Intent => write!(f, "intent"),
            Self::Knowledge => write!(f, "knowledge"),
            Self::Response => write!(f, "response"),
            Self::Escalation => write!(f, "escalation"),
            Self::Analytics => write!(f, "analytics"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        assert_eq!(PipelineStage::Intent.next(), Some(PipelineStage::Knowledge));
        assert_eq!(PipelineStage::Knowledge.next(), Some(PipelineStage::Response));
        assert_eq!(PipelineStage::Response.next(), Some(PipelineStage::Escalation));
        assert_eq!(PipelineStage::Escalation.next(), Some(PipelineStage::Analytics));
        assert_eq!(PipelineStage::Analytics.next(), None);
    }

    #[test]
    fn test_topic_is_transparent_string() {
        let topic = Topic::from("knowledge.orders");
        assert_eq!(serde_json::to_string(&topic).unwrap(), "\"knowledge.orders\"");
        assert_eq!(topic.to_string(), "knowledge.orders");
    }
}
