//! Integration tests for loading triage configuration from disk

use std::io::Write;

use triage::{
    ConfigError, EscalationTrigger, Intent, IntentClassifier, Pipeline, Priority, TopicBus,
    TopicRouter, TriageConfig,
};

/// Write `content` to a temp file with the given extension
fn config_file(extension: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("triage-")
        .suffix(&format!(".{extension}"))
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(content.as_bytes()).unwrap();
    file
}

/// Test: a TOML file replaces the tables it names and keeps the rest
#[test]
fn test_load_toml_file() {
    let file = config_file(
        "toml",
        r#"
default_confidence = 0.3

[[intent_keywords]]
intent = "SHIPPING_QUESTION"
keywords = ["shipping", "courier"]
confidence = 0.75

[[escalation_rules]]
trigger = { kind = "profanity" }
priority = "critical"

[topics]
fallback = "knowledge.faq"

[topics.intents]
SHIPPING_QUESTION = "knowledge.logistics"
"#,
    );

    let config = TriageConfig::load(file.path()).unwrap();
    assert_eq!(config.intent_keywords.len(), 1);
    assert_eq!(config.escalation_rules.len(), 1);
    assert_eq!(config.escalation_rules[0].priority, Priority::Critical);
    assert_eq!(config.lexicons.profanity.len(), 12);

    let classifier = IntentClassifier::from_config(&config);
    let result = classifier.classify_intent("which courier do you use?");
    assert_eq!(result.intent, Intent::ShippingQuestion);
    assert_eq!(result.confidence, 0.75);
    let fallback = classifier.classify_intent("where is my order");
    assert_eq!(fallback.intent, Intent::GeneralInquiry);
    assert_eq!(fallback.confidence, 0.3);

    let router = TopicRouter::from_config(&config);
    assert_eq!(
        router.route_intent(Intent::ShippingQuestion).as_str(),
        "knowledge.logistics"
    );
    assert_eq!(router.route_intent(Intent::OrderStatus).as_str(), "knowledge.faq");
}

/// Test: YAML with the same structure loads through the .yml extension
#[test]
fn test_load_yaml_file() {
    let file = config_file(
        "yml",
        r#"
escalation_rules:
  - trigger:
      kind: repeated_contact
      threshold: 2
    priority: low
  - trigger:
      kind: unclear_responses
      consecutive: 2
      max_confidence: 0.4
    priority: medium
    enabled: false
session:
  max_history: 5
"#,
    );

    let config = TriageConfig::load(file.path()).unwrap();
    assert_eq!(
        config.escalation_rules[0].trigger,
        EscalationTrigger::RepeatedContact { threshold: 2 }
    );
    assert!(!config.escalation_rules[1].enabled);
    assert_eq!(config.session.max_history, 5);
}

/// Test: a loaded config drives the pipeline end to end
#[tokio::test]
async fn test_loaded_config_drives_pipeline() {
    let file = config_file(
        "json",
        r#"{
            "escalation_rules": [
                {"trigger": {"kind": "repeated_contact", "threshold": 2}, "priority": "low"}
            ],
            "session": {"max_history": 1}
        }"#,
    );
    let config = TriageConfig::load(file.path()).unwrap();
    let pipeline = Pipeline::try_new(&config, TopicBus::new().shared()).unwrap();

    let first = pipeline
        .process(triage::CustomerMessage::new("s", "c", "where is my order"))
        .await
        .unwrap();
    assert!(!first.decision.should_escalate);

    let second = pipeline
        .process(triage::CustomerMessage::new("s", "c", "where is my order"))
        .await
        .unwrap();
    assert!(second.decision.should_escalate);
    assert_eq!(second.decision.priority, Priority::Low);

    let ctx = pipeline.store().get("s").await.unwrap();
    let ctx = ctx.lock().await;
    assert_eq!(ctx.messages().len(), 1);
    assert_eq!(ctx.message_count(), 2);
}

/// Test: malformed and invalid files are rejected at load time
#[test]
fn test_invalid_files_rejected() {
    let missing = TriageConfig::load("/nonexistent/triage.toml").unwrap_err();
    assert!(matches!(missing, ConfigError::Io { .. }));

    let broken = config_file("toml", "intent_keywords = [");
    let err = TriageConfig::load(broken.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { format: "toml", .. }));
    assert!(err.to_string().contains(&broken.path().display().to_string()));

    let empty_keywords = config_file(
        "toml",
        r#"
[[intent_keywords]]
intent = "COMPLAINT"
keywords = []
"#,
    );
    assert!(matches!(
        TriageConfig::load(empty_keywords.path()).unwrap_err(),
        ConfigError::InvalidIntentRule { intent: Intent::Complaint, .. }
    ));

    let duplicate = config_file(
        "yaml",
        r#"
intent_keywords:
  - { intent: COMPLAINT, keywords: [awful] }
  - { intent: COMPLAINT, keywords: [terrible] }
"#,
    );
    assert!(matches!(
        TriageConfig::load(duplicate.path()).unwrap_err(),
        ConfigError::DuplicateIntentRule { .. }
    ));

    let zero_threshold = config_file(
        "toml",
        r#"
[[escalation_rules]]
trigger = { kind = "frustration", min_messages = 0 }
priority = "medium"
"#,
    );
    assert!(matches!(
        TriageConfig::load(zero_threshold.path()).unwrap_err(),
        ConfigError::InvalidEscalationRule { index: 0, .. }
    ));

    let empty_lexicon = config_file(
        "toml",
        r#"
[lexicons]
missing_delivery = []
"#,
    );
    assert!(matches!(
        TriageConfig::load(empty_lexicon.path()).unwrap_err(),
        ConfigError::InvalidLexicon { name: "missing_delivery", .. }
    ));

    let unsupported = config_file("ini", "x = 1");
    assert!(matches!(
        TriageConfig::load(unsupported.path()).unwrap_err(),
        ConfigError::UnsupportedFormat { .. }
    ));
}
