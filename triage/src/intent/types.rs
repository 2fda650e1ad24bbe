//! Intent, message and classification types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Purpose of a customer request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    /// "Where is my order?"
    OrderStatus,
    /// Questions about a specific product
    ProductInquiry,
    /// Asking what to buy
    ProductRecommendation,
    /// Wants to send something back
    ReturnRequest,
    /// Refund progress or refund request
    RefundStatus,
    /// Shipping methods, costs, delivery windows
    ShippingQuestion,
    /// Dissatisfaction with product or service
    Complaint,
    /// Login, password, subscription
    AccountSupport,
    /// Customer explicitly asks for a person
    EscalationNeeded,
    /// Fallback when nothing else matches
    GeneralInquiry,
}

impl Intent {
    /// Every intent, in declaration order.
    pub const ALL: [Intent; 10] = [
        Intent::OrderStatus,
        Intent::ProductInquiry,
        Intent::ProductRecommendation,
        Intent::ReturnRequest,
        Intent::RefundStatus,
        Intent::ShippingQuestion,
        Intent::Complaint,
        Intent::AccountSupport,
        Intent::EscalationNeeded,
        Intent::GeneralInquiry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderStatus => "ORDER_STATUS",
            Self::ProductInquiry => "PRODUCT_INQUIRY",
            Self::ProductRecommendation => "PRODUCT_RECOMMENDATION",
            Self::ReturnRequest => "RETURN_REQUEST",
            Self::RefundStatus => "REFUND_STATUS",
            Self::ShippingQuestion => "SHIPPING_QUESTION",
            Self::Complaint => "COMPLAINT",
            Self::AccountSupport => "ACCOUNT_SUPPORT",
            Self::EscalationNeeded => "ESCALATION_NEEDED",
            Self::GeneralInquiry => "GENERAL_INQUIRY",
        }
    }

    /// Whether this intent involves money going back to the customer
    pub fn is_refund_related(&self) -> bool {
        matches!(self, Self::RefundStatus | Self::ReturnRequest)
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbound customer message. Read-only once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerMessage {
    /// Unique message id
    #[serde(default = "Uuid::new_v4")]
    pub message_id: Uuid,
    /// Conversation (session) this message belongs to
    #[serde(alias = "session_id")]
    pub context_id: String,
    /// Customer identifier
    #[serde(default)]
    pub customer_id: String,
    /// Raw message body
    #[serde(default)]
    pub text: String,
    /// Free-form metadata, e.g. `language = "en"`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// When the message was received
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

impl CustomerMessage {
    pub fn new(
        context_id: impl Into<String>,
        customer_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            context_id: context_id.into(),
            customer_id: customer_id.into(),
            text: text.into(),
            metadata: BTreeMap::new(),
            received_at: Utc::now(),
        }
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Language tag, if the transport supplied one
    pub fn language(&self) -> Option<&str> {
        self.metadata.get("language").map(String::as_str)
    }
}

/// Result of classifying one message. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentClassificationResult {
    pub intent: Intent,
    /// Confidence in [0, 1]
    pub confidence: f32,
    /// Best-effort entities, e.g. `order_number`, `amount`, `email`
    #[serde(default)]
    pub entities: BTreeMap<String, String>,
    /// Keyword that selected the intent; `None` for the default classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_keyword: Option<String>,
    /// Source message, when classified from a [`CustomerMessage`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<Uuid>,
}

impl IntentClassificationResult {
    /// Whether this is the fallback classification (no rule matched)
    pub fn is_default(&self) -> bool {
        self.matched_keyword.is_none()
    }

    pub fn is_low_confidence(&self, ceiling: f32) -> bool {
        self.confidence <= ceiling
    }

    pub fn entity(&self, key: &str) -> Option<&str> {
        self.entities.get(key).map(String::as_str)
    }
}
