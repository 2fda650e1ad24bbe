//! Topic Router Module
//!
//! Maps a classified message to the topic of the next pipeline stage.
//!
//! # Default routing table
//!
//! ```text
//! Intent                  | Topic
//! ------------------------|----------------------
//! ORDER_STATUS            | knowledge.orders
//! PRODUCT_INQUIRY         | knowledge.products
//! PRODUCT_RECOMMENDATION  | knowledge.products
//! RETURN_REQUEST          | knowledge.returns
//! REFUND_STATUS           | knowledge.returns
//! SHIPPING_QUESTION       | knowledge.shipping
//! ACCOUNT_SUPPORT         | knowledge.accounts
//! COMPLAINT               | escalation
//! ESCALATION_NEEDED       | escalation
//! GENERAL_INQUIRY         | knowledge.general
//! (unmapped)              | knowledge.general   (fallback)
//! ```

pub mod topic_router;
pub mod topics;

pub use topic_router::TopicRouter;
pub use topics::{PipelineStage, Topic};
