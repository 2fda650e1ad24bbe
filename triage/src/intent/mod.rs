//! Intent classification — the first half of the rule evaluator
//!
//! ```text
//! CustomerMessage ──▶ normalize ──▶ ordered keyword rules ──▶ first match wins
//!                         │                                        │
//!                         └──▶ entity scan (order #, $, email) ────┴──▶ IntentClassificationResult
//! ```
//!
//! No match (including empty text) yields `GENERAL_INQUIRY` at the
//! configured default confidence.

pub mod classifier;
pub mod entities;
pub mod types;

pub use classifier::IntentClassifier;
pub use entities::extract_entities;
pub use types::{CustomerMessage, Intent, IntentClassificationResult};
