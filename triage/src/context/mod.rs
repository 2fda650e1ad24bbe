//! Conversation state
//!
//! A [`ConversationContext`] accumulates message and intent history for one
//! session. The [`ConversationStore`] owns every live context and enforces a
//! single writer per session.

pub mod conversation;
pub mod store;

pub use conversation::ConversationContext;
pub use store::{ConversationStore, SharedContext};
