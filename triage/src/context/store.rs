//! Conversation store — one single-writer context per session
//!
//! Each context sits behind its own `tokio::sync::Mutex`, so messages for the
//! same conversation are applied one at a time while different conversations
//! proceed in parallel. The outer map lock is only held to look up or insert
//! an entry, never while a context is being mutated.

use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

use super::conversation::ConversationContext;

/// Shared handle to a single conversation
pub type SharedContext = Arc<Mutex<ConversationContext>>;

pub struct ConversationStore {
    contexts: RwLock<HashMap<String, SharedContext>>,
    max_history: usize,
}

impl ConversationStore {
    pub fn new(max_history: usize) -> Self {
        Self {
            contexts: RwLock::new(HashMap::new()),
            max_history,
        }
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Get the context for `context_id`, creating it on first use.
    pub async fn get_or_create(&self, context_id: &str) -> SharedContext {
        if let Some(ctx) = self.contexts.read().await.get(context_id) {
            return ctx.clone();
        }

        let mut contexts = self.contexts.write().await;
        contexts
            .entry(context_id.to_string())
            .or_insert_with(|| {
                debug!(context_id, "Creating conversation context");
                Arc::new(Mutex::new(ConversationContext::new(
                    context_id,
                    self.max_history,
                )))
            })
            .clone()
    }

    /// Lock the live context for `context_id`, creating it on first use.
    ///
    /// A context removed or evicted while the caller waited for its lock is
    /// no longer the session's context; the lookup is retried so the writer
    /// always ends up holding the context the store owns.
    pub async fn lock_context(&self, context_id: &str) -> OwnedMutexGuard<ConversationContext> {
        loop {
            let shared = self.get_or_create(context_id).await;
            let guard = shared.clone().lock_owned().await;
            let current = self
                .contexts
                .read()
                .await
                .get(context_id)
                .is_some_and(|live| Arc::ptr_eq(live, &shared));
            if current {
                return guard;
            }
            debug!(context_id, "Context closed while waiting for its lock, retrying");
        }
    }

    pub async fn get(&self, context_id: &str) -> Option<SharedContext> {
        self.contexts.read().await.get(context_id).cloned()
    }

    /// Remove a context and return its final state.
    pub async fn remove(&self, context_id: &str) -> Option<ConversationContext> {
        let removed = self.contexts.write().await.remove(context_id)?;
        let snapshot = removed.lock().await.clone();
        Some(snapshot)
    }

    pub async fn len(&self) -> usize {
        self.contexts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.contexts.read().await.is_empty()
    }

    pub async fn context_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.contexts.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Drop contexts idle for at least `ttl`. Contexts currently locked by a
    /// writer are in use and are skipped. Returns the evicted contexts.
    pub async fn evict_idle(&self, ttl: Duration) -> Vec<ConversationContext> {
        let now = Utc::now();
        let mut contexts = self.contexts.write().await;

        let mut expired = Vec::new();
        for (id, ctx) in contexts.iter() {
            if let Ok(guard) = ctx.try_lock() {
                if guard.idle_for(now) >= ttl {
                    expired.push(id.clone());
                }
            }
        }

        let mut evicted = Vec::with_capacity(expired.len());
        for id in expired {
            let Some(ctx) = contexts.remove(&id) else {
                continue;
            };
            let snapshot = ctx.try_lock().map(|guard| guard.clone());
            if let Ok(snapshot) = snapshot {
                evicted.push(snapshot);
            }
        }
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "Evicted idle conversation contexts");
        }
        evicted
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(crate::config::SessionConfig::default().max_history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{CustomerMessage, IntentClassifier};

    #[tokio::test]
    async fn test_get_or_create_returns_same_handle() {
        let store = ConversationStore::new(10);
        let a = store.get_or_create("s-1").await;
        let b = store.get_or_create("s-1").await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len().await, 1);
        assert!(store.get("s-2").await.is_none());
    }

    #[tokio::test]
    async fn test_lock_context_skips_context_removed_while_waiting() {
        let store = Arc::new(ConversationStore::new(10));
        let stale = store.get_or_create("s").await;
        let held = stale.clone().lock_owned().await;

        let writer = tokio::spawn({
            let store = store.clone();
            async move {
                let mut context = store.lock_context("s").await;
                let msg = CustomerMessage::new("s", "c", "where is my order");
                let result = IntentClassifier::default().classify_message(&msg);
                context.record(msg, result);
            }
        });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        let closer = tokio::spawn({
            let store = store.clone();
            async move { store.remove("s").await }
        });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        drop(held);

        writer.await.unwrap();
        let closed = closer.await.unwrap().unwrap();
        assert_eq!(closed.message_count(), 0);

        let live = store.get("s").await.unwrap();
        assert!(!Arc::ptr_eq(&live, &stale));
        assert_eq!(live.lock().await.message_count(), 1);
    }

    #[tokio::test]
    async fn test_remove_returns_snapshot() {
        let store = ConversationStore::new(10);
        {
            let ctx = store.get_or_create("s-1").await;
            let mut guard = ctx.lock().await;
            let msg = CustomerMessage::new("s-1", "c", "hello");
            let result = IntentClassifier::default().classify_message(&msg);
            guard.record(msg, result);
        }
        let snapshot = store.remove("s-1").await.unwrap();
        assert_eq!(snapshot.message_count(), 1);
        assert!(store.is_empty().await);
        assert!(store.remove("s-1").await.is_none());
    }

    #[tokio::test]
    async fn test_evict_idle_skips_active_and_locked() {
        let store = ConversationStore::new(10);
        let stale = store.get_or_create("stale").await;
        stale.lock().await.last_activity = Utc::now() - Duration::minutes(45);
        let locked = store.get_or_create("locked").await;
        locked.lock().await.last_activity = Utc::now() - Duration::minutes(45);
        store.get_or_create("fresh").await;

        let _held = locked.lock().await;
        let evicted = store.evict_idle(Duration::minutes(30)).await;

        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].context_id, "stale");
        assert_eq!(store.context_ids().await, vec!["fresh", "locked"]);
    }
}
