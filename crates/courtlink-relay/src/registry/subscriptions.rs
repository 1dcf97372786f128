//! Browser subscriptions: which connection watches which device.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Inner {
    by_conn: HashMap<String, String>,
    watchers: HashMap<String, HashSet<String>>,
}

/// Ephemeral connection → device watch relation. A connection watches at
/// most one device; a later subscribe replaces the earlier one.
pub struct SubscriptionMap {
    inner: RwLock<Inner>,
}

impl SubscriptionMap {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    pub async fn subscribe(&self, conn_id: &str, raspy_id: &str) {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        if let Some(previous) = inner
            .by_conn
            .insert(conn_id.to_string(), raspy_id.to_string())
        {
            if let Some(watchers) = inner.watchers.get_mut(&previous) {
                watchers.remove(conn_id);
                if watchers.is_empty() {
                    inner.watchers.remove(&previous);
                }
            }
        }
        inner
            .watchers
            .entry(raspy_id.to_string())
            .or_default()
            .insert(conn_id.to_string());

        debug!(conn_id = %conn_id, raspy_id = %raspy_id, "Subscription recorded");
    }

    /// Drop the connection's subscription, if any.
    pub async fn unsubscribe(&self, conn_id: &str) -> Option<String> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let raspy_id = inner.by_conn.remove(conn_id)?;
        if let Some(watchers) = inner.watchers.get_mut(&raspy_id) {
            watchers.remove(conn_id);
            if watchers.is_empty() {
                inner.watchers.remove(&raspy_id);
            }
        }
        Some(raspy_id)
    }

    /// Connections currently watching a device.
    pub async fn watchers_of(&self, raspy_id: &str) -> Vec<String> {
        self.inner
            .read()
            .await
            .watchers
            .get(raspy_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for SubscriptionMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribe_and_fan_out() {
        let subs = SubscriptionMap::new();
        subs.subscribe("c1", "court1").await;
        subs.subscribe("c2", "court1").await;

        let mut watchers = subs.watchers_of("court1").await;
        watchers.sort();
        assert_eq!(watchers, vec!["c1", "c2"]);
    }

    #[tokio::test]
    async fn resubscribe_replaces_previous_watch() {
        let subs = SubscriptionMap::new();
        subs.subscribe("c1", "court1").await;
        subs.subscribe("c1", "court2").await;

        assert!(subs.watchers_of("court1").await.is_empty());
        assert_eq!(subs.watchers_of("court2").await, vec!["c1"]);
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let subs = SubscriptionMap::new();
        subs.subscribe("c1", "court1").await;

        assert_eq!(subs.unsubscribe("c1").await.as_deref(), Some("court1"));
        assert!(subs.unsubscribe("c1").await.is_none());
        assert!(subs.watchers_of("court1").await.is_empty());
    }
}
