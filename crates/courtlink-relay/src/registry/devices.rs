//! In-memory device registry with a bidirectional connection index.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{info, warn};

/// A known device. The connection handle is absent while the device is
/// disconnected; the club declared at registration outlives the connection
/// so a reconnecting device keeps its affiliation.
#[derive(Debug, Clone, Default)]
struct DeviceEntry {
    conn_id: Option<String>,
    club: Option<String>,
}

#[derive(Default)]
struct Inner {
    devices: HashMap<String, DeviceEntry>,
    /// Reverse index, so disconnect handling never scans all devices.
    by_conn: HashMap<String, String>,
}

/// Thread-safe device-id ⇄ connection binding.
pub struct DeviceRegistry {
    inner: RwLock<Inner>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Bind a device to the calling connection and record its club.
    ///
    /// Re-registration is not an error: both the device's previous binding
    /// and any previous device id held by this connection are overwritten.
    pub async fn register(&self, raspy_id: &str, club: Option<String>, conn_id: &str) {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        if let Some(old_id) = inner.by_conn.remove(conn_id) {
            if old_id != raspy_id {
                if let Some(entry) = inner.devices.get_mut(&old_id) {
                    entry.conn_id = None;
                }
                warn!(
                    conn_id = %conn_id,
                    old_raspy_id = %old_id,
                    raspy_id = %raspy_id,
                    "Connection re-registered under a new device id"
                );
            }
        }

        let stale = inner
            .devices
            .get_mut(raspy_id)
            .and_then(|entry| entry.conn_id.take());
        if let Some(stale_conn) = stale {
            inner.by_conn.remove(&stale_conn);
        }

        let entry = inner.devices.entry(raspy_id.to_string()).or_default();
        entry.conn_id = Some(conn_id.to_string());
        entry.club = club;
        inner
            .by_conn
            .insert(conn_id.to_string(), raspy_id.to_string());

        info!(raspy_id = %raspy_id, club = ?entry.club, "Device registered");
    }

    /// The device's live connection, if it has one.
    pub async fn lookup(&self, raspy_id: &str) -> Option<String> {
        self.inner
            .read()
            .await
            .devices
            .get(raspy_id)
            .and_then(|entry| entry.conn_id.clone())
    }

    /// The club the device declared at its last registration.
    pub async fn club_of(&self, raspy_id: &str) -> Option<String> {
        self.inner
            .read()
            .await
            .devices
            .get(raspy_id)
            .and_then(|entry| entry.club.clone())
    }

    /// Whether the device currently has a live connection.
    pub async fn is_connected(&self, raspy_id: &str) -> bool {
        self.lookup(raspy_id).await.is_some()
    }

    /// Clear the binding for a closed connection and return the device id
    /// that owned it, so dependent cleanup (timers, reservations,
    /// subscriptions) can run. Club affiliation is retained.
    pub async fn unbind(&self, conn_id: &str) -> Option<String> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let raspy_id = inner.by_conn.remove(conn_id)?;
        if let Some(entry) = inner.devices.get_mut(&raspy_id) {
            entry.conn_id = None;
        }
        info!(raspy_id = %raspy_id, "Device connection unbound");
        Some(raspy_id)
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_and_lookup() {
        let registry = DeviceRegistry::new();
        registry
            .register("court1", Some("la-esquina".into()), "c1")
            .await;

        assert_eq!(registry.lookup("court1").await.as_deref(), Some("c1"));
        assert_eq!(
            registry.club_of("court1").await.as_deref(),
            Some("la-esquina")
        );
        assert!(registry.is_connected("court1").await);
        assert!(!registry.is_connected("court2").await);
    }

    #[tokio::test]
    async fn club_survives_unbind() {
        let registry = DeviceRegistry::new();
        registry
            .register("court1", Some("la-esquina".into()), "c1")
            .await;

        assert_eq!(registry.unbind("c1").await.as_deref(), Some("court1"));
        assert!(registry.lookup("court1").await.is_none());
        assert_eq!(
            registry.club_of("court1").await.as_deref(),
            Some("la-esquina")
        );
    }

    #[tokio::test]
    async fn unbind_unknown_connection_is_none() {
        let registry = DeviceRegistry::new();
        assert!(registry.unbind("nope").await.is_none());
    }

    #[tokio::test]
    async fn re_registration_overwrites_club_and_connection() {
        let registry = DeviceRegistry::new();
        registry
            .register("court1", Some("la-esquina".into()), "c1")
            .await;
        registry
            .register("court1", Some("el-muro".into()), "c2")
            .await;

        assert_eq!(registry.lookup("court1").await.as_deref(), Some("c2"));
        assert_eq!(registry.club_of("court1").await.as_deref(), Some("el-muro"));
        // The stale connection no longer resolves to the device.
        assert!(registry.unbind("c1").await.is_none());
        assert_eq!(registry.unbind("c2").await.as_deref(), Some("court1"));
    }

    #[tokio::test]
    async fn connection_re_registering_as_new_device_releases_old_id() {
        let registry = DeviceRegistry::new();
        registry
            .register("court1", Some("la-esquina".into()), "c1")
            .await;
        registry
            .register("court2", Some("la-esquina".into()), "c1")
            .await;

        assert!(registry.lookup("court1").await.is_none());
        assert_eq!(registry.lookup("court2").await.as_deref(), Some("c1"));
        assert_eq!(registry.unbind("c1").await.as_deref(), Some("court2"));
    }
}
