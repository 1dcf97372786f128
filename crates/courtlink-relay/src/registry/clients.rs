//! Outbound event hub: one push channel per live socket connection.

use std::collections::HashMap;

use tokio::sync::{RwLock, mpsc};
use tracing::debug;

use courtlink_core::protocol::ServerEvent;

/// Registry of every live connection's outbound channel.
///
/// The socket gateway registers a sender when a connection opens and drains
/// the matching receiver into socket.io emits; everything above the gateway
/// pushes [`ServerEvent`]s and never touches a socket directly. Sends are
/// fire-and-forget: a closed or unknown connection is ignored.
pub struct ClientHub {
    clients: RwLock<HashMap<String, mpsc::UnboundedSender<ServerEvent>>>,
}

impl ClientHub {
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
        }
    }

    pub async fn register(&self, conn_id: &str, tx: mpsc::UnboundedSender<ServerEvent>) {
        self.clients.write().await.insert(conn_id.to_string(), tx);
        debug!(conn_id = %conn_id, "Connection channel registered");
    }

    /// Drop the connection's channel. Closes the forwarder task's receiver.
    pub async fn unregister(&self, conn_id: &str) {
        if self.clients.write().await.remove(conn_id).is_some() {
            debug!(conn_id = %conn_id, "Connection channel unregistered");
        }
    }

    /// Push an event to one connection.
    pub async fn send(&self, conn_id: &str, event: ServerEvent) {
        if let Some(tx) = self.clients.read().await.get(conn_id) {
            let _ = tx.send(event);
        }
    }

    /// Push an event to every live connection.
    pub async fn broadcast(&self, event: &ServerEvent) {
        for tx in self.clients.read().await.values() {
            let _ = tx.send(event.clone());
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }
}

impl Default for ClientHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn estado(raspy_id: &str) -> ServerEvent {
        ServerEvent::Estado {
            raspy_id: raspy_id.into(),
            payload: json!({ "enEspera": false }),
        }
    }

    #[tokio::test]
    async fn send_reaches_only_the_target() {
        let hub = ClientHub::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        hub.register("c1", tx1).await;
        hub.register("c2", tx2).await;

        hub.send("c1", estado("court1")).await;

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_reaches_everyone() {
        let hub = ClientHub::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        hub.register("c1", tx1).await;
        hub.register("c2", tx2).await;

        hub.broadcast(&estado("court1")).await;

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn unregister_closes_the_channel() {
        let hub = ClientHub::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        hub.register("c1", tx).await;
        assert_eq!(hub.connection_count().await, 1);

        hub.unregister("c1").await;
        assert_eq!(hub.connection_count().await, 0);
        // Sender dropped: the forwarder's receiver sees end-of-stream.
        assert!(rx.recv().await.is_none());

        // Sending to a gone connection is a silent no-op.
        hub.send("c1", estado("court1")).await;
    }
}
