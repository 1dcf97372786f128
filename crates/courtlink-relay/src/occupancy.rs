//! Last-known court occupancy per device.

use std::collections::HashMap;

use tokio::sync::RwLock;

use courtlink_core::protocol::CourtStatus;

/// Per-device last reported status, used to answer late subscribers
/// immediately. Overwritten on every report; deleted on device disconnect,
/// after which the device is "unknown" again.
pub struct OccupancyStore {
    statuses: RwLock<HashMap<String, CourtStatus>>,
}

impl OccupancyStore {
    pub fn new() -> Self {
        Self {
            statuses: RwLock::new(HashMap::new()),
        }
    }

    pub async fn update(&self, raspy_id: &str, status: CourtStatus) {
        self.statuses
            .write()
            .await
            .insert(raspy_id.to_string(), status);
    }

    pub async fn get(&self, raspy_id: &str) -> Option<CourtStatus> {
        self.statuses.read().await.get(raspy_id).cloned()
    }

    pub async fn remove(&self, raspy_id: &str) {
        self.statuses.write().await.remove(raspy_id);
    }
}

impl Default for OccupancyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn update_overwrites_and_remove_forgets() {
        let store = OccupancyStore::new();
        assert!(store.get("court1").await.is_none());

        store
            .update(
                "court1",
                CourtStatus {
                    en_espera: Some(false),
                    estado: Some(json!("ocupada")),
                },
            )
            .await;
        store
            .update(
                "court1",
                CourtStatus {
                    en_espera: Some(true),
                    estado: None,
                },
            )
            .await;

        let status = store.get("court1").await.unwrap();
        assert_eq!(status.en_espera, Some(true));
        assert!(status.estado.is_none());

        store.remove("court1").await;
        assert!(store.get("court1").await.is_none());
    }
}
