//! Per-club wristband reservation bookkeeping.

use std::collections::{HashMap, HashSet};
use std::fmt;

use tokio::sync::Mutex;
use tracing::info;

/// Why a reservation was released. Diagnostic only; every reason has the
/// same effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseReason {
    /// Device confirmed the match finished (`enEspera: true`).
    Confirmed,
    /// Device connection dropped.
    Disconnected,
    /// Safety window elapsed without a confirmation.
    Timeout,
    /// A newer configuration replaced the holding.
    Superseded,
}

impl fmt::Display for ReleaseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Confirmed => "confirmed",
            Self::Disconnected => "disconnected",
            Self::Timeout => "timeout",
            Self::Superseded => "superseded",
        })
    }
}

/// One device's current holding. The club is captured at reserve time so a
/// device re-registering under another club cannot desynchronise release.
#[derive(Debug, Clone)]
struct Holding {
    club: String,
    wristbands: HashSet<String>,
}

/// Updated in-use lists produced by a successful reserve.
#[derive(Debug, Clone)]
pub struct ReserveOutcome {
    /// The reserving club's updated in-use list, for broadcast.
    pub in_use: Vec<String>,
    /// Set when the superseded holding lived in a different club: that
    /// club's updated list needs broadcasting too.
    pub displaced: Option<(String, Vec<String>)>,
}

/// Updated in-use list produced by a release that removed something.
#[derive(Debug, Clone)]
pub struct ReleaseOutcome {
    pub club: String,
    pub in_use: Vec<String>,
}

#[derive(Default)]
struct Inner {
    by_club: HashMap<String, HashSet<String>>,
    by_device: HashMap<String, Holding>,
}

impl Inner {
    fn remove_holding(&mut self, raspy_id: &str) -> Option<Holding> {
        let holding = self.by_device.remove(raspy_id)?;
        if let Some(set) = self.by_club.get_mut(&holding.club) {
            for wristband in &holding.wristbands {
                set.remove(wristband);
            }
            if set.is_empty() {
                self.by_club.remove(&holding.club);
            }
        }
        Some(holding)
    }

    fn club_list(&self, club: &str) -> Vec<String> {
        let mut list: Vec<String> = self
            .by_club
            .get(club)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        list.sort();
        list
    }
}

/// Per-club in-use sets plus the per-device record of what each device
/// holds. All mutations run under one lock, so the club-wide sets always
/// equal the union of the per-device records.
pub struct ReservationStore {
    inner: Mutex<Inner>,
}

impl ReservationStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Reserve `wristbands` (1 or 2 names) for `raspy_id` in `club`.
    ///
    /// Any prior holding of the device is released first, inside the same
    /// critical section. Adding an id already in use in the club is a no-op,
    /// not an error.
    pub async fn reserve(
        &self,
        raspy_id: &str,
        club: &str,
        wristbands: Vec<String>,
    ) -> ReserveOutcome {
        debug_assert!(!wristbands.is_empty());
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        let mut displaced = None;
        if let Some(old) = inner.remove_holding(raspy_id) {
            info!(
                raspy_id = %raspy_id,
                reason = %ReleaseReason::Superseded,
                wristbands = ?old.wristbands,
                "Wristbands released"
            );
            if old.club != club {
                displaced = Some((old.club.clone(), inner.club_list(&old.club)));
            }
        }

        let set = inner.by_club.entry(club.to_string()).or_default();
        for wristband in &wristbands {
            set.insert(wristband.clone());
        }
        inner.by_device.insert(
            raspy_id.to_string(),
            Holding {
                club: club.to_string(),
                wristbands: wristbands.into_iter().collect(),
            },
        );

        let in_use = inner.club_list(club);
        info!(raspy_id = %raspy_id, club = %club, in_use = ?in_use, "Wristbands reserved");
        ReserveOutcome { in_use, displaced }
    }

    /// Release whatever `raspy_id` holds.
    ///
    /// Returns `None` when nothing is held: disconnect, timeout, and
    /// confirmation can race, and any one of them may have released already.
    pub async fn release(&self, raspy_id: &str, reason: ReleaseReason) -> Option<ReleaseOutcome> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        let holding = inner.remove_holding(raspy_id)?;
        info!(
            raspy_id = %raspy_id,
            reason = %reason,
            wristbands = ?holding.wristbands,
            "Wristbands released"
        );
        Some(ReleaseOutcome {
            in_use: inner.club_list(&holding.club),
            club: holding.club,
        })
    }

    /// Wristband ids currently reserved in a club, sorted for stable output.
    pub async fn in_use(&self, club: &str) -> Vec<String> {
        self.inner.lock().await.club_list(club)
    }

    /// Whether the device currently holds a reservation.
    pub async fn holds(&self, raspy_id: &str) -> bool {
        self.inner.lock().await.by_device.contains_key(raspy_id)
    }
}

impl Default for ReservationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reserve_adds_to_club_set() {
        let store = ReservationStore::new();
        let outcome = store
            .reserve("court1", "la-esquina", vec!["A01".into(), "A03".into()])
            .await;

        assert_eq!(outcome.in_use, vec!["A01", "A03"]);
        assert!(outcome.displaced.is_none());
        assert_eq!(store.in_use("la-esquina").await, vec!["A01", "A03"]);
        assert!(store.holds("court1").await);
    }

    #[tokio::test]
    async fn club_set_is_union_of_device_holdings() {
        let store = ReservationStore::new();
        store.reserve("court1", "la-esquina", vec!["A01".into()]).await;
        store.reserve("court2", "la-esquina", vec!["B07".into()]).await;

        assert_eq!(store.in_use("la-esquina").await, vec!["A01", "B07"]);

        store.release("court1", ReleaseReason::Confirmed).await;
        assert_eq!(store.in_use("la-esquina").await, vec!["B07"]);
    }

    #[tokio::test]
    async fn reserve_replaces_prior_holding() {
        let store = ReservationStore::new();
        store
            .reserve("court1", "la-esquina", vec!["A01".into(), "A03".into()])
            .await;
        let outcome = store
            .reserve("court1", "la-esquina", vec!["B07".into()])
            .await;

        // The old ids must not leak into the club set.
        assert_eq!(outcome.in_use, vec!["B07"]);
        assert_eq!(store.in_use("la-esquina").await, vec!["B07"]);
    }

    #[tokio::test]
    async fn reserve_across_clubs_reports_displaced_club() {
        let store = ReservationStore::new();
        store.reserve("court1", "la-esquina", vec!["A01".into()]).await;
        let outcome = store.reserve("court1", "el-muro", vec!["Z09".into()]).await;

        assert_eq!(outcome.in_use, vec!["Z09"]);
        let (club, in_use) = outcome.displaced.unwrap();
        assert_eq!(club, "la-esquina");
        assert!(in_use.is_empty());
        assert!(store.in_use("la-esquina").await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_id_in_club_is_a_noop() {
        let store = ReservationStore::new();
        store.reserve("court1", "la-esquina", vec!["A01".into()]).await;
        let outcome = store
            .reserve("court2", "la-esquina", vec!["A01".into()])
            .await;

        assert_eq!(outcome.in_use, vec!["A01"]);
    }

    #[tokio::test]
    async fn release_is_a_noop_when_nothing_held() {
        let store = ReservationStore::new();
        assert!(store.release("court1", ReleaseReason::Timeout).await.is_none());

        store.reserve("court1", "la-esquina", vec!["A01".into()]).await;
        let outcome = store
            .release("court1", ReleaseReason::Confirmed)
            .await
            .unwrap();
        assert_eq!(outcome.club, "la-esquina");
        assert!(outcome.in_use.is_empty());

        // Second release in a row: safe no-op.
        assert!(store.release("court1", ReleaseReason::Disconnected).await.is_none());
        assert!(!store.holds("court1").await);
    }
}
