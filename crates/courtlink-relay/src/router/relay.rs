//! The relay router: every inbound event (HTTP request or socket message)
//! lands here and mutates the registries/stores in one place.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{info, warn};

use courtlink_core::protocol::{self, CourtStatus, EstadoCancha, ServerEvent};

use crate::occupancy::OccupancyStore;
use crate::registry::{ClientHub, DeviceRegistry, SubscriptionMap};
use crate::reservations::{ReleaseReason, ReleaseTimers, ReservationStore};
use crate::storage::ReportLog;

/// Routes configuration sends, occupancy reports, and subscription traffic
/// between browser clients and court-side devices.
pub struct RelayRouter {
    registry: Arc<DeviceRegistry>,
    hub: Arc<ClientHub>,
    reservations: Arc<ReservationStore>,
    reports: Arc<ReportLog>,
    subscriptions: SubscriptionMap,
    occupancy: OccupancyStore,
    timers: ReleaseTimers,
    release_window: Duration,
}

impl RelayRouter {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        hub: Arc<ClientHub>,
        reservations: Arc<ReservationStore>,
        reports: Arc<ReportLog>,
        release_window: Duration,
    ) -> Self {
        Self {
            registry,
            hub,
            reservations,
            reports,
            subscriptions: SubscriptionMap::new(),
            occupancy: OccupancyStore::new(),
            timers: ReleaseTimers::new(),
            release_window,
        }
    }

    /// Get a reference to the client hub (the socket gateway registers
    /// outbound channels through it).
    pub fn hub(&self) -> &Arc<ClientHub> {
        &self.hub
    }

    /// Get a reference to the device registry.
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Get a reference to the reservation store.
    pub fn reservations(&self) -> &Arc<ReservationStore> {
        &self.reservations
    }

    /// `register_raspy`: bind a device connection and record the access.
    pub async fn register_device(&self, conn_id: &str, raspy_id: &str, club: Option<String>) {
        self.registry.register(raspy_id, club, conn_id).await;
        self.reports.record_access(raspy_id, "inicio_de_sesion").await;
    }

    /// Deliver a configuration payload to a device (`POST /api/send_raspy`).
    ///
    /// Reserves any wristbands the payload names, arms the safety timer, and
    /// broadcasts the club's updated in-use list before the payload is
    /// pushed to the device. Returns the device's club so the caller can
    /// echo it back.
    pub async fn send_configuration(
        &self,
        raspy_id: &str,
        datos: Value,
    ) -> Result<Option<String>, RelayError> {
        let conn_id = self
            .registry
            .lookup(raspy_id)
            .await
            .ok_or_else(|| RelayError::DeviceNotConnected(raspy_id.to_string()))?;
        let club = self.registry.club_of(raspy_id).await;

        let wristbands = protocol::wristband_names(&datos);
        if !wristbands.is_empty() {
            if let Some(club) = &club {
                // Cancel before touching the store: a stale timer must not be
                // able to fire between the reserve below and the re-arm.
                self.timers.cancel(raspy_id).await;
                let outcome = self.reservations.reserve(raspy_id, club, wristbands).await;
                if let Some((displaced_club, in_use)) = outcome.displaced {
                    self.broadcast_in_use(&displaced_club, in_use).await;
                }
                self.broadcast_in_use(club, outcome.in_use).await;
                self.arm_release_timer(raspy_id).await;
            } else {
                warn!(
                    raspy_id = %raspy_id,
                    "Configuration names wristbands but the device has no club; skipping reservation"
                );
            }
        }

        self.hub
            .send(
                &conn_id,
                ServerEvent::Config {
                    raspy_id: raspy_id.to_string(),
                    datos: datos.clone(),
                },
            )
            .await;
        self.reports
            .record_configuration(raspy_id, club.as_deref(), &datos)
            .await;

        info!(raspy_id = %raspy_id, club = ?club, "Configuration delivered");
        Ok(club)
    }

    /// `consultar_raspy`: subscribe a connection to a device and replay the
    /// current state to it.
    pub async fn subscribe(&self, conn_id: &str, raspy_id: &str) {
        self.subscriptions.subscribe(conn_id, raspy_id).await;

        if let Some(status) = self.occupancy.get(raspy_id).await {
            let payload =
                serde_json::to_value(&status).unwrap_or_else(|_| json!({ "enEspera": null }));
            self.hub
                .send(
                    conn_id,
                    ServerEvent::Estado {
                        raspy_id: raspy_id.to_string(),
                        payload,
                    },
                )
                .await;
        }

        if let Some(club) = self.registry.club_of(raspy_id).await {
            let pulseras = self.reservations.in_use(&club).await;
            self.hub
                .send(conn_id, ServerEvent::PulserasEnUso { club, pulseras })
                .await;
        }
    }

    /// `estado_cancha`: store the report, release on confirmed completion,
    /// fan the raw payload out to the device's watchers.
    pub async fn report_occupancy(&self, report: EstadoCancha) {
        self.occupancy
            .update(
                &report.raspy_id,
                CourtStatus {
                    en_espera: report.en_espera,
                    estado: report.estado.clone(),
                },
            )
            .await;

        if report.en_espera == Some(true) {
            self.release(&report.raspy_id, ReleaseReason::Confirmed).await;
        }

        let payload = serde_json::to_value(&report).unwrap_or_else(|_| json!({}));
        for conn_id in self.subscriptions.watchers_of(&report.raspy_id).await {
            self.hub
                .send(
                    &conn_id,
                    ServerEvent::Estado {
                        raspy_id: report.raspy_id.clone(),
                        payload: payload.clone(),
                    },
                )
                .await;
        }
    }

    /// Connection closed. Device and subscriber cleanup both run; a
    /// connection is never both, but the checks are unconditional.
    pub async fn handle_disconnect(&self, conn_id: &str) {
        self.hub.unregister(conn_id).await;

        if let Some(raspy_id) = self.registry.unbind(conn_id).await {
            let payload = json!({ "enEspera": null });
            for watcher in self.subscriptions.watchers_of(&raspy_id).await {
                self.hub
                    .send(
                        &watcher,
                        ServerEvent::Estado {
                            raspy_id: raspy_id.clone(),
                            payload: payload.clone(),
                        },
                    )
                    .await;
            }
            self.occupancy.remove(&raspy_id).await;
            self.release(&raspy_id, ReleaseReason::Disconnected).await;
        }

        let _ = self.subscriptions.unsubscribe(conn_id).await;
    }

    /// Release whatever the device holds, cancel its timer, and broadcast
    /// the updated in-use list. Safe to call when nothing is held.
    pub async fn release(&self, raspy_id: &str, reason: ReleaseReason) {
        self.timers.cancel(raspy_id).await;
        Self::release_and_notify(&self.reservations, &self.hub, raspy_id, reason).await;
    }

    async fn release_and_notify(
        reservations: &ReservationStore,
        hub: &ClientHub,
        raspy_id: &str,
        reason: ReleaseReason,
    ) {
        if let Some(outcome) = reservations.release(raspy_id, reason).await {
            hub.broadcast(&ServerEvent::PulserasEnUso {
                club: outcome.club,
                pulseras: outcome.in_use,
            })
            .await;
        }
    }

    async fn broadcast_in_use(&self, club: &str, pulseras: Vec<String>) {
        self.hub
            .broadcast(&ServerEvent::PulserasEnUso {
                club: club.to_string(),
                pulseras,
            })
            .await;
    }

    async fn arm_release_timer(&self, raspy_id: &str) {
        let reservations = Arc::clone(&self.reservations);
        let hub = Arc::clone(&self.hub);
        let id = raspy_id.to_string();
        self.timers
            .arm(raspy_id, self.release_window, async move {
                // The timer entry was claimed before this runs; no cancel
                // needed, and a racing explicit release makes this a no-op.
                Self::release_and_notify(&reservations, &hub, &id, ReleaseReason::Timeout).await;
            })
            .await;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// `POST /api/send_raspy` without `raspy_id` or `datos`.
    #[error("Faltan id o datos")]
    MissingFields,

    /// Access logging without a device id.
    #[error("Falta raspy_id")]
    MissingDeviceId,

    /// Feedback without a device id or message.
    #[error("Faltan raspy_id o mensaje")]
    MissingFeedbackFields,

    /// The target device has no live connection.
    #[error("Dispositivo {0} no conectado")]
    DeviceNotConnected(String),
}
