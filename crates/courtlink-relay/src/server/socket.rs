//! Socket.io gateway: device registration, subscriptions, occupancy reports.
//!
//! Every connection gets an outbound channel in the [`ClientHub`]; a
//! forwarder task turns pushed [`ServerEvent`]s into the dynamically named
//! emits the deployed clients listen for. Inbound events go straight to the
//! relay router.

use std::sync::Arc;

use socketioxide::SocketIo;
use socketioxide::extract::{Data, SocketRef};
use tokio::sync::mpsc;
use tracing::info;

use courtlink_core::protocol::{ConsultarRaspy, EstadoCancha, RegisterRaspy, ServerEvent};

use crate::router::RelayRouter;

/// Wire the socket.io namespace onto the relay router.
pub fn attach(io: &SocketIo, router: Arc<RelayRouter>) {
    io.ns("/", move |socket: SocketRef| {
        let router = Arc::clone(&router);
        async move { on_connect(socket, router).await }
    });
}

async fn on_connect(socket: SocketRef, router: Arc<RelayRouter>) {
    let conn_id = socket.id.to_string();
    info!(conn_id = %conn_id, "Client connected");

    // Outbound channel: ends when the hub drops the sender on disconnect.
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    router.hub().register(&conn_id, tx).await;
    {
        let socket = socket.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let _ = socket.emit(event.name(), &event.payload());
            }
        });
    }

    // ── disconnect ──────────────────────────────────────────────────
    {
        let router = Arc::clone(&router);
        socket.on_disconnect(move |s: SocketRef| {
            let router = Arc::clone(&router);
            async move {
                info!(conn_id = %s.id, "Client disconnected");
                router.handle_disconnect(&s.id.to_string()).await;
            }
        });
    }

    // ── register_raspy ──────────────────────────────────────────────
    {
        let router = Arc::clone(&router);
        socket.on(
            "register_raspy",
            move |s: SocketRef, Data::<RegisterRaspy>(data)| {
                let router = Arc::clone(&router);
                async move {
                    router
                        .register_device(&s.id.to_string(), &data.raspy_id, data.club)
                        .await;
                }
            },
        );
    }

    // ── consultar_raspy ─────────────────────────────────────────────
    {
        let router = Arc::clone(&router);
        socket.on(
            "consultar_raspy",
            move |s: SocketRef, Data::<ConsultarRaspy>(data)| {
                let router = Arc::clone(&router);
                async move {
                    info!(conn_id = %s.id, raspy_id = %data.raspy_id, "Client watching device");
                    router.subscribe(&s.id.to_string(), &data.raspy_id).await;
                }
            },
        );
    }

    // ── estado_cancha ───────────────────────────────────────────────
    {
        let router = Arc::clone(&router);
        socket.on(
            "estado_cancha",
            move |_s: SocketRef, Data::<EstadoCancha>(report)| {
                let router = Arc::clone(&router);
                async move {
                    router.report_occupancy(report).await;
                }
            },
        );
    }
}
