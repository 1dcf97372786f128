//! Courtlink Relay Server
//!
//! Relays match configurations from the setup wizard to court-side devices
//! and court-occupancy status back to watching browsers, while tracking
//! which wristbands are in use per club.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use socketioxide::SocketIo;
use tracing::info;

use courtlink_core::tracing_init::init_tracing;
use courtlink_relay::registry::{ClientHub, DeviceRegistry};
use courtlink_relay::reservations::{DEFAULT_RELEASE_WINDOW, ReservationStore};
use courtlink_relay::router::RelayRouter;
use courtlink_relay::server::{HttpState, api_router, attach};
use courtlink_relay::storage::ReportLog;

#[derive(Parser, Debug)]
#[command(name = "courtlink-relay")]
#[command(
    version,
    about = "Courtlink relay server - config delivery and wristband tracking"
)]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "COURTLINK_ADDR", default_value = "0.0.0.0:5000")]
    addr: SocketAddr,

    /// Directory for access/configuration report files.
    #[arg(long, default_value = "reports")]
    reports_dir: PathBuf,

    /// Directory for feedback message files.
    #[arg(long, default_value = "mensajes")]
    messages_dir: PathBuf,

    /// Seconds before an unconfirmed wristband reservation is released.
    #[arg(long, default_value_t = DEFAULT_RELEASE_WINDOW.as_secs())]
    release_window_secs: u64,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing("courtlink_relay=info", args.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %args.addr,
        "Starting courtlink-relay"
    );

    let reports = Arc::new(ReportLog::open(&args.reports_dir, &args.messages_dir).await?);
    let registry = Arc::new(DeviceRegistry::new());
    let hub = Arc::new(ClientHub::new());
    let reservations = Arc::new(ReservationStore::new());
    let router = Arc::new(RelayRouter::new(
        Arc::clone(&registry),
        Arc::clone(&hub),
        Arc::clone(&reservations),
        Arc::clone(&reports),
        Duration::from_secs(args.release_window_secs),
    ));

    let (socket_layer, io) = SocketIo::new_layer();
    attach(&io, Arc::clone(&router));

    let app = api_router(HttpState {
        router: Arc::clone(&router),
        reports: Arc::clone(&reports),
    })
    .layer(socket_layer);

    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    info!(addr = %args.addr, "Relay server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Received shutdown signal");
}
