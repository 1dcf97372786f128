//! Day-partitioned JSON report log.
//!
//! One pretty-printed JSON array per calendar day (local date). Access and
//! configuration records land in the reports directory, feedback in the
//! messages directory. Write failures are reported and swallowed: a relay
//! operation must never fail because its record could not be persisted.

use std::path::{Path, PathBuf};

use chrono::{Local, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use super::models::{AccessRecord, ConfigurationRecord, FeedbackRecord, MatchSummary};

/// Append-only sink for access, configuration, and feedback records.
pub struct ReportLog {
    reports_dir: PathBuf,
    messages_dir: PathBuf,
}

impl ReportLog {
    /// Open the sink, creating both directories if needed.
    pub async fn open(
        reports_dir: impl Into<PathBuf>,
        messages_dir: impl Into<PathBuf>,
    ) -> Result<Self, ReportError> {
        let reports_dir = reports_dir.into();
        let messages_dir = messages_dir.into();
        tokio::fs::create_dir_all(&reports_dir).await?;
        tokio::fs::create_dir_all(&messages_dir).await?;
        Ok(Self {
            reports_dir,
            messages_dir,
        })
    }

    /// Record an access event (`tipo` e.g. `"acceso"`, `"inicio_de_sesion"`).
    pub async fn record_access(&self, raspy_id: &str, tipo: &str) {
        let record = AccessRecord {
            timestamp: Utc::now(),
            raspy_id: raspy_id.to_string(),
            tipo: tipo.to_string(),
        };
        self.append(&self.reports_dir, &record, "access").await;
        info!(raspy_id = %raspy_id, tipo = %tipo, "Access recorded");
    }

    /// Record a configuration that was delivered to a device.
    pub async fn record_configuration(&self, raspy_id: &str, club: Option<&str>, datos: &Value) {
        let record = ConfigurationRecord {
            timestamp: Utc::now(),
            raspy_id: raspy_id.to_string(),
            club: club.map(str::to_string),
            tipo: "configuracion_enviada".to_string(),
            partido: MatchSummary::from_payload(datos),
        };
        self.append(&self.reports_dir, &record, "configuration").await;
        info!(raspy_id = %raspy_id, "Configuration recorded");
    }

    /// Record freeform feedback from a court.
    pub async fn record_feedback(&self, raspy_id: &str, club: &str, mensaje: &str) {
        let record = FeedbackRecord {
            timestamp: Utc::now(),
            raspy_id: raspy_id.to_string(),
            club: club.to_string(),
            mensaje: mensaje.to_string(),
        };
        self.append(&self.messages_dir, &record, "feedback").await;
        info!(raspy_id = %raspy_id, "Feedback recorded");
    }

    /// Append one record to today's file in `dir`. Errors are logged and
    /// swallowed.
    async fn append<T: Serialize>(&self, dir: &Path, record: &T, kind: &str) {
        if let Err(e) = Self::try_append(dir, record).await {
            error!(error = %e, kind = %kind, "Failed to persist report record");
        }
    }

    async fn try_append<T: Serialize>(dir: &Path, record: &T) -> Result<(), ReportError> {
        let path = dir.join(format!("{}.json", Local::now().format("%Y-%m-%d")));

        let mut entries = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Vec<Value>>(&bytes).unwrap_or_else(|e| {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Unreadable report file, starting a fresh array"
                );
                Vec::new()
            }),
            Err(_) => Vec::new(),
        };

        entries.push(serde_json::to_value(record)?);
        let bytes = serde_json::to_vec_pretty(&entries)?;
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
