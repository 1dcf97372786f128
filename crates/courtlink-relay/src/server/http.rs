//! HTTP API: configuration sends, access logging, feedback.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};

use courtlink_core::protocol::{
    EnviarFeedback, RegistrarAcceso, SendRaspyRequest, SendRaspyResponse,
};

use crate::router::{RelayError, RelayRouter};
use crate::storage::ReportLog;

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub router: Arc<RelayRouter>,
    pub reports: Arc<ReportLog>,
}

/// Build the `/api` router.
pub fn api_router(state: HttpState) -> Router {
    Router::new()
        .route("/api/send_raspy", post(send_raspy))
        .route("/api/registrar_acceso", post(registrar_acceso))
        .route("/api/enviar_feedback", post(enviar_feedback))
        .with_state(state)
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

/// `POST /api/send_raspy`: push a match configuration to a device.
async fn send_raspy(
    State(state): State<HttpState>,
    Json(req): Json<SendRaspyRequest>,
) -> Result<Json<SendRaspyResponse>, RelayError> {
    let (raspy_id, datos) = match (req.raspy_id, req.datos) {
        (Some(id), Some(datos)) if !id.is_empty() => (id, datos),
        _ => return Err(RelayError::MissingFields),
    };

    let club = state.router.send_configuration(&raspy_id, datos).await?;
    Ok(Json(SendRaspyResponse {
        mensaje: "Datos enviados correctamente".to_string(),
        club,
    }))
}

/// `POST /api/registrar_acceso`: the wizard records a device access.
async fn registrar_acceso(
    State(state): State<HttpState>,
    Json(req): Json<RegistrarAcceso>,
) -> Result<Json<Value>, RelayError> {
    let Some(raspy_id) = req.raspy_id.filter(|id| !id.is_empty()) else {
        return Err(RelayError::MissingDeviceId);
    };

    state
        .reports
        .record_access(&raspy_id, req.tipo.as_deref().unwrap_or("acceso"))
        .await;
    Ok(Json(json!({ "mensaje": "Acceso registrado" })))
}

/// `POST /api/enviar_feedback`: freeform feedback from a court.
async fn enviar_feedback(
    State(state): State<HttpState>,
    Json(req): Json<EnviarFeedback>,
) -> Result<Json<Value>, RelayError> {
    let (raspy_id, mensaje) = match (
        req.raspy_id.filter(|id| !id.is_empty()),
        req.mensaje.filter(|m| !m.is_empty()),
    ) {
        (Some(id), Some(mensaje)) => (id, mensaje),
        _ => return Err(RelayError::MissingFeedbackFields),
    };

    state
        .reports
        .record_feedback(&raspy_id, req.club.as_deref().unwrap_or("desconocido"), &mensaje)
        .await;
    Ok(Json(json!({ "mensaje": "Feedback registrado exitosamente" })))
}
