//! Wire protocol types for the Courtlink socket and HTTP APIs.
//!
//! Field names follow the JSON contract expected by the deployed devices and
//! the setup wizard, hence the Spanish identifiers and the `camelCase`
//! occupancy fields. Configuration payloads travel as opaque
//! [`serde_json::Value`]s; only the wristband names are picked out here.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// `register_raspy`: a device announces itself and its club.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRaspy {
    pub raspy_id: String,
    #[serde(default)]
    pub club: Option<String>,
}

/// `consultar_raspy`: a browser asks to watch one device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultarRaspy {
    pub raspy_id: String,
}

/// `estado_cancha`: a device reports court occupancy.
///
/// `enEspera: true` means the court is back to waiting (the match finished);
/// `estado` carries whatever extra state the firmware attaches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstadoCancha {
    pub raspy_id: String,
    #[serde(rename = "enEspera", default)]
    pub en_espera: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estado: Option<Value>,
}

/// Last-known occupancy for one device, as replayed to late subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourtStatus {
    #[serde(rename = "enEspera")]
    pub en_espera: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estado: Option<Value>,
}

/// Body of `POST /api/send_raspy`. Both fields are validated by the handler
/// so a missing one yields the wire-level 400 instead of a 422.
#[derive(Debug, Clone, Deserialize)]
pub struct SendRaspyRequest {
    #[serde(default)]
    pub raspy_id: Option<String>,
    #[serde(default)]
    pub datos: Option<Value>,
}

/// 200 body of `POST /api/send_raspy`.
#[derive(Debug, Clone, Serialize)]
pub struct SendRaspyResponse {
    pub mensaje: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub club: Option<String>,
}

/// Body of `POST /api/registrar_acceso`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrarAcceso {
    #[serde(default)]
    pub raspy_id: Option<String>,
    #[serde(default)]
    pub tipo: Option<String>,
}

/// Body of `POST /api/enviar_feedback`.
#[derive(Debug, Clone, Deserialize)]
pub struct EnviarFeedback {
    #[serde(default)]
    pub raspy_id: Option<String>,
    #[serde(default)]
    pub club: Option<String>,
    #[serde(default)]
    pub mensaje: Option<String>,
}

/// The wristband name configured for one pair, if any
/// (`datos.pulseras.<pareja>.nombre`).
pub fn pareja_nombre(datos: &Value, pareja: &str) -> Option<String> {
    datos
        .get("pulseras")
        .and_then(|p| p.get(pareja))
        .and_then(|p| p.get("nombre"))
        .and_then(Value::as_str)
        .filter(|nombre| !nombre.is_empty())
        .map(str::to_string)
}

/// All wristband names in a configuration payload: 0, 1, or 2, deduplicated.
pub fn wristband_names(datos: &Value) -> Vec<String> {
    let mut names = Vec::new();
    for pareja in ["pareja1", "pareja2"] {
        if let Some(nombre) = pareja_nombre(datos, pareja) {
            if !names.contains(&nombre) {
                names.push(nombre);
            }
        }
    }
    names
}

/// Server→client push events. The socket gateway maps these onto the
/// dynamically named socket.io events the deployed clients listen for.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// `estado_cancha_<raspy_id>`: occupancy payload, or `{"enEspera": null}`
    /// when the device disconnected.
    Estado { raspy_id: String, payload: Value },
    /// `pulseras_en_uso_<club>`: broadcast to every connection; clients
    /// filter by event name.
    PulserasEnUso { club: String, pulseras: Vec<String> },
    /// `config_<raspy_id>`: raw configuration payload, to the device only.
    Config { raspy_id: String, datos: Value },
}

impl ServerEvent {
    /// The socket.io event name this event is emitted under.
    pub fn name(&self) -> String {
        match self {
            Self::Estado { raspy_id, .. } => format!("estado_cancha_{raspy_id}"),
            Self::PulserasEnUso { club, .. } => format!("pulseras_en_uso_{club}"),
            Self::Config { raspy_id, .. } => format!("config_{raspy_id}"),
        }
    }

    /// The JSON payload emitted with the event.
    pub fn payload(&self) -> Value {
        match self {
            Self::Estado { payload, .. } => payload.clone(),
            Self::PulserasEnUso { pulseras, .. } => json!({ "pulserasEnUso": pulseras }),
            Self::Config { datos, .. } => datos.clone(),
        }
    }
}
