//! Record shapes for the day-partitioned report log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use courtlink_core::protocol;

/// A device (or the wizard on its behalf) touched the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRecord {
    pub timestamp: DateTime<Utc>,
    pub raspy_id: String,
    pub tipo: String,
}

/// A match configuration was delivered to a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationRecord {
    pub timestamp: DateTime<Utc>,
    pub raspy_id: String,
    pub club: Option<String>,
    /// Always `"configuracion_enviada"`.
    pub tipo: String,
    pub partido: MatchSummary,
}

/// Freeform feedback sent from a court.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub timestamp: DateTime<Utc>,
    pub raspy_id: String,
    pub club: String,
    pub mensaje: String,
}

/// The admin-facing subset of a configuration payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jugadores: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parejas: Option<Value>,
    pub pulseras: WristbandNames,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duracion: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comienzo: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fin: Option<Value>,
    #[serde(
        rename = "tiempoCalentamiento",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub tiempo_calentamiento: Option<Value>,
    #[serde(
        rename = "cambioDeLado",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cambio_de_lado: Option<Value>,
    #[serde(rename = "tipoGames", default, skip_serializing_if = "Option::is_none")]
    pub tipo_games: Option<Value>,
}

/// The wristband names of a configuration, flattened to one name per pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WristbandNames {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pareja1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pareja2: Option<String>,
}

impl MatchSummary {
    /// Project the log-relevant subset out of a raw configuration payload.
    pub fn from_payload(datos: &Value) -> Self {
        let field = |name: &str| datos.get(name).filter(|v| !v.is_null()).cloned();
        Self {
            jugadores: field("jugadores"),
            parejas: field("parejas"),
            pulseras: WristbandNames {
                pareja1: protocol::pareja_nombre(datos, "pareja1"),
                pareja2: protocol::pareja_nombre(datos, "pareja2"),
            },
            duracion: field("duracion"),
            comienzo: field("comienzo"),
            fin: field("fin"),
            tiempo_calentamiento: field("tiempoCalentamiento"),
            cambio_de_lado: field("cambioDeLado"),
            tipo_games: field("tipoGames"),
        }
    }
}
