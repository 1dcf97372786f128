//! Tests for the day-partitioned report log.

use serde_json::{Value, json};

use super::{MatchSummary, ReportLog};

fn today_file(dir: &std::path::Path) -> std::path::PathBuf {
    dir.join(format!("{}.json", chrono::Local::now().format("%Y-%m-%d")))
}

async fn read_entries(path: &std::path::Path) -> Vec<Value> {
    serde_json::from_slice(&tokio::fs::read(path).await.unwrap()).unwrap()
}

#[tokio::test]
async fn access_records_append_to_the_day_file() {
    let tmp = tempfile::tempdir().unwrap();
    let log = ReportLog::open(tmp.path().join("reports"), tmp.path().join("mensajes"))
        .await
        .unwrap();

    log.record_access("court1", "inicio_de_sesion").await;
    log.record_access("court1", "acceso").await;

    let entries = read_entries(&today_file(&tmp.path().join("reports"))).await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["raspy_id"], "court1");
    assert_eq!(entries[0]["tipo"], "inicio_de_sesion");
    assert_eq!(entries[1]["tipo"], "acceso");
    assert!(entries[0]["timestamp"].is_string());
}

#[tokio::test]
async fn configuration_record_keeps_the_admin_subset() {
    let tmp = tempfile::tempdir().unwrap();
    let log = ReportLog::open(tmp.path().join("reports"), tmp.path().join("mensajes"))
        .await
        .unwrap();

    let datos = json!({
        "jugadores": ["Ana", "Luis", "Eva", "Marc"],
        "pulseras": {
            "pareja1": { "nombre": "A01", "color": "rojo" },
            "pareja2": { "nombre": "A03" }
        },
        "duracion": 90,
        "tiempoCalentamiento": 5,
        "tipoGames": "oro",
        "marcador": { "interno": true }
    });
    log.record_configuration("court1", Some("la-esquina"), &datos)
        .await;

    let entries = read_entries(&today_file(&tmp.path().join("reports"))).await;
    assert_eq!(entries.len(), 1);
    let partido = &entries[0]["partido"];
    assert_eq!(entries[0]["tipo"], "configuracion_enviada");
    assert_eq!(entries[0]["club"], "la-esquina");
    assert_eq!(partido["pulseras"]["pareja1"], "A01");
    assert_eq!(partido["pulseras"]["pareja2"], "A03");
    assert_eq!(partido["duracion"], 90);
    assert_eq!(partido["tiempoCalentamiento"], 5);
    assert_eq!(partido["tipoGames"], "oro");
    // Fields outside the admin subset are not persisted.
    assert!(partido.get("marcador").is_none());
}

#[tokio::test]
async fn configuration_without_club_serializes_null() {
    let tmp = tempfile::tempdir().unwrap();
    let log = ReportLog::open(tmp.path().join("reports"), tmp.path().join("mensajes"))
        .await
        .unwrap();

    log.record_configuration("court1", None, &json!({})).await;

    let entries = read_entries(&today_file(&tmp.path().join("reports"))).await;
    assert_eq!(entries[0]["club"], Value::Null);
}

#[tokio::test]
async fn feedback_goes_to_the_messages_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let log = ReportLog::open(tmp.path().join("reports"), tmp.path().join("mensajes"))
        .await
        .unwrap();

    log.record_feedback("court1", "la-esquina", "la pantalla parpadea")
        .await;

    let entries = read_entries(&today_file(&tmp.path().join("mensajes"))).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["club"], "la-esquina");
    assert_eq!(entries[0]["mensaje"], "la pantalla parpadea");
    assert!(!today_file(&tmp.path().join("reports")).exists());
}

#[tokio::test]
async fn corrupt_day_file_is_replaced_not_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let reports_dir = tmp.path().join("reports");
    let log = ReportLog::open(&reports_dir, tmp.path().join("mensajes"))
        .await
        .unwrap();

    tokio::fs::write(today_file(&reports_dir), b"{ not json")
        .await
        .unwrap();
    log.record_access("court1", "acceso").await;

    let entries = read_entries(&today_file(&reports_dir)).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["tipo"], "acceso");
}

#[test]
fn match_summary_drops_null_fields() {
    let summary = MatchSummary::from_payload(&json!({ "duracion": null }));
    let value = serde_json::to_value(&summary).unwrap();
    assert_eq!(value, json!({ "pulseras": {} }));
}
