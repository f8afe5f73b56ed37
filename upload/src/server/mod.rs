//! Development backend for the smart upload endpoints.
//!
//! Implements the same contract as the HEMS backend so the CLI and the
//! browser front-end can be exercised without it. Devices are kept in
//! memory for the lifetime of the process.
//!
//! # API Endpoints
//!
//! | Method | Path                         | Description                         |
//! |--------|------------------------------|-------------------------------------|
//! | GET    | `/health`                    | Health check                        |
//! | POST   | `/api/smart-upload/preview/` | Parse an uploaded file (multipart)  |
//! | POST   | `/api/smart-upload/save/`    | Persist `{"devices": [...]}`        |
//! | GET    | `/api/devices/`              | List saved devices                  |

mod store;

pub use store::{DeviceStore, StoredDevice};

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, Method, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;

use crate::api::FILE_FIELD;
use crate::config::{UploadConfig, DEVICES_PATH, MAX_FILE_SIZE, PREVIEW_PATH, SAVE_PATH};
use crate::error::{ParseError, ServerError};
use crate::models::PreviewRow;
use crate::parser::{self, Ingested};
use crate::validation::{check_row, validate_file, Severity};

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

type ApiError = (StatusCode, Json<Value>);

/// Shared handler state.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    store: Arc<RwLock<DeviceStore>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn device_count(&self) -> usize {
        self.store.read().await.len()
    }
}

/// Routes with permissive CORS for local front-end development.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route(PREVIEW_PATH, post(preview_upload))
        .route(SAVE_PATH, post(save_devices))
        .route(DEVICES_PATH, get(list_devices))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new((MAX_FILE_SIZE + MULTIPART_OVERHEAD) as usize))
        .layer(cors)
        .with_state(state)
}

/// Serve on an already bound listener.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), ServerError> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Bind `0.0.0.0:port` and serve until the process exits.
pub async fn start_server(port: u16) -> Result<(), ServerError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    println!("🚀 HEMS upload server running on http://localhost:{}", port);
    println!("   POST {} - Preview a device file", PREVIEW_PATH);
    println!("   POST {}    - Save edited devices", SAVE_PATH);
    println!("   GET  {}            - List saved devices", DEVICES_PATH);
    println!("   GET  /health                  - Health check");
    println!();

    serve(listener, AppState::new()).await
}

// =============================================================================
// Handlers
// =============================================================================

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "hems-upload",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "preview": format!("POST {}", PREVIEW_PATH),
            "save": format!("POST {}", SAVE_PATH),
            "devices": format!("GET {}", DEVICES_PATH)
        }
    }))
}

async fn preview_upload(mut multipart: Multipart) -> Result<Json<Value>, ApiError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(&format!("Multipart error: {}", e)))?
    {
        if field.name() == Some(FILE_FIELD) {
            file_name = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| bad_request(&format!("Read error: {}", e)))?;
            file_data = Some(bytes.to_vec());
        }
    }

    let bytes = file_data.ok_or_else(|| bad_request("No file provided"))?;
    let name = file_name.unwrap_or_else(|| "upload.csv".to_string());

    let accepted = UploadConfig::default().with_json();
    validate_file(&name, bytes.len() as u64, &accepted).map_err(|e| bad_request(&e.to_string()))?;

    tracing::info!("preview request: {} ({} bytes)", name, bytes.len());

    let ingested = parser::ingest(&name, &bytes).map_err(|e| {
        tracing::warn!("could not parse {}: {}", name, e);
        let status = match e {
            ParseError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::BAD_REQUEST,
        };
        (status, Json(error_response(&e.to_string())))
    })?;

    Ok(Json(preview_response(&ingested)))
}

#[derive(Debug, Deserialize)]
struct SaveBody {
    devices: Vec<Value>,
}

async fn save_devices(State(state): State<AppState>, Json(body): Json<SaveBody>) -> Result<Json<Value>, ApiError> {
    if body.devices.is_empty() {
        return Err(bad_request("No devices provided"));
    }

    let mut store = state.store.write().await;
    let report = store_rows(&mut store, body.devices);
    tracing::info!(
        "save request: {} saved, {} skipped",
        report["saved_count"],
        report["skipped_count"]
    );
    Ok(Json(report))
}

async fn list_devices(State(state): State<AppState>) -> Json<Value> {
    let store = state.store.read().await;
    Json(json!({
        "count": store.len(),
        "devices": store.list(),
    }))
}

// =============================================================================
// Response building
// =============================================================================

fn error_response(error: &str) -> Value {
    json!({ "success": false, "error": error })
}

fn bad_request(error: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(error_response(error)))
}

fn preview_response(ingested: &Ingested) -> Value {
    let mapped: BTreeMap<&str, &str> = ingested
        .mapped
        .iter()
        .map(|(header, field)| (header.as_str(), field.key()))
        .collect();

    json!({
        "success": true,
        "devices": ingested.rows,
        "metadata": {
            "encoding": ingested.encoding,
            "delimiter": ingested.delimiter.map(String::from),
            "row_count": ingested.rows.len(),
            "mapped_columns": mapped,
            "unmapped_columns": ingested.unmapped,
        }
    })
}

/// Validate and store each submitted row, reporting per-row problems.
///
/// Rows with blocking hints or duplicates are skipped; the rest are saved.
fn store_rows(store: &mut DeviceStore, devices: Vec<Value>) -> Value {
    let mut saved = 0usize;
    let mut skipped = 0usize;
    let mut warnings = Vec::new();
    let mut duplicates = Vec::new();
    let mut validation_errors: BTreeMap<String, BTreeMap<String, Vec<String>>> = BTreeMap::new();

    for (i, device) in devices.into_iter().enumerate() {
        let label = format!("Row {}", i + 1);

        let row: PreviewRow = match serde_json::from_value(device) {
            Ok(row) => row,
            Err(e) => {
                validation_errors
                    .entry(label)
                    .or_default()
                    .entry("general".to_string())
                    .or_default()
                    .push(e.to_string());
                skipped += 1;
                continue;
            }
        };

        let mut blocked = false;
        for issue in check_row(&row) {
            match issue.severity {
                Severity::Error => {
                    blocked = true;
                    validation_errors
                        .entry(label.clone())
                        .or_default()
                        .entry(issue.field.key().to_string())
                        .or_default()
                        .push(issue.message);
                }
                Severity::Warning => warnings.push(format!("{}: {}", label, issue.message)),
            }
        }
        if blocked {
            skipped += 1;
            continue;
        }

        let description = format!("{} in {}/{}", row.device_type, row.building.trim(), row.room.trim());
        if store.insert(row).is_some() {
            saved += 1;
        } else {
            duplicates.push(format!("{}: {} already exists", label, description));
            skipped += 1;
        }
    }

    json!({
        "success": true,
        "saved_count": saved,
        "skipped_count": skipped,
        "warnings": warnings,
        "errors": [],
        "duplicates": duplicates,
        "validation_errors": validation_errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::parse_save_body;

    #[test]
    fn test_store_rows_reports_partial_failure() {
        let mut store = DeviceStore::new();
        let devices = vec![
            json!({"building": "A", "room": "101", "device_type": "FAN", "watt_rating": 60, "quantity": 2}),
            json!({"building": "A", "room": "101", "device_type": "FAN", "watt_rating": 60, "quantity": 2}),
            json!({"building": "", "room": "102", "device_type": "AC", "watt_rating": 1500}),
            json!({"building": "B", "room": "1", "device_type": "Geyser", "watt_rating": 2000}),
            json!("not a row"),
        ];

        let report = store_rows(&mut store, devices);
        assert_eq!(report["saved_count"], 2);
        assert_eq!(report["skipped_count"], 3);
        assert_eq!(store.len(), 2);

        // the report reads back through the client normalizer
        let outcome = parse_save_body(&report.to_string()).unwrap();
        assert_eq!(outcome.summary(), "2 devices saved");
        assert_eq!(outcome.duplicates.len(), 1);
        assert_eq!(outcome.warnings, vec!["Row 4: Unknown device type 'Geyser'"]);

        let grouped: BTreeMap<_, _> = outcome.grouped_issues().into_iter().collect();
        assert_eq!(grouped["Row 3"]["building"], vec!["Building is required"]);
        assert!(grouped["Row 5"].contains_key("general"));
    }

    #[test]
    fn test_store_rows_reports_zero_quantity() {
        let mut store = DeviceStore::new();
        let devices = vec![
            json!({"building": "A", "room": "101", "device_type": "FAN", "watt_rating": 60, "quantity": 0}),
            json!({"building": "A", "room": "102", "device_type": "PC", "watt_rating": 150, "quantity": 1, "star_rating": 9}),
        ];

        let report = store_rows(&mut store, devices);
        assert_eq!(report["saved_count"], 0);
        assert_eq!(report["skipped_count"], 2);
        assert!(store.is_empty());
        assert_eq!(report["validation_errors"]["Row 1"]["quantity"][0], "Quantity must be at least 1");
        assert_eq!(report["validation_errors"]["Row 2"]["star_rating"][0], "Star rating must be 1 to 5");
    }

    #[test]
    fn test_preview_response_shape() {
        let ingested = parser::ingest("d.csv", b"building,room,type,watts\nA,101,FAN,60\n").unwrap();
        let body = preview_response(&ingested);
        assert_eq!(body["success"], true);
        assert_eq!(body["metadata"]["delimiter"], ",");
        assert_eq!(body["metadata"]["mapped_columns"]["watts"], "watt_rating");

        let rows = crate::api::parse_preview_body(&body.to_string()).unwrap();
        assert_eq!(rows[0].watt_rating, 60.0);
    }
}
