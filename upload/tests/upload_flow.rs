//! End-to-end: the reqwest transport against the development backend.

#![cfg(all(feature = "client", feature = "server"))]

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use hems_upload::server::{self, AppState};
use hems_upload::{
    DeviceType, HttpUploadApi, RowField, TransportError, UploadConfig, UploadController, WorkflowError,
    WorkflowState,
};
use tokio::net::TcpListener;

const DEVICES_CSV: &str = "\
Building,Room,Device Type,Rated Power (W),Quantity,Daily Usage (Hr)
A,101,FAN,60,2,5
";

async fn spawn_backend() -> (UploadConfig, AppState) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new();
    tokio::spawn(server::serve(listener, state.clone()));
    (UploadConfig::new(format!("http://{}", addr)), state)
}

fn write_file(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn test_preview_edit_save_refresh() {
    let (config, state) = spawn_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "devices.csv", DEVICES_CSV.as_bytes());

    let refreshed = Rc::new(Cell::new(0));
    let counter = refreshed.clone();
    let api = HttpUploadApi::new(config.clone()).unwrap();
    let mut upload = UploadController::new(api, config).on_saved(move |_| counter.set(counter.get() + 1));

    assert!(upload.select_path(&path).await.unwrap());
    assert_eq!(upload.preview().await, WorkflowState::PreviewReady);

    let rows = upload.workflow().rows().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].device_type, DeviceType::Fan);
    assert_eq!(rows[0].quantity, 2.0);
    assert_eq!(rows[0].hours_used_per_day, Some(5.0));

    assert!(upload.edit(0, RowField::HoursUsedPerDay, "8"));
    assert_eq!(upload.save().await, WorkflowState::Done);

    let outcome = upload.workflow().outcome().unwrap();
    assert_eq!(outcome.summary(), "1 device saved");
    assert!(!outcome.has_problems());
    assert!(upload.workflow().rows().is_none());
    assert!(upload.workflow().file().is_none());
    assert_eq!(refreshed.get(), 1);

    let devices = upload.api().list_devices().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0]["hours_used_per_day"], 8.0);
    assert_eq!(state.device_count().await, 1);
}

#[tokio::test]
async fn test_duplicate_save_is_partial_success() {
    let (config, _state) = spawn_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "devices.csv", DEVICES_CSV.as_bytes());

    for expected in [1, 0] {
        let api = HttpUploadApi::new(config.clone()).unwrap();
        let mut upload = UploadController::new(api, config.clone());
        upload.select_path(&path).await.unwrap();
        upload.preview().await;
        assert_eq!(upload.save().await, WorkflowState::Done);

        let outcome = upload.workflow().outcome().unwrap();
        assert_eq!(outcome.saved_count, expected);
        assert_eq!(outcome.duplicates.len(), 1 - expected);
    }
}

#[tokio::test]
async fn test_unparseable_upload_fails_preview_and_keeps_file() {
    let (config, _state) = spawn_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "devices.xlsx", b"PK\x03\x04 not really a workbook");

    let api = HttpUploadApi::new(config.clone()).unwrap();
    let mut upload = UploadController::new(api, config);
    upload.select_path(&path).await.unwrap();
    assert_eq!(upload.preview().await, WorkflowState::Failed);

    let error = upload.workflow().error().unwrap();
    assert!(
        matches!(error, WorkflowError::Transport { source: TransportError::Status { code: 415, .. }, .. }),
        "{error:?}"
    );
    assert!(error.to_string().starts_with("Failed to preview file: HTTP 415"));
    assert!(upload.workflow().can_preview());
    assert_eq!(upload.workflow().file().unwrap().name(), "devices.xlsx");
}

#[tokio::test]
async fn test_silent_backend_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let config = UploadConfig::new(format!("http://{}", addr)).with_timeout(Duration::from_secs(1));
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "devices.csv", DEVICES_CSV.as_bytes());

    let api = HttpUploadApi::new(config.clone()).unwrap();
    let mut upload = UploadController::new(api, config);
    upload.select_path(&path).await.unwrap();

    assert_eq!(upload.preview().await, WorkflowState::Failed);
    assert!(upload.workflow().error().unwrap().is_timeout());
    assert!(!upload.workflow().is_busy());
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    // bind then drop to get a port nobody listens on
    let addr = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
    let config = UploadConfig::new(format!("http://{}", addr));

    let api = HttpUploadApi::new(config.clone()).unwrap();
    let mut upload = UploadController::new(api, config);
    upload.select_file("devices.csv", 3, b"a,b".to_vec());

    assert_eq!(upload.preview().await, WorkflowState::Failed);
    assert!(matches!(
        upload.workflow().error(),
        Some(WorkflowError::Transport { source: TransportError::Network(_), .. })
    ));
}
