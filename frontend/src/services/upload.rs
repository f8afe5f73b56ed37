//! Browser transport for the smart upload endpoints (gloo-net).

use futures::future::{select, Either};
use gloo_net::http::Request;
use gloo_timers::future::TimeoutFuture;
use hems_upload::api::{self, FILE_FIELD};
use hems_upload::{
    PreviewRow, SaveRequest, SelectedFile, TransportError, TransportResult, UploadApi, UploadConfig, UploadOutcome,
};
use serde_json::Value;
use web_sys::{AbortController, File, FormData};

/// Sends the workflow's requests with `fetch`.
#[derive(Debug, Clone)]
pub struct BrowserUploadApi {
    config: UploadConfig,
}

impl BrowserUploadApi {
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    fn timeout_ms(&self) -> u32 {
        self.config.request_timeout.as_millis().min(u128::from(u32::MAX)) as u32
    }

    /// Race the request against the timeout, aborting the fetch if it loses.
    async fn send(&self, request: Request, controller: Option<AbortController>) -> TransportResult<(u16, String)> {
        let exchange = async move {
            let response = request
                .send()
                .await
                .map_err(|e| TransportError::Network(format!("HTTP request failed: {}", e)))?;
            let code = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| TransportError::Network(format!("Failed to read response: {}", e)))?;
            Ok::<_, TransportError>((code, body))
        };

        match select(Box::pin(exchange), Box::pin(TimeoutFuture::new(self.timeout_ms()))).await {
            Either::Left((result, _)) => result,
            Either::Right(_) => {
                if let Some(controller) = controller {
                    controller.abort();
                }
                Err(TransportError::Timeout(self.config.request_timeout.as_secs()))
            }
        }
    }
}

impl UploadApi for BrowserUploadApi {
    type File = File;

    async fn preview(&self, file: &SelectedFile<File>) -> TransportResult<Vec<PreviewRow>> {
        let form_data = FormData::new()
            .map_err(|e| TransportError::Network(format!("Failed to create FormData: {:?}", e)))?;
        form_data
            .append_with_blob_and_filename(FILE_FIELD, &file.payload, file.name())
            .map_err(|e| TransportError::Network(format!("Failed to append file: {:?}", e)))?;

        let controller = AbortController::new().ok();
        let signal = controller.as_ref().map(AbortController::signal);
        let request = Request::post(&self.config.preview_url())
            .abort_signal(signal.as_ref())
            .body(form_data)
            .map_err(|e| TransportError::Network(format!("Failed to build request: {}", e)))?;

        let (code, body) = self.send(request, controller).await?;
        api::read_preview(code, &body)
    }

    async fn save(&self, rows: &[PreviewRow]) -> TransportResult<UploadOutcome> {
        let controller = AbortController::new().ok();
        let signal = controller.as_ref().map(AbortController::signal);
        let request = Request::post(&self.config.save_url())
            .abort_signal(signal.as_ref())
            .json(&SaveRequest { devices: rows })
            .map_err(|e| TransportError::Network(format!("Failed to build request: {}", e)))?;

        let (code, body) = self.send(request, controller).await?;
        api::read_save(code, &body)
    }
}

/// Number of devices the backend currently stores.
pub async fn fetch_device_count(config: &UploadConfig) -> Result<usize, String> {
    let response = Request::get(&config.devices_url())
        .send()
        .await
        .map_err(|e| format!("HTTP request failed: {}", e))?;

    if !response.ok() {
        return Err(format!("Server error ({})", response.status()));
    }

    let body = response.text().await.map_err(|e| format!("Failed to read response: {}", e))?;
    count_devices(&body).ok_or_else(|| "Unexpected device list".to_string())
}

/// Device count from a `[...]` or `{"count": n, "devices": [...]}` body.
fn count_devices(body: &str) -> Option<usize> {
    match serde_json::from_str::<Value>(body).ok()? {
        Value::Array(devices) => Some(devices.len()),
        Value::Object(map) => map
            .get("count")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .or_else(|| map.get("devices")?.as_array().map(Vec::len)),
        _ => None,
    }
}
