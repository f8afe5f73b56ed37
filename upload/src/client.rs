//! Native HTTP transport (reqwest).

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde_json::Value;

use crate::api::{self, SaveRequest, UploadApi, FILE_FIELD};
use crate::config::UploadConfig;
use crate::error::{TransportError, TransportResult};
use crate::models::{PreviewRow, UploadOutcome};
use crate::workflow::SelectedFile;

/// Talks to the preview/save endpoints over HTTP.
#[derive(Debug, Clone)]
pub struct HttpUploadApi {
    client: reqwest::Client,
    config: UploadConfig,
}

impl HttpUploadApi {
    /// Build a client whose every request is bounded by the configured timeout.
    pub fn new(config: UploadConfig) -> TransportResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Fetch the stored device list (used to refresh after a save).
    pub async fn list_devices(&self) -> TransportResult<Vec<Value>> {
        let response = self
            .client
            .get(self.config.devices_url())
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.request_timeout))?;
        let (code, body) = read_response(response, self.config.request_timeout).await?;
        api::check_status(code, &body)?;

        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Array(devices)) => Ok(devices),
            Ok(Value::Object(mut map)) => match map.remove("devices") {
                Some(Value::Array(devices)) => Ok(devices),
                _ => Err(TransportError::Body("missing 'devices' list".to_string())),
            },
            _ => Err(TransportError::Body(format!("not a device list: {}", crate::error::excerpt(&body)))),
        }
    }
}

impl UploadApi for HttpUploadApi {
    type File = Vec<u8>;

    async fn preview(&self, file: &SelectedFile<Vec<u8>>) -> TransportResult<Vec<PreviewRow>> {
        tracing::debug!("POST {} ({} bytes)", self.config.preview_url(), file.size());

        let part = Part::bytes(file.payload.clone()).file_name(file.name().to_string());
        let form = Form::new().part(FILE_FIELD, part);

        let response = self
            .client
            .post(self.config.preview_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.request_timeout))?;

        let (code, body) = read_response(response, self.config.request_timeout).await?;
        api::read_preview(code, &body)
    }

    async fn save(&self, rows: &[PreviewRow]) -> TransportResult<UploadOutcome> {
        tracing::debug!("POST {} ({} rows)", self.config.save_url(), rows.len());

        let response = self
            .client
            .post(self.config.save_url())
            .json(&SaveRequest { devices: rows })
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.request_timeout))?;

        let (code, body) = read_response(response, self.config.request_timeout).await?;
        api::read_save(code, &body)
    }
}

async fn read_response(response: reqwest::Response, timeout: Duration) -> TransportResult<(u16, String)> {
    let code = response.status().as_u16();
    let body = response.text().await.map_err(|e| transport_error(e, timeout))?;
    Ok((code, body))
}

fn transport_error(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout.as_secs())
    } else {
        TransportError::Network(err.to_string())
    }
}
