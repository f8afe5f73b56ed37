//! Upload configuration.
//!
//! Defaults match the HEMS backend's development setup. The CLI loads
//! overrides from the environment (after `.env`) and then from flags.

use std::time::Duration;

/// Backend base URL used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Preview (parse without persisting) endpoint.
pub const PREVIEW_PATH: &str = "/api/smart-upload/preview/";

/// Save (persist edited rows) endpoint.
pub const SAVE_PATH: &str = "/api/smart-upload/save/";

/// Device list endpoint, used to refresh after a save.
pub const DEVICES_PATH: &str = "/api/devices/";

/// Maximum upload size: 10 MiB.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Preview/save timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Spreadsheet extensions accepted by every upload variant.
pub const SPREADSHEET_EXTENSIONS: [&str; 3] = ["csv", "xlsx", "xls"];

/// Environment variable overriding the backend URL.
pub const ENV_API_URL: &str = "HEMS_API_URL";

/// Environment variable overriding the timeout (seconds).
pub const ENV_TIMEOUT: &str = "HEMS_UPLOAD_TIMEOUT_SECS";

/// Environment variable overriding the size limit (bytes).
pub const ENV_MAX_BYTES: &str = "HEMS_UPLOAD_MAX_BYTES";

/// Where to upload and what to accept.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadConfig {
    pub base_url: String,
    pub preview_path: String,
    pub save_path: String,
    /// Lower-case extensions without the dot.
    pub allowed_extensions: Vec<String>,
    pub max_file_size: u64,
    pub request_timeout: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl UploadConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            preview_path: PREVIEW_PATH.to_string(),
            save_path: SAVE_PATH.to_string(),
            allowed_extensions: SPREADSHEET_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            max_file_size: MAX_FILE_SIZE,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Also accept `.json` device lists.
    pub fn with_json(mut self) -> Self {
        if !self.allowed_extensions.iter().any(|e| e == "json") {
            self.allowed_extensions.push("json".to_string());
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Defaults overridden by `HEMS_*` environment variables.
    ///
    /// Unparseable numeric values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = match std::env::var(ENV_API_URL) {
            Ok(url) if !url.trim().is_empty() => Self::new(url.trim()),
            _ => Self::default(),
        };

        if let Some(secs) = env_number(ENV_TIMEOUT) {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(bytes) = env_number(ENV_MAX_BYTES) {
            config.max_file_size = bytes;
        }
        config
    }

    pub fn preview_url(&self) -> String {
        format!("{}{}", self.base_url, self.preview_path)
    }

    pub fn save_url(&self) -> String {
        format!("{}{}", self.base_url, self.save_path)
    }

    pub fn devices_url(&self) -> String {
        format!("{}{}", self.base_url, DEVICES_PATH)
    }

    /// Whether `extension` (any case, without the dot) is accepted.
    pub fn allows(&self, extension: &str) -> bool {
        let extension = extension.to_lowercase();
        self.allowed_extensions.iter().any(|e| *e == extension)
    }

    /// Size limit in whole MiB, for messages.
    pub fn max_file_size_mib(&self) -> u64 {
        self.max_file_size / (1024 * 1024)
    }

    /// Accept attribute for file inputs, e.g. `.csv,.xlsx,.xls`.
    pub fn accept_attribute(&self) -> String {
        self.allowed_extensions
            .iter()
            .map(|e| format!(".{}", e))
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn env_number(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("ignoring {}={:?}: not a whole number", key, raw);
            None
        }
    }
}
