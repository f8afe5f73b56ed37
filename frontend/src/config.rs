//! Application configuration.
//!
//! Centralized configuration for the HEMS upload view.
//! In development, these are hardcoded. In production, they could be
//! injected at build time.

use std::time::Duration;

use hems_upload::UploadConfig;

/// Backend API base URL.
///
/// The HEMS backend serving `/api/smart-upload/*` and `/api/devices/`.
pub const API_BASE_URL: &str = "http://localhost:8000";

/// Application name, shown in the page title.
pub const APP_NAME: &str = "HEMS Smart Upload";

/// Maximum file size for upload (in bytes).
///
/// 10 MB limit.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Preview/save timeout in milliseconds.
pub const REQUEST_TIMEOUT_MS: u32 = 30_000;

/// Maximum logs to keep in memory.
pub const MAX_LOG_ENTRIES: usize = 100;

/// Workflow configuration for this build.
pub fn upload_config() -> UploadConfig {
    UploadConfig::new(API_BASE_URL)
        .with_max_file_size(MAX_FILE_SIZE)
        .with_timeout(Duration::from_millis(u64::from(REQUEST_TIMEOUT_MS)))
}
