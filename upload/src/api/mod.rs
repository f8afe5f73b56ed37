//! The preview/save API seam.
//!
//! [`UploadApi`] is implemented by the native reqwest client and by the
//! browser service; both hand raw status/body pairs to the normalizers in
//! this module so every transport accepts exactly the same response shapes.

mod types;

pub use types::{parse_preview_body, parse_save_body, SaveRequest};

use crate::error::{TransportError, TransportResult};
use crate::models::{PreviewRow, UploadOutcome};
use crate::workflow::SelectedFile;

/// Multipart field carrying the uploaded file.
pub const FILE_FIELD: &str = "file";

/// The two backend calls the workflow needs.
#[allow(async_fn_in_trait)]
pub trait UploadApi {
    /// File payload this transport can send.
    type File: Clone;

    /// POST the file as multipart field `file` and return the parsed rows.
    async fn preview(&self, file: &SelectedFile<Self::File>) -> TransportResult<Vec<PreviewRow>>;

    /// POST `{"devices": rows}` and return what was stored.
    async fn save(&self, rows: &[PreviewRow]) -> TransportResult<UploadOutcome>;
}

/// Fail on any non-2xx status, keeping an excerpt of the body.
pub fn check_status(code: u16, body: &str) -> TransportResult<()> {
    if (200..300).contains(&code) {
        Ok(())
    } else {
        Err(TransportError::status(code, body))
    }
}

/// Status check followed by preview normalization.
pub fn read_preview(code: u16, body: &str) -> TransportResult<Vec<PreviewRow>> {
    check_status(code, body)?;
    parse_preview_body(body)
}

/// Status check followed by save normalization.
pub fn read_save(code: u16, body: &str) -> TransportResult<UploadOutcome> {
    check_status(code, body)?;
    parse_save_body(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_2xx_is_status_error_even_with_valid_body() {
        let err = read_preview(500, r#"{"devices": []}"#).unwrap_err();
        assert!(matches!(err, TransportError::Status { code: 500, .. }));

        let err = read_save(404, "<html>Not Found</html>").unwrap_err();
        assert_eq!(err.to_string(), "HTTP 404: <html>Not Found</html>");
    }

    #[test]
    fn test_2xx_is_normalized() {
        let rows = read_preview(200, r#"{"success": true, "devices": [{"building": "A"}]}"#).unwrap();
        assert_eq!(rows.len(), 1);
        let outcome = read_save(201, r#"{"saved_count": 2}"#).unwrap();
        assert_eq!(outcome.saved_count, 2);
    }
}
