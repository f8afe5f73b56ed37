//! Error types for the upload workflow.
//!
//! The workflow distinguishes three families of problems:
//!
//! - [`ValidationError`] - local file checks, raised before any network call
//! - [`TransportError`] - preview/save calls that did not produce a usable answer
//! - [`ParseError`] / [`ServerError`] - the development backend's own failures
//!
//! [`WorkflowError`] wraps the first two and is what the workflow exposes to
//! views, so a rejected file and a failed request land on the same banner.
//! Partial failures (rows skipped by an otherwise successful save) are not
//! errors; they live in [`crate::models::UploadOutcome`].

use thiserror::Error;

use crate::models::RowIssue;

/// Number of response-body characters kept in status errors.
pub const EXCERPT_LEN: usize = 100;

// =============================================================================
// Validation Errors
// =============================================================================

/// Local file validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Extension outside the allow-list.
    #[error("Invalid file format '.{extension}'. Please upload one of: {allowed}")]
    UnsupportedExtension { extension: String, allowed: String },

    /// File name has no extension at all.
    #[error("File '{0}' has no extension. Please upload a CSV or Excel file.")]
    MissingExtension(String),

    /// File is bigger than the configured maximum.
    #[error("File size exceeds {limit_mib}MB limit ({size} bytes).")]
    TooLarge { size: u64, limit_mib: u64 },
}

// =============================================================================
// Transport Errors
// =============================================================================

/// Preview/save call failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// The request never got an HTTP answer.
    #[error("Network error: {0}")]
    Network(String),

    /// No answer within the configured timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Non-2xx answer.
    #[error("HTTP {code}: {excerpt}")]
    Status { code: u16, excerpt: String },

    /// 2xx answer whose body is not one of the accepted shapes.
    #[error("Unexpected response: {0}")]
    Body(String),

    /// 2xx answer in which the server declared the operation failed.
    #[error("{message}")]
    Rejected { message: String, issues: Vec<RowIssue> },
}

impl TransportError {
    /// Build a status error from a raw body, keeping only a short excerpt.
    pub fn status(code: u16, body: &str) -> Self {
        TransportError::Status {
            code,
            excerpt: excerpt(body),
        }
    }

    /// Per-row issues attached to a server rejection.
    pub fn issues(&self) -> &[RowIssue] {
        match self {
            TransportError::Rejected { issues, .. } => issues,
            _ => &[],
        }
    }
}

/// First [`EXCERPT_LEN`] characters of a response body.
pub fn excerpt(body: &str) -> String {
    body.trim().chars().take(EXCERPT_LEN).collect()
}

// =============================================================================
// Workflow Errors (surface shown to the user)
// =============================================================================

/// Which network step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Preview,
    Save,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Preview => write!(f, "preview file"),
            Step::Save => write!(f, "save devices"),
        }
    }
}

/// The single error surface of the workflow.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkflowError {
    /// File rejected before upload.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Preview or save failed.
    #[error("Failed to {step}: {source}")]
    Transport {
        step: Step,
        #[source]
        source: TransportError,
    },
}

impl WorkflowError {
    pub fn preview(source: TransportError) -> Self {
        WorkflowError::Transport {
            step: Step::Preview,
            source,
        }
    }

    pub fn save(source: TransportError) -> Self {
        WorkflowError::Transport {
            step: Step::Save,
            source,
        }
    }

    /// Whether this came from a timed-out request.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            WorkflowError::Transport {
                source: TransportError::Timeout(_),
                ..
            }
        )
    }

    /// Per-row issues to itemize under the banner.
    pub fn issues(&self) -> &[RowIssue] {
        match self {
            WorkflowError::Transport { source, .. } => source.issues(),
            WorkflowError::Validation(_) => &[],
        }
    }
}

// =============================================================================
// Ingestion Errors (development backend)
// =============================================================================

/// Spreadsheet ingestion failures.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The file is empty.
    #[error("File is empty")]
    EmptyFile,

    /// Header row missing or unusable.
    #[error("No headers found")]
    NoHeaders,

    /// None of the headers maps to a device field.
    #[error("No recognizable device columns in headers: {0}")]
    NoKnownColumns(String),

    /// Binary spreadsheet formats are not parsed locally.
    #[error("Unsupported format '.{0}': export the sheet as CSV")]
    UnsupportedFormat(String),

    /// Malformed CSV.
    #[error("Invalid CSV at line {line}: {message}")]
    Csv { line: u64, message: String },

    /// Malformed JSON.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Development backend errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Ingestion error.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// IO error while binding or serving.
    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for file validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type for preview/save calls.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for ingestion.
pub type ParseResult<T> = Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_keeps_short_excerpt() {
        let body = "x".repeat(500);
        let err = TransportError::status(502, &body);
        match &err {
            TransportError::Status { code, excerpt } => {
                assert_eq!(*code, 502);
                assert_eq!(excerpt.len(), EXCERPT_LEN);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(err.to_string().starts_with("HTTP 502: "));
    }

    #[test]
    fn test_workflow_error_messages() {
        let err = WorkflowError::preview(TransportError::status(500, "boom"));
        assert_eq!(err.to_string(), "Failed to preview file: HTTP 500: boom");

        let err = WorkflowError::save(TransportError::Timeout(30));
        assert!(err.to_string().contains("timed out"));
        assert!(err.is_timeout());
    }

    #[test]
    fn test_validation_converts_into_workflow_error() {
        let err: WorkflowError = ValidationError::TooLarge {
            size: 11 * 1024 * 1024,
            limit_mib: 10,
        }
        .into();
        assert!(err.to_string().contains("10MB"));
        assert!(err.issues().is_empty());
    }
}
