//! # HEMS Upload - smart device-spreadsheet upload
//!
//! Drives the upload of a device inventory (CSV/Excel) to the HEMS backend:
//! local file validation, a server-side preview, inline corrections of the
//! previewed rows, and a batch save with partial-failure reporting.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ File (≤10M) │────▶│  Validate   │────▶│   Preview   │────▶│  Edit rows  │
//! │ csv/xlsx/xls│     │  (local)    │     │  (POST)     │     │  (inline)   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                    │
//!                      ┌─────────────┐     ┌─────────────┐           │
//!                      │  Refresh    │◀────│    Save     │◀──────────┘
//!                      │  callback   │     │  (POST)     │
//!                      └─────────────┘     └─────────────┘
//! ```
//!
//! The state machine in [`workflow`] has no I/O and compiles to
//! WebAssembly; transports implement [`api::UploadApi`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hems_upload::{HttpUploadApi, UploadConfig, UploadController, RowField};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = UploadConfig::from_env();
//!     let api = HttpUploadApi::new(config.clone()).unwrap();
//!     let mut upload = UploadController::new(api, config);
//!
//!     upload.select_path("devices.csv".as_ref()).await.unwrap();
//!     upload.preview().await;
//!     upload.edit(0, RowField::HoursUsedPerDay, "8");
//!     upload.save().await;
//!     println!("{}", upload.workflow().outcome().unwrap().summary());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Validation, transport and backend error types
//! - [`models`] - Preview rows, device types, save outcomes
//! - [`config`] - Endpoints, limits, environment overrides
//! - [`validation`] - File acceptance and row hints
//! - [`workflow`] - The upload state machine and inline edits
//! - [`api`] - Transport trait and response normalization
//! - `client` - reqwest transport (feature `client`)
//! - `controller` - Drives a workflow over a transport (feature `client`)
//! - `parser` - CSV/JSON ingestion (feature `server`)
//! - `server` - Development backend (feature `server`)

// Core modules
pub mod error;
pub mod models;
pub mod config;

// Workflow
pub mod validation;
pub mod workflow;

// Transport seam
pub mod api;

// Native transport
#[cfg(feature = "client")]
pub mod client;
#[cfg(feature = "client")]
pub mod controller;

// Development backend
#[cfg(feature = "server")]
pub mod parser;
#[cfg(feature = "server")]
pub mod server;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ParseError,
    ServerError,
    Step,
    TransportError,
    TransportResult,
    ValidationError,
    ValidationResult,
    WorkflowError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    group_issues,
    DeviceType,
    PreviewRow,
    RowField,
    RowIssue,
    UploadOutcome,
};

// =============================================================================
// Re-exports - Configuration & validation
// =============================================================================

pub use config::UploadConfig;
pub use validation::{check_row, validate_file, FieldIssue, FileInfo, Severity};

// =============================================================================
// Re-exports - Workflow
// =============================================================================

pub use workflow::{
    apply_edit,
    FieldEdit,
    SelectedFile,
    Ticket,
    TicketId,
    Workflow,
    WorkflowState,
};

// =============================================================================
// Re-exports - Transport
// =============================================================================

pub use api::{parse_preview_body, parse_save_body, SaveRequest, UploadApi};

#[cfg(feature = "client")]
pub use client::HttpUploadApi;
#[cfg(feature = "client")]
pub use controller::UploadController;
