//! UI Components for the HEMS smart upload page.
//!
//! # Layout Components
//! - [`Header`] - Navigation bar with device count and theme toggle
//! - [`Hero`] - Main title and description
//! - [`Footer`] - Page footer
//!
//! # Feature Components
//! - [`SmartUpload`] - File picker with drag & drop, owns the upload workflow
//! - [`PreviewTable`] - Editable rows before saving
//! - [`OutcomePanel`] - Save result with warnings and row issues
//! - [`LogsPanel`] - Activity log

mod header;
mod hero;
mod upload;
mod preview;
mod outcome;
mod footer;
mod logs;

pub use header::*;
pub use hero::*;
pub use upload::*;
pub use preview::*;
pub use outcome::*;
pub use footer::*;
pub use logs::*;
