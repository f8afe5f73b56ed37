//! Backend services.
//!
//! # Services
//!
//! - [`upload`] - Preview/save transport and device count for the HEMS backend

pub mod upload;

pub use upload::*;
