//! Common types used across the frontend application.
//!
//! Upload domain types (rows, outcomes, errors) live in `hems_upload`;
//! this module only holds view-side types.
//!
//! # Categories
//!
//! - **Log Types** - Activity log shown under the upload box
//! - **Theme** - Light/dark appearance

use serde::{Deserialize, Serialize};

use crate::MAX_LOG_ENTRIES;

// =============================================================================
// Log Types
// =============================================================================

/// Log severity level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LogLevel {
    /// Informational message
    Info,
    /// Success/completion message
    Success,
    /// Error message
    Error,
    /// Warning message
    Warning,
}

impl LogLevel {
    /// Get CSS class for styling.
    pub fn css_class(&self) -> &'static str {
        match self {
            LogLevel::Info => "log-info",
            LogLevel::Success => "log-success",
            LogLevel::Error => "log-error",
            LogLevel::Warning => "log-warning",
        }
    }
}

/// A single activity log entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Severity level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Timestamp string (HH:MM:SS)
    pub timestamp: String,
}

impl LogEntry {
    /// Entry stamped with the local time.
    pub fn now(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
        }
    }
}

/// Append an entry, dropping the oldest beyond [`MAX_LOG_ENTRIES`].
pub fn push_log(logs: &mut Vec<LogEntry>, entry: LogEntry) {
    logs.push(entry);
    if logs.len() > MAX_LOG_ENTRIES {
        let excess = logs.len() - MAX_LOG_ENTRIES;
        logs.drain(..excess);
    }
}

// =============================================================================
// Theme
// =============================================================================

/// Page appearance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Theme::Light => "theme-light",
            Theme::Dark => "theme-dark",
        }
    }
}
