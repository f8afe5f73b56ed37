//! Local checks: file acceptance and row hints.
//!
//! # File validation
//!
//! [`validate_file`] is pure and synchronous. A file is accepted iff the
//! case-insensitive suffix after its last `.` is in the configured
//! allow-list and its size does not exceed the configured maximum.
//!
//! # Row hints
//!
//! [`check_row`] flags values that the backend is likely to reject or that
//! look suspicious. Hints are advisory for the preview editor; the
//! development backend uses the [`Severity::Error`] ones to skip rows.

use crate::config::UploadConfig;
use crate::error::{ValidationError, ValidationResult};
use crate::models::{DeviceType, PreviewRow, RowField};
use crate::workflow::edit::{MAX_HOURS_PER_DAY, TON_STEP};

/// Metadata of a file that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    /// Lower-case, without the dot.
    pub extension: String,
}

/// Lower-case suffix after the last `.`, if any.
pub fn extension_of(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    let ext = ext.trim();
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_lowercase())
    }
}

/// Accept or reject a candidate file.
pub fn validate_file(name: &str, size: u64, config: &UploadConfig) -> ValidationResult<FileInfo> {
    let extension = extension_of(name).ok_or_else(|| ValidationError::MissingExtension(name.to_string()))?;

    if !config.allows(&extension) {
        return Err(ValidationError::UnsupportedExtension {
            extension,
            allowed: config.accept_attribute(),
        });
    }

    if size > config.max_file_size {
        return Err(ValidationError::TooLarge {
            size,
            limit_mib: config.max_file_size_mib(),
        });
    }

    Ok(FileInfo {
        name: name.to_string(),
        size,
        extension,
    })
}

// =============================================================================
// Row hints
// =============================================================================

/// How serious a row hint is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The backend will refuse the row.
    Error,
    /// Saved, but probably wrong.
    Warning,
}

/// One hint about one field of a row.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldIssue {
    pub field: RowField,
    pub severity: Severity,
    pub message: String,
}

impl FieldIssue {
    fn error(field: RowField, message: impl Into<String>) -> Self {
        Self { field, severity: Severity::Error, message: message.into() }
    }

    fn warning(field: RowField, message: impl Into<String>) -> Self {
        Self { field, severity: Severity::Warning, message: message.into() }
    }
}

/// Hints for one row.
pub fn check_row(row: &PreviewRow) -> Vec<FieldIssue> {
    let mut issues = Vec::new();

    if row.building.trim().is_empty() {
        issues.push(FieldIssue::error(RowField::Building, "Building is required"));
    }
    if row.room.trim().is_empty() {
        issues.push(FieldIssue::error(RowField::Room, "Room is required"));
    }
    if let DeviceType::Custom(label) = &row.device_type {
        issues.push(FieldIssue::warning(
            RowField::DeviceType,
            format!("Unknown device type '{}'", label),
        ));
    }

    if row.watt_rating < 0.0 {
        issues.push(FieldIssue::error(RowField::WattRating, "Rated power cannot be negative"));
    } else if row.watt_rating == 0.0 {
        issues.push(FieldIssue::warning(RowField::WattRating, "Rated power is missing"));
    }

    if row.quantity < 1.0 {
        issues.push(FieldIssue::error(RowField::Quantity, "Quantity must be at least 1"));
    } else if row.quantity.fract() != 0.0 {
        issues.push(FieldIssue::error(RowField::Quantity, "Quantity must be a whole number"));
    }

    if let Some(stars) = row.star_rating {
        if !(1.0..=5.0).contains(&stars) || stars.fract() != 0.0 {
            issues.push(FieldIssue::error(RowField::StarRating, "Star rating must be 1 to 5"));
        }
    }

    if let Some(ton) = row.ton {
        if ton < TON_STEP || (ton / TON_STEP).fract() != 0.0 {
            issues.push(FieldIssue::error(RowField::Ton, "Tonnage must be a multiple of 0.5"));
        } else if !row.device_type.has_tonnage() {
            issues.push(FieldIssue::warning(RowField::Ton, "Tonnage only applies to AC units"));
        }
    }

    if let Some(hours) = row.hours_used_per_day {
        if !(0.0..=MAX_HOURS_PER_DAY).contains(&hours) {
            issues.push(FieldIssue::error(
                RowField::HoursUsedPerDay,
                "Daily usage must be between 0 and 24 hours",
            ));
        }
    }

    issues
}

/// Whether a row has no blocking hint.
pub fn is_row_acceptable(row: &PreviewRow) -> bool {
    check_row(row).iter().all(|i| i.severity != Severity::Error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_spreadsheets_case_insensitively() {
        let config = UploadConfig::default();
        let info = validate_file("Devices.XLSX", 2 * 1024 * 1024, &config).unwrap();
        assert_eq!(info.extension, "xlsx");
        assert!(validate_file("inventory.2024.csv", 10, &config).is_ok());
        assert!(validate_file("old.xls", 0, &config).is_ok());
    }

    #[test]
    fn test_rejects_outside_allow_list() {
        let config = UploadConfig::default();
        for name in ["devices.pdf", "devices.json", "devices.csv.exe", "devices.txt"] {
            let err = validate_file(name, 100, &config).unwrap_err();
            assert!(matches!(err, ValidationError::UnsupportedExtension { .. }), "{name}");
        }
        assert_eq!(
            validate_file("devices", 100, &config),
            Err(ValidationError::MissingExtension("devices".into()))
        );
        assert!(validate_file("devices.", 100, &config).is_err());
    }

    #[test]
    fn test_json_variant() {
        let config = UploadConfig::default().with_json();
        assert!(validate_file("devices.json", 100, &config).is_ok());
    }

    #[test]
    fn test_size_limit_is_inclusive() {
        let config = UploadConfig::default();
        assert!(validate_file("a.csv", MAX, &config).is_ok());
        let err = validate_file("a.csv", MAX + 1, &config).unwrap_err();
        assert_eq!(err, ValidationError::TooLarge { size: MAX + 1, limit_mib: 10 });
        assert!(err.to_string().contains("10MB"));
    }

    const MAX: u64 = crate::config::MAX_FILE_SIZE;

    #[test]
    fn test_row_hints() {
        let row = PreviewRow {
            building: " ".into(),
            room: "101".into(),
            device_type: DeviceType::Fan,
            watt_rating: 60.0,
            ton: Some(1.0),
            hours_used_per_day: Some(25.0),
            ..PreviewRow::default()
        };
        let issues = check_row(&row);
        let fields: Vec<RowField> = issues.iter().map(|i| i.field).collect();
        assert_eq!(fields, vec![RowField::Building, RowField::Ton, RowField::HoursUsedPerDay]);
        assert_eq!(issues[1].severity, Severity::Warning);
        assert!(!is_row_acceptable(&row));
    }

    #[test]
    fn test_clean_row_has_no_hints() {
        let row = PreviewRow {
            building: "A".into(),
            room: "101".into(),
            device_type: DeviceType::Ac,
            watt_rating: 1500.0,
            ton: Some(1.5),
            quantity: 2.0,
            star_rating: Some(3.0),
            hours_used_per_day: Some(8.0),
            ..PreviewRow::default()
        };
        assert!(check_row(&row).is_empty());
        assert!(is_row_acceptable(&row));
    }

    #[test]
    fn test_server_values_out_of_range_are_flagged() {
        let row: PreviewRow = serde_json::from_value(serde_json::json!({
            "building": "A",
            "room": "101",
            "device_type": "FAN",
            "watt_rating": 60,
            "quantity": 0,
            "star_rating": 7
        }))
        .unwrap();

        let fields: Vec<RowField> = check_row(&row).iter().map(|i| i.field).collect();
        assert_eq!(fields, vec![RowField::Quantity, RowField::StarRating]);

        let fractional = PreviewRow { quantity: 2.6, ..row.clone() };
        assert!(check_row(&fractional)
            .iter()
            .any(|i| i.field == RowField::Quantity && i.message.contains("whole")));
    }
}
