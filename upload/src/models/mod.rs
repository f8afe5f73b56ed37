//! Domain models for the smart upload workflow.
//!
//! - [`DeviceType`] - Device category (AC, FAN, LIGHT, ...)
//! - [`PreviewRow`] - One candidate device row returned by the preview step
//! - [`RowField`] - Addressable, user-editable fields of a row
//! - [`UploadOutcome`] - Result of a save call, including partial failures
//! - [`RowIssue`] - One row/field problem reported by the server

pub mod lenient;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Device Type
// =============================================================================

/// Category of a device.
///
/// Labels the server sends that do not match a known category are kept
/// verbatim in [`DeviceType::Custom`] so they survive the round trip to save.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum DeviceType {
    /// Air conditioner
    Ac,
    /// Ceiling/table fan
    Fan,
    /// Lighting
    Light,
    /// Computer
    Pc,
    /// Air cooler
    Cooler,
    /// Anything else
    #[default]
    Other,
    /// Unrecognized server label
    Custom(String),
}

impl DeviceType {
    /// Categories offered in the preview editor.
    pub const ALL: [DeviceType; 6] = [
        DeviceType::Ac,
        DeviceType::Fan,
        DeviceType::Light,
        DeviceType::Pc,
        DeviceType::Cooler,
        DeviceType::Other,
    ];

    /// Parse a label, accepting common spreadsheet spellings.
    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().to_uppercase();
        match normalized.as_str() {
            "AC" | "A/C" | "AIR CONDITIONER" | "AIR_CONDITIONER" | "SPLIT AC" => Self::Ac,
            "FAN" | "CEILING FAN" | "TABLE FAN" | "EXHAUST FAN" => Self::Fan,
            "LIGHT" | "LIGHTS" | "LAMP" | "TUBELIGHT" | "TUBE LIGHT" | "LED" | "BULB" => Self::Light,
            "PC" | "COMPUTER" | "DESKTOP" | "LAPTOP" => Self::Pc,
            "COOLER" | "AIR COOLER" | "AIR_COOLER" => Self::Cooler,
            "OTHER" | "" => Self::Other,
            _ => Self::Custom(label.trim().to_string()),
        }
    }

    /// Wire label.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ac => "AC",
            Self::Fan => "FAN",
            Self::Light => "LIGHT",
            Self::Pc => "PC",
            Self::Cooler => "COOLER",
            Self::Other => "OTHER",
            Self::Custom(label) => label,
        }
    }

    /// Whether tonnage is meaningful for this category.
    pub fn has_tonnage(&self) -> bool {
        matches!(self, Self::Ac)
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_label(s))
    }
}

impl Serialize for DeviceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DeviceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = lenient::string(deserializer)?;
        Ok(Self::from_label(&label))
    }
}

// =============================================================================
// Preview Row
// =============================================================================

fn default_quantity() -> f64 {
    1.0
}

/// One spreadsheet row mapped to device fields by the preview step.
///
/// Numbers are accepted as JSON numbers or numeric strings and kept as
/// sent, even out of range; [`crate::validation::check_row`] reports those.
/// Fields the server sends beyond the known ones are kept in `extra` and
/// sent back unchanged on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewRow {
    #[serde(default, deserialize_with = "lenient::string")]
    pub building: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub room: String,
    #[serde(default)]
    pub device_type: DeviceType,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub watt_rating: f64,
    #[serde(default, deserialize_with = "lenient::opt_number", serialize_with = "lenient::opt_whole")]
    pub star_rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub ton: Option<f64>,
    #[serde(default = "default_quantity", deserialize_with = "lenient::quantity", serialize_with = "lenient::whole")]
    pub quantity: f64,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub hours_used_per_day: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for PreviewRow {
    fn default() -> Self {
        Self {
            building: String::new(),
            room: String::new(),
            device_type: DeviceType::Other,
            brand: None,
            watt_rating: 0.0,
            star_rating: None,
            ton: None,
            quantity: 1.0,
            hours_used_per_day: None,
            extra: Map::new(),
        }
    }
}

impl PreviewRow {
    /// Text shown in the editor cell for `field`. Missing values render empty.
    pub fn display_value(&self, field: RowField) -> String {
        match field {
            RowField::Building => self.building.clone(),
            RowField::Room => self.room.clone(),
            RowField::DeviceType => self.device_type.to_string(),
            RowField::Brand => self.brand.clone().unwrap_or_default(),
            RowField::WattRating => format_number(self.watt_rating),
            RowField::StarRating => self.star_rating.map(format_number).unwrap_or_default(),
            RowField::Ton => self.ton.map(format_number).unwrap_or_default(),
            RowField::Quantity => format_number(self.quantity),
            RowField::HoursUsedPerDay => self.hours_used_per_day.map(format_number).unwrap_or_default(),
        }
    }

    /// Rated power of the whole row in watts.
    pub fn total_watts(&self) -> f64 {
        self.watt_rating * self.quantity
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

// =============================================================================
// Row Fields
// =============================================================================

/// Editable field of a [`PreviewRow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RowField {
    Building,
    Room,
    DeviceType,
    Brand,
    WattRating,
    StarRating,
    Ton,
    Quantity,
    HoursUsedPerDay,
}

impl RowField {
    /// Columns in preview-table order.
    pub const ALL: [RowField; 9] = [
        RowField::Building,
        RowField::Room,
        RowField::DeviceType,
        RowField::Brand,
        RowField::WattRating,
        RowField::StarRating,
        RowField::Ton,
        RowField::Quantity,
        RowField::HoursUsedPerDay,
    ];

    /// Wire key of the field.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Building => "building",
            Self::Room => "room",
            Self::DeviceType => "device_type",
            Self::Brand => "brand",
            Self::WattRating => "watt_rating",
            Self::StarRating => "star_rating",
            Self::Ton => "ton",
            Self::Quantity => "quantity",
            Self::HoursUsedPerDay => "hours_used_per_day",
        }
    }

    /// Column header.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Building => "Building",
            Self::Room => "Room",
            Self::DeviceType => "Device Type",
            Self::Brand => "Brand",
            Self::WattRating => "Rated Power (W)",
            Self::StarRating => "Star Rating",
            Self::Ton => "Ton (AC)",
            Self::Quantity => "Quantity",
            Self::HoursUsedPerDay => "Daily Usage (Hr)",
        }
    }

    /// Whether the editor uses a numeric input.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::WattRating | Self::StarRating | Self::Ton | Self::Quantity | Self::HoursUsedPerDay
        )
    }
}

impl fmt::Display for RowField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for RowField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|f| f.key() == key)
            .ok_or_else(|| format!("unknown device field '{}'", s))
    }
}

// =============================================================================
// Save Outcome
// =============================================================================

/// One problem the server reported about a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowIssue {
    /// Row label as the server names it ("Row 3", "3", ...).
    pub row: String,
    /// Offending field, when the server names one.
    pub field: Option<String>,
    pub message: String,
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}: {}: {}", self.row, field, self.message),
            None => write!(f, "{}: {}", self.row, self.message),
        }
    }
}

/// Result of a save call.
///
/// A successful save can still carry warnings, errors, duplicates and
/// per-row issues; they are reported together with the saved count.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub success: bool,
    pub saved_count: usize,
    pub skipped_count: usize,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub duplicates: Vec<String>,
    pub issues: Vec<RowIssue>,
}

impl UploadOutcome {
    /// "1 device saved" / "3 devices saved".
    pub fn summary(&self) -> String {
        let noun = if self.saved_count == 1 { "device" } else { "devices" };
        format!("{} {} saved", self.saved_count, noun)
    }

    /// Whether anything beyond the saved count needs the user's attention.
    pub fn has_problems(&self) -> bool {
        self.problem_count() > 0
    }

    pub fn problem_count(&self) -> usize {
        self.warnings.len() + self.errors.len() + self.duplicates.len() + self.issues.len()
    }

    /// Per-row issues grouped by row, then by field.
    pub fn grouped_issues(&self) -> Vec<RowIssues<'_>> {
        group_issues(&self.issues)
    }
}

/// The issues of one row: its label and the messages per field.
pub type RowIssues<'a> = (&'a str, BTreeMap<&'a str, Vec<&'a str>>);

/// Group issues by row, then by field (`"general"` when none is named).
///
/// Rows come out in row-number order ("Row 2" before "Row 10"); labels
/// without a number follow, alphabetically.
pub fn group_issues(issues: &[RowIssue]) -> Vec<RowIssues<'_>> {
    let mut grouped: BTreeMap<(u64, &str), BTreeMap<&str, Vec<&str>>> = BTreeMap::new();
    for issue in issues {
        let row = issue.row.as_str();
        grouped
            .entry((row_number(row).unwrap_or(u64::MAX), row))
            .or_default()
            .entry(issue.field.as_deref().unwrap_or("general"))
            .or_default()
            .push(issue.message.as_str());
    }
    grouped.into_iter().map(|((_, row), fields)| (row, fields)).collect()
}

/// First run of digits in a row label: `"Row 12"` -> 12.
fn row_number(label: &str) -> Option<u64> {
    let digits: String = label
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_device_type_aliases() {
        assert_eq!(DeviceType::from_label("fan"), DeviceType::Fan);
        assert_eq!(DeviceType::from_label(" Air Conditioner "), DeviceType::Ac);
        assert_eq!(DeviceType::from_label("computer"), DeviceType::Pc);
        assert_eq!(DeviceType::from_label(""), DeviceType::Other);
        assert_eq!(
            DeviceType::from_label("Geyser"),
            DeviceType::Custom("Geyser".to_string())
        );
    }

    #[test]
    fn test_row_from_server_payload() {
        let row: PreviewRow = serde_json::from_value(json!({
            "building": "A",
            "room": 101,
            "device_type": "FAN",
            "watt_rating": "60",
            "quantity": 2,
            "hours_used_per_day": 5,
            "category": "cooling"
        }))
        .unwrap();

        assert_eq!(row.building, "A");
        assert_eq!(row.room, "101");
        assert_eq!(row.device_type, DeviceType::Fan);
        assert_eq!(row.watt_rating, 60.0);
        assert_eq!(row.quantity, 2.0);
        assert_eq!(row.hours_used_per_day, Some(5.0));
        assert_eq!(row.brand, None);
        assert_eq!(row.star_rating, None);
        assert_eq!(row.extra["category"], "cooling");
    }

    #[test]
    fn test_row_serializes_extra_fields_back() {
        let row: PreviewRow = serde_json::from_value(json!({
            "building": "B",
            "room": "2",
            "device_type": "Geyser",
            "watt_rating": 2000,
            "quantity": 1,
            "notes": "kitchen"
        }))
        .unwrap();

        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["device_type"], "Geyser");
        assert_eq!(value["notes"], "kitchen");
        assert_eq!(value["ton"], Value::Null);
    }

    #[test]
    fn test_missing_quantity_defaults_to_one() {
        let row: PreviewRow =
            serde_json::from_value(json!({"building": "A", "room": "1", "device_type": "PC"})).unwrap();
        assert_eq!(row.quantity, 1.0);
        assert_eq!(row.watt_rating, 0.0);
    }

    #[test]
    fn test_display_values() {
        let row = PreviewRow {
            watt_rating: 60.0,
            ton: Some(1.5),
            quantity: 3.0,
            ..PreviewRow::default()
        };
        assert_eq!(row.display_value(RowField::WattRating), "60");
        assert_eq!(row.display_value(RowField::Ton), "1.5");
        assert_eq!(row.display_value(RowField::StarRating), "");
        assert_eq!(row.total_watts(), 180.0);
    }

    #[test]
    fn test_row_field_parse() {
        assert_eq!("hours_used_per_day".parse::<RowField>(), Ok(RowField::HoursUsedPerDay));
        assert_eq!("Watt-Rating".parse::<RowField>(), Ok(RowField::WattRating));
        assert!("colour".parse::<RowField>().is_err());
    }

    #[test]
    fn test_outcome_summary_and_grouping() {
        let outcome = UploadOutcome {
            success: true,
            saved_count: 3,
            warnings: vec!["Row 2 skipped".into(), "Row 5 skipped".into()],
            issues: vec![
                RowIssue { row: "Row 4".into(), field: Some("quantity".into()), message: "must be >= 1".into() },
                RowIssue { row: "Row 4".into(), field: Some("room".into()), message: "required".into() },
                RowIssue { row: "Row 7".into(), field: None, message: "duplicate".into() },
            ],
            ..UploadOutcome::default()
        };

        assert_eq!(outcome.summary(), "3 devices saved");
        assert_eq!(outcome.problem_count(), 5);

        let grouped: BTreeMap<_, _> = outcome.grouped_issues().into_iter().collect();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["Row 4"].len(), 2);
        assert_eq!(grouped["Row 7"]["general"], vec!["duplicate"]);
    }

    #[test]
    fn test_out_of_range_numbers_are_kept_as_sent() {
        let row: PreviewRow = serde_json::from_value(json!({
            "building": "A",
            "room": "1",
            "device_type": "AC",
            "watt_rating": -5,
            "star_rating": 7,
            "quantity": 0,
            "hours_used_per_day": 30
        }))
        .unwrap();

        assert_eq!(row.star_rating, Some(7.0));
        assert_eq!(row.quantity, 0.0);
        assert_eq!(row.watt_rating, -5.0);
        assert_eq!(row.hours_used_per_day, Some(30.0));

        let fractional: PreviewRow = serde_json::from_value(json!({"quantity": 2.6, "star_rating": "0"})).unwrap();
        assert_eq!(fractional.quantity, 2.6);
        assert_eq!(fractional.star_rating, Some(0.0));
    }

    #[test]
    fn test_whole_numbers_serialize_as_integers() {
        let row = PreviewRow {
            quantity: 2.0,
            star_rating: Some(4.0),
            ..PreviewRow::default()
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["quantity"], json!(2));
        assert_eq!(value["star_rating"], json!(4));

        let odd = PreviewRow { quantity: 2.5, ..PreviewRow::default() };
        assert_eq!(serde_json::to_value(&odd).unwrap()["quantity"], json!(2.5));
    }

    #[test]
    fn test_grouped_issues_follow_row_numbers() {
        let issue = |row: &str| RowIssue { row: row.into(), field: None, message: "bad".into() };
        let issues = vec![issue("Row 10"), issue("Row 2"), issue("header"), issue("Row 1")];

        let rows: Vec<&str> = group_issues(&issues).into_iter().map(|(row, _)| row).collect();
        assert_eq!(rows, vec!["Row 1", "Row 2", "Row 10", "header"]);
    }
}
