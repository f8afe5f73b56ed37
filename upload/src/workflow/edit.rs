//! Inline edits to previewed rows.
//!
//! Raw editor input is coerced into a typed [`FieldEdit`] first, so invalid
//! text never reaches a row: required numbers fall back to `0` (watts) or
//! `1` (quantity), optional ones to `None`. Edits are applied with
//! [`apply_edit`], which returns a new collection and leaves the input
//! untouched.

use crate::models::{DeviceType, PreviewRow, RowField};

/// Maximum hours in a day.
pub const MAX_HOURS_PER_DAY: f64 = 24.0;

/// Tonnage granularity for AC units.
pub const TON_STEP: f64 = 0.5;

/// Parse user or spreadsheet text as a finite number.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Quantity is a whole number of at least one.
pub fn coerce_quantity(value: Option<f64>) -> u32 {
    match value {
        Some(n) if n.is_finite() && n >= 1.0 => n.round().min(f64::from(u32::MAX)) as u32,
        _ => 1,
    }
}

/// Star ratings run from 1 to 5; zero or negative means "no rating".
pub fn coerce_rating(value: f64) -> Option<u8> {
    if !value.is_finite() {
        return None;
    }
    let rounded = value.round();
    if rounded < 1.0 {
        None
    } else {
        Some(rounded.min(5.0) as u8)
    }
}

/// Tonnage snaps to the nearest half ton; anything below half a ton is unset.
pub fn coerce_ton(value: f64) -> Option<f64> {
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    let snapped = (value / TON_STEP).round() * TON_STEP;
    Some(snapped.max(TON_STEP))
}

/// A typed, already-coerced change to one field of one row.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEdit {
    Building(String),
    Room(String),
    DeviceType(DeviceType),
    Brand(Option<String>),
    WattRating(f64),
    StarRating(Option<u8>),
    Ton(Option<f64>),
    Quantity(u32),
    HoursUsedPerDay(Option<f64>),
}

impl FieldEdit {
    /// Coerce raw editor text for `field`.
    pub fn parse(field: RowField, raw: &str) -> Self {
        match field {
            RowField::Building => Self::Building(raw.to_string()),
            RowField::Room => Self::Room(raw.to_string()),
            RowField::DeviceType => Self::DeviceType(DeviceType::from_label(raw)),
            RowField::Brand => {
                let trimmed = raw.trim();
                Self::Brand((!trimmed.is_empty()).then(|| trimmed.to_string()))
            }
            RowField::WattRating => Self::WattRating(parse_number(raw).map_or(0.0, |w| w.max(0.0))),
            RowField::StarRating => Self::StarRating(parse_number(raw).and_then(coerce_rating)),
            RowField::Ton => Self::Ton(parse_number(raw).and_then(coerce_ton)),
            RowField::Quantity => Self::Quantity(coerce_quantity(parse_number(raw))),
            RowField::HoursUsedPerDay => Self::HoursUsedPerDay(
                parse_number(raw).map(|h| h.clamp(0.0, MAX_HOURS_PER_DAY)),
            ),
        }
    }

    /// Field this edit targets.
    pub fn field(&self) -> RowField {
        match self {
            Self::Building(_) => RowField::Building,
            Self::Room(_) => RowField::Room,
            Self::DeviceType(_) => RowField::DeviceType,
            Self::Brand(_) => RowField::Brand,
            Self::WattRating(_) => RowField::WattRating,
            Self::StarRating(_) => RowField::StarRating,
            Self::Ton(_) => RowField::Ton,
            Self::Quantity(_) => RowField::Quantity,
            Self::HoursUsedPerDay(_) => RowField::HoursUsedPerDay,
        }
    }

    /// Copy of `row` with this edit applied.
    pub fn applied_to(&self, row: &PreviewRow) -> PreviewRow {
        let mut next = row.clone();
        match self {
            Self::Building(v) => next.building = v.clone(),
            Self::Room(v) => next.room = v.clone(),
            Self::DeviceType(v) => next.device_type = v.clone(),
            Self::Brand(v) => next.brand = v.clone(),
            Self::WattRating(v) => next.watt_rating = *v,
            Self::StarRating(v) => next.star_rating = v.map(f64::from),
            Self::Ton(v) => next.ton = *v,
            Self::Quantity(v) => next.quantity = f64::from(*v),
            Self::HoursUsedPerDay(v) => next.hours_used_per_day = *v,
        }
        next
    }
}

/// New collection with `edit` applied to `rows[index]`.
///
/// Returns `None` when `index` is out of range.
pub fn apply_edit(rows: &[PreviewRow], index: usize, edit: &FieldEdit) -> Option<Vec<PreviewRow>> {
    if index >= rows.len() {
        return None;
    }
    Some(
        rows.iter()
            .enumerate()
            .map(|(i, row)| if i == index { edit.applied_to(row) } else { row.clone() })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<PreviewRow> {
        vec![
            PreviewRow {
                building: "A".into(),
                room: "101".into(),
                device_type: DeviceType::Fan,
                watt_rating: 60.0,
                quantity: 2.0,
                hours_used_per_day: Some(5.0),
                ..PreviewRow::default()
            },
            PreviewRow {
                building: "A".into(),
                room: "102".into(),
                device_type: DeviceType::Ac,
                watt_rating: 1500.0,
                ton: Some(1.5),
                quantity: 1.0,
                ..PreviewRow::default()
            },
        ]
    }

    #[test]
    fn test_edit_touches_only_one_cell() {
        let before = rows();
        let edit = FieldEdit::parse(RowField::HoursUsedPerDay, "8");
        let after = apply_edit(&before, 0, &edit).unwrap();

        assert_eq!(after[0].hours_used_per_day, Some(8.0));
        assert_eq!(after[1], before[1]);
        assert_eq!(
            PreviewRow { hours_used_per_day: Some(5.0), ..after[0].clone() },
            before[0]
        );
        // input untouched
        assert_eq!(before[0].hours_used_per_day, Some(5.0));
    }

    #[test]
    fn test_out_of_range_index() {
        assert!(apply_edit(&rows(), 2, &FieldEdit::Quantity(3)).is_none());
    }

    #[test]
    fn test_invalid_numbers_coerce_to_safe_defaults() {
        assert_eq!(FieldEdit::parse(RowField::WattRating, ""), FieldEdit::WattRating(0.0));
        assert_eq!(FieldEdit::parse(RowField::WattRating, "abc"), FieldEdit::WattRating(0.0));
        assert_eq!(FieldEdit::parse(RowField::WattRating, "-40"), FieldEdit::WattRating(0.0));
        assert_eq!(FieldEdit::parse(RowField::Quantity, ""), FieldEdit::Quantity(1));
        assert_eq!(FieldEdit::parse(RowField::Quantity, "NaN"), FieldEdit::Quantity(1));
        assert_eq!(FieldEdit::parse(RowField::StarRating, ""), FieldEdit::StarRating(None));
        assert_eq!(FieldEdit::parse(RowField::Ton, "x"), FieldEdit::Ton(None));
        assert_eq!(FieldEdit::parse(RowField::HoursUsedPerDay, ""), FieldEdit::HoursUsedPerDay(None));
    }

    #[test]
    fn test_numeric_ranges() {
        assert_eq!(FieldEdit::parse(RowField::StarRating, "7"), FieldEdit::StarRating(Some(5)));
        assert_eq!(FieldEdit::parse(RowField::StarRating, "3.4"), FieldEdit::StarRating(Some(3)));
        assert_eq!(FieldEdit::parse(RowField::Ton, "1.3"), FieldEdit::Ton(Some(1.5)));
        assert_eq!(FieldEdit::parse(RowField::Ton, "0.1"), FieldEdit::Ton(Some(0.5)));
        assert_eq!(FieldEdit::parse(RowField::HoursUsedPerDay, "30"), FieldEdit::HoursUsedPerDay(Some(24.0)));
        assert_eq!(FieldEdit::parse(RowField::Quantity, "2.6"), FieldEdit::Quantity(3));
    }

    #[test]
    fn test_text_fields() {
        assert_eq!(FieldEdit::parse(RowField::Brand, "  "), FieldEdit::Brand(None));
        assert_eq!(FieldEdit::parse(RowField::Brand, " Havells "), FieldEdit::Brand(Some("Havells".into())));
        assert_eq!(FieldEdit::parse(RowField::DeviceType, "cooler"), FieldEdit::DeviceType(DeviceType::Cooler));
        assert_eq!(FieldEdit::parse(RowField::Room, "Lab 2").field(), RowField::Room);
    }

    #[test]
    fn test_edit_brings_server_values_into_range() {
        let mut before = rows();
        before[0].quantity = 0.0;
        before[0].star_rating = Some(7.0);

        let after = apply_edit(&before, 0, &FieldEdit::parse(RowField::Quantity, "0")).unwrap();
        assert_eq!(after[0].quantity, 1.0);
        assert_eq!(after[0].star_rating, Some(7.0));

        let after = apply_edit(&after, 0, &FieldEdit::parse(RowField::StarRating, "7")).unwrap();
        assert_eq!(after[0].star_rating, Some(5.0));
    }
}
