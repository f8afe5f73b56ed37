//! Wire shapes of the preview and save endpoints.
//!
//! Both bodies are read as loose JSON first: the backend has grown several
//! spellings for the same facts (`saved_count` / `savedCount`,
//! `skipped_count` / `records_skipped`, string or structured errors).

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{excerpt, TransportError, TransportResult};
use crate::models::{PreviewRow, RowIssue, UploadOutcome};

const DEFAULT_PREVIEW_ERROR: &str = "Failed to parse file";
const DEFAULT_SAVE_ERROR: &str = "Failed to save devices";

/// Body of the save request.
#[derive(Debug, Serialize)]
pub struct SaveRequest<'a> {
    pub devices: &'a [PreviewRow],
}

// =============================================================================
// Preview
// =============================================================================

/// Normalize a 2xx preview body into rows.
///
/// - `{"devices": [...]}` (with or without `success`) yields the rows
/// - `{"success": true}` without `devices` yields no rows
/// - anything else with `success: false` or an `error` is a rejection
pub fn parse_preview_body(body: &str) -> TransportResult<Vec<PreviewRow>> {
    let object = parse_object(body)?;

    match object.get("devices") {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                serde_json::from_value::<PreviewRow>(item.clone())
                    .map_err(|e| TransportError::Body(format!("device {} is malformed: {}", i + 1, e)))
            })
            .collect(),
        Some(Value::Null) | None => {
            if has_failure(&object) {
                Err(rejection(&object, DEFAULT_PREVIEW_ERROR))
            } else if matches!(object.get("success"), Some(Value::Bool(true))) {
                Ok(Vec::new())
            } else {
                Err(TransportError::Body("missing 'devices' list".to_string()))
            }
        }
        Some(other) => Err(TransportError::Body(format!(
            "'devices' should be a list, found {}",
            type_name(other)
        ))),
    }
}

// =============================================================================
// Save
// =============================================================================

/// Normalize a 2xx save body into an outcome.
///
/// A body that says `success: false` is a rejection. Otherwise a saved
/// count is required and everything else is optional.
pub fn parse_save_body(body: &str) -> TransportResult<UploadOutcome> {
    let object = parse_object(body)?;

    if matches!(object.get("success"), Some(Value::Bool(false))) {
        return Err(rejection(&object, DEFAULT_SAVE_ERROR));
    }

    let saved_count = first_count(&object, &["saved_count", "savedCount", "devices_created", "created"])
        .ok_or_else(|| TransportError::Body("missing 'saved_count'".to_string()))?;

    let mut outcome = UploadOutcome {
        success: true,
        saved_count,
        skipped_count: first_count(&object, &["skipped_count", "records_skipped", "skipped"]).unwrap_or(0),
        warnings: messages(object.get("warnings")),
        duplicates: messages(object.get("duplicates")),
        ..UploadOutcome::default()
    };

    if let Some(Value::Array(errors)) = object.get("errors") {
        for entry in errors {
            match entry {
                Value::Object(map) => outcome.issues.extend(issue_entry(map)),
                other => outcome.errors.push(text_of(other)),
            }
        }
    } else if let Some(Value::Object(map)) = object.get("errors") {
        outcome.issues.extend(row_issues(map));
    }

    if let Some(Value::Object(map)) = object.get("validation_errors") {
        outcome.issues.extend(row_issues(map));
    }

    Ok(outcome)
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_object(body: &str) -> TransportResult<Map<String, Value>> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(TransportError::Body(format!("expected an object, found {}", type_name(&other)))),
        Err(_) => Err(TransportError::Body(format!("not JSON: {}", excerpt(body)))),
    }
}

fn has_failure(object: &Map<String, Value>) -> bool {
    matches!(object.get("success"), Some(Value::Bool(false)))
        || object.get("error").is_some_and(|e| !e.is_null())
}

fn rejection(object: &Map<String, Value>, fallback: &str) -> TransportError {
    let message = ["error", "message", "detail"]
        .iter()
        .filter_map(|key| object.get(*key))
        .find(|v| !v.is_null())
        .map(text_of)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string());

    let mut issues = Vec::new();
    for key in ["validation_errors", "errors"] {
        match object.get(key) {
            Some(Value::Object(map)) => issues.extend(row_issues(map)),
            Some(Value::Array(items)) => issues.extend(items.iter().filter_map(Value::as_object).flat_map(issue_entry)),
            _ => {}
        }
    }
    TransportError::Rejected { message, issues }
}

fn first_count(object: &Map<String, Value>, keys: &[&str]) -> Option<usize> {
    keys.iter().find_map(|key| match object.get(*key)? {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// String list from a JSON array; non-strings are rendered as JSON.
fn messages(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().map(text_of).collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `{"Row 3": {"quantity": ["must be >= 1"]}}` or `{"3": ["duplicate"]}`.
fn row_issues(map: &Map<String, Value>) -> Vec<RowIssue> {
    let mut issues = Vec::new();
    for (row, detail) in map {
        match detail {
            Value::Object(fields) => {
                for (field, msgs) in fields {
                    for message in messages_or_single(msgs) {
                        issues.push(RowIssue {
                            row: row.clone(),
                            field: Some(field.clone()),
                            message,
                        });
                    }
                }
            }
            other => {
                for message in messages_or_single(other) {
                    issues.push(RowIssue {
                        row: row.clone(),
                        field: None,
                        message,
                    });
                }
            }
        }
    }
    issues
}

/// `{"row": 3, "field": "room", "message": "..."}` or
/// `{"row": 3, "errors": {"room": ["..."]}}`.
fn issue_entry(map: &Map<String, Value>) -> Vec<RowIssue> {
    let row = map.get("row").map(text_of).unwrap_or_else(|| "general".to_string());

    if let Some(Value::Object(fields)) = map.get("errors") {
        let mut nested = Map::new();
        nested.insert(row, Value::Object(fields.clone()));
        return row_issues(&nested);
    }

    let message = map
        .get("message")
        .or_else(|| map.get("error"))
        .map(text_of)
        .unwrap_or_else(|| Value::Object(map.clone()).to_string());

    vec![RowIssue {
        row,
        field: map.get("field").and_then(Value::as_str).map(str::to_string),
        message,
    }]
}

fn messages_or_single(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(text_of).collect(),
        Value::Null => Vec::new(),
        other => vec![text_of(other)],
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeviceType, RowField};
    use crate::validation::check_row;
    use std::collections::BTreeMap;

    #[test]
    fn test_preview_devices_with_and_without_success_flag() {
        let rows = parse_preview_body(
            r#"{"success": true, "devices": [{"building": "A", "room": "101", "device_type": "FAN", "watt_rating": 60, "quantity": 2, "hours_used_per_day": 5}]}"#,
        )
        .unwrap();
        assert_eq!(rows[0].device_type, DeviceType::Fan);
        assert_eq!(rows[0].quantity, 2.0);

        let rows = parse_preview_body(r#"{"devices": []}"#).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_preview_rows_keep_server_values() {
        let rows = parse_preview_body(
            r#"{"devices": [{"building": "A", "room": "1", "device_type": "FAN", "watt_rating": 60, "quantity": 0, "star_rating": 7, "hours_used_per_day": 30}]}"#,
        )
        .unwrap();

        assert_eq!(rows[0].quantity, 0.0);
        assert_eq!(rows[0].star_rating, Some(7.0));
        assert_eq!(rows[0].hours_used_per_day, Some(30.0));

        let fields: Vec<RowField> = check_row(&rows[0]).iter().map(|i| i.field).collect();
        assert_eq!(fields, vec![RowField::Quantity, RowField::StarRating, RowField::HoursUsedPerDay]);
    }

    #[test]
    fn test_preview_success_without_devices_is_empty() {
        assert!(parse_preview_body(r#"{"success": true}"#).unwrap().is_empty());
    }

    #[test]
    fn test_preview_rejection_carries_server_message() {
        let err = parse_preview_body(r#"{"success": false, "error": "No header row"}"#).unwrap_err();
        assert_eq!(err.to_string(), "No header row");

        let err = parse_preview_body(r#"{"success": false}"#).unwrap_err();
        assert_eq!(err.to_string(), DEFAULT_PREVIEW_ERROR);
    }

    #[test]
    fn test_preview_unexpected_shapes() {
        for body in ["[]", r#"{"devices": "none"}"#, "<html>", "{}", r#"{"success": "yes"}"#] {
            let err = parse_preview_body(body).unwrap_err();
            assert!(matches!(err, TransportError::Body(_)), "{body}: {err:?}");
        }
    }

    #[test]
    fn test_save_minimal_and_aliases() {
        let outcome = parse_save_body(r#"{"savedCount": 4, "records_skipped": 1}"#).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.saved_count, 4);
        assert_eq!(outcome.skipped_count, 1);
        assert!(!outcome.has_problems());
    }

    #[test]
    fn test_save_partial_failure_is_success_with_details() {
        let outcome = parse_save_body(
            r#"{
                "success": true,
                "saved_count": 3,
                "warnings": ["Row 2: duplicate skipped", "Row 4: unknown brand"],
                "errors": ["Row 5: bad value", {"row": 6, "field": "room", "message": "required"}],
                "duplicates": ["A/101 FAN"],
                "validation_errors": {"Row 7": {"quantity": ["must be >= 1", "must be whole"]}, "Row 8": "bad"}
            }"#,
        )
        .unwrap();

        assert_eq!(outcome.saved_count, 3);
        assert_eq!(outcome.warnings.len(), 2);
        assert_eq!(outcome.errors, vec!["Row 5: bad value"]);
        assert_eq!(outcome.duplicates.len(), 1);
        assert_eq!(outcome.issues.len(), 4);
        assert_eq!(outcome.issues[0].row, "6");
        assert_eq!(outcome.issues[0].field.as_deref(), Some("room"));

        let grouped: BTreeMap<_, _> = outcome.grouped_issues().into_iter().collect();
        assert_eq!(grouped["Row 7"]["quantity"].len(), 2);
        assert_eq!(grouped["Row 8"]["general"], vec!["bad"]);
    }

    #[test]
    fn test_save_rejection_and_missing_count() {
        let err = parse_save_body(
            r#"{"success": false, "error": "All rows invalid", "validation_errors": {"1": {"room": "required"}}}"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "All rows invalid");
        assert_eq!(err.issues().len(), 1);

        let err = parse_save_body(r#"{"success": true}"#).unwrap_err();
        assert!(matches!(err, TransportError::Body(_)));
    }
}
