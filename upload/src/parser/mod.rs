//! Device spreadsheet ingestion for the development backend.
//!
//! Turns an uploaded CSV (any common encoding and delimiter) or JSON device
//! list into [`PreviewRow`]s. Header names are matched against a table of
//! known spellings; unknown columns are carried through in `extra`.

use serde_json::{Map, Value};

use crate::error::{ParseError, ParseResult};
use crate::models::{PreviewRow, RowField};

/// Parsed upload with detection metadata.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub rows: Vec<PreviewRow>,
    /// Detected encoding (`"utf-8"` for JSON).
    pub encoding: String,
    /// Detected delimiter, for CSV.
    pub delimiter: Option<char>,
    /// Source header to device field.
    pub mapped: Vec<(String, RowField)>,
    /// Source headers kept as extra fields.
    pub unmapped: Vec<String>,
}

/// Raw CSV cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
}

// =============================================================================
// Detection
// =============================================================================

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let (charset, _confidence, _language) = chardet::detect(bytes);

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" | "utf-8-sig" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes, dropping a leading byte-order mark.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding {
        "iso-8859-1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };
    decoded.trim_start_matches('\u{feff}').to_string()
}

/// Pick the separator that occurs most often in the header line.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let mut best = ',';
    let mut best_count = 0;
    for sep in [',', ';', '\t', '|'] {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best = sep;
        }
    }
    best
}

// =============================================================================
// Header mapping
// =============================================================================

/// `"Rated Power (W)"` -> `"rated_power_w"`.
fn normalize_header(header: &str) -> String {
    let mut out = String::with_capacity(header.len());
    for c in header.trim().chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

/// Device field a source column maps to, if any.
pub fn column_for(header: &str) -> Option<RowField> {
    let field = match normalize_header(header).as_str() {
        "building" | "building_name" | "block" | "bldg" => RowField::Building,
        "room" | "room_no" | "room_number" | "room_name" | "location" => RowField::Room,
        "device_type" | "type" | "device" | "appliance" | "device_category" => RowField::DeviceType,
        "brand" | "make" | "manufacturer" | "brand_name" => RowField::Brand,
        "watt_rating" | "watts" | "wattage" | "watt" | "power" | "power_w" | "rated_power"
        | "rated_power_w" | "power_watts" => RowField::WattRating,
        "star_rating" | "stars" | "star" | "bee_rating" | "energy_star" => RowField::StarRating,
        "ton" | "tons" | "tonnage" | "ton_ac" | "capacity_ton" => RowField::Ton,
        "quantity" | "qty" | "count" | "units" | "no_of_units" => RowField::Quantity,
        "hours_used_per_day" | "hours" | "hours_per_day" | "daily_usage" | "daily_usage_hr"
        | "usage_hours" | "daily_hours" => RowField::HoursUsedPerDay,
        _ => return None,
    };
    Some(field)
}

// =============================================================================
// CSV
// =============================================================================

/// Parse CSV text with the csv crate. Blank lines are skipped and short
/// records are padded.
pub fn parse_table(content: &str, delimiter: char) -> ParseResult<Table> {
    if content.trim().is_empty() {
        return Err(ParseError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers().map_err(csv_error)?.iter().map(str::to_string).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(ParseError::NoHeaders);
    }

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_error)?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        let mut cells: Vec<String> = record.iter().take(headers.len()).map(str::to_string).collect();
        cells.resize(headers.len(), String::new());
        records.push(cells);
    }

    Ok(Table { headers, records })
}

fn csv_error(err: csv::Error) -> ParseError {
    ParseError::Csv {
        line: err.position().map_or(0, |p| p.line()),
        message: err.to_string(),
    }
}

fn rows_from_table(table: &Table) -> ParseResult<(Vec<PreviewRow>, Vec<(String, RowField)>, Vec<String>)> {
    let columns: Vec<Option<RowField>> = table.headers.iter().map(|h| column_for(h)).collect();

    if columns.iter().all(Option::is_none) {
        return Err(ParseError::NoKnownColumns(table.headers.join(", ")));
    }

    let mut mapped = Vec::new();
    let mut unmapped = Vec::new();
    for (header, column) in table.headers.iter().zip(&columns) {
        match column {
            Some(field) => mapped.push((header.clone(), *field)),
            None if !header.is_empty() => unmapped.push(header.clone()),
            None => {}
        }
    }

    let rows = table
        .records
        .iter()
        .map(|cells| {
            let mut object = Map::new();
            for ((header, column), cell) in table.headers.iter().zip(&columns).zip(cells) {
                match column {
                    // first matching column wins
                    Some(field) => {
                        object.entry(field.key()).or_insert_with(|| Value::String(cell.clone()));
                    }
                    None if !header.is_empty() && !cell.is_empty() => {
                        object.insert(header.clone(), Value::String(cell.clone()));
                    }
                    None => {}
                }
            }
            serde_json::from_value::<PreviewRow>(Value::Object(object))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((rows, mapped, unmapped))
}

// =============================================================================
// JSON
// =============================================================================

/// Rows from `[{...}]` or `{"devices": [{...}]}`. Keys go through the
/// same header mapping as CSV columns.
pub fn rows_from_json(content: &str) -> ParseResult<Vec<PreviewRow>> {
    let value: Value = serde_json::from_str(content.trim())?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("devices") {
            Some(Value::Array(items)) => items,
            _ => return Err(ParseError::NoKnownColumns("expected a 'devices' list".to_string())),
        },
        _ => return Err(ParseError::NoKnownColumns("expected a list of devices".to_string())),
    };

    items
        .into_iter()
        .map(|item| {
            let object: Map<String, Value> = match item {
                Value::Object(fields) => fields
                    .into_iter()
                    .map(|(key, value)| match column_for(&key) {
                        Some(field) => (field.key().to_string(), value),
                        None => (key, value),
                    })
                    .collect(),
                other => return Err(ParseError::NoKnownColumns(format!("device entry is not an object: {}", other))),
            };
            Ok(serde_json::from_value::<PreviewRow>(Value::Object(object))?)
        })
        .collect()
}

// =============================================================================
// Entry point
// =============================================================================

/// Parse an uploaded file by extension.
pub fn ingest(file_name: &str, bytes: &[u8]) -> ParseResult<Ingested> {
    let extension = crate::validation::extension_of(file_name).unwrap_or_default();
    if bytes.is_empty() {
        return Err(ParseError::EmptyFile);
    }

    match extension.as_str() {
        "xlsx" | "xls" => Err(ParseError::UnsupportedFormat(extension)),
        "json" => {
            let content = decode_content(bytes, "utf-8");
            Ok(Ingested {
                rows: rows_from_json(&content)?,
                encoding: "utf-8".to_string(),
                delimiter: None,
                mapped: Vec::new(),
                unmapped: Vec::new(),
            })
        }
        _ => {
            let encoding = detect_encoding(bytes);
            let content = decode_content(bytes, &encoding);
            let delimiter = detect_delimiter(&content);
            let table = parse_table(&content, delimiter)?;
            let (rows, mapped, unmapped) = rows_from_table(&table)?;

            tracing::debug!(
                "parsed {} rows from {} ({}, delimiter {:?})",
                rows.len(),
                file_name,
                encoding,
                delimiter
            );

            Ok(Ingested {
                rows,
                encoding,
                delimiter: Some(delimiter),
                mapped,
                unmapped,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeviceType;

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a|b|c"), '|');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_header_spellings() {
        assert_eq!(column_for("Rated Power (W)"), Some(RowField::WattRating));
        assert_eq!(column_for("Daily Usage (Hr)"), Some(RowField::HoursUsedPerDay));
        assert_eq!(column_for(" QTY "), Some(RowField::Quantity));
        assert_eq!(column_for("Ton (AC)"), Some(RowField::Ton));
        assert_eq!(column_for("Device Type"), Some(RowField::DeviceType));
        assert_eq!(column_for("Notes"), None);
    }

    #[test]
    fn test_quoted_cells_and_blank_lines() {
        let table = parse_table("name,value\n\"Lab, 2\",\"x\"\n\n3\n", ',').unwrap();
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0][0], "Lab, 2");
        assert_eq!(table.records[1], vec!["3".to_string(), String::new()]);
    }

    #[test]
    fn test_ingest_csv_maps_columns() {
        let csv = "Building;Room;Device Type;Watts;Qty;Hours;Notes\nA;101;Ceiling Fan;60;2;5;near window\nA;102;AC;1500;1;;\n";
        let ingested = ingest("devices.csv", csv.as_bytes()).unwrap();

        assert_eq!(ingested.delimiter, Some(';'));
        assert_eq!(ingested.unmapped, vec!["Notes"]);
        assert_eq!(ingested.rows.len(), 2);

        let fan = &ingested.rows[0];
        assert_eq!(fan.device_type, DeviceType::Fan);
        assert_eq!(fan.watt_rating, 60.0);
        assert_eq!(fan.quantity, 2.0);
        assert_eq!(fan.hours_used_per_day, Some(5.0));
        assert_eq!(fan.extra["Notes"], "near window");

        let ac = &ingested.rows[1];
        assert_eq!(ac.hours_used_per_day, None);
        assert!(ac.extra.is_empty());
    }

    #[test]
    fn test_ingest_non_utf8_header() {
        // 0xE2 is 'â' in Latin-1
        let mut bytes = b"room,B".to_vec();
        bytes.push(0xE2);
        bytes.extend_from_slice(b"timent\n101,Nord\n");
        let ingested = ingest("devices.csv", &bytes).unwrap();
        assert_eq!(ingested.rows[0].room, "101");
        assert_eq!(ingested.unmapped.len(), 1);
    }

    #[test]
    fn test_ingest_errors() {
        assert!(matches!(ingest("a.csv", b""), Err(ParseError::EmptyFile)));
        assert!(matches!(ingest("a.xlsx", b"PK\x03\x04"), Err(ParseError::UnsupportedFormat(ext)) if ext == "xlsx"));
        assert!(matches!(ingest("a.csv", b"foo,bar\n1,2\n"), Err(ParseError::NoKnownColumns(_))));
    }

    #[test]
    fn test_ingest_json_lists() {
        let rows = rows_from_json(r#"[{"building": "A", "room": "1", "type": "LED", "watts": "9"}]"#).unwrap();
        assert_eq!(rows[0].device_type, DeviceType::Light);
        assert_eq!(rows[0].watt_rating, 9.0);

        let ingested = ingest("d.json", br#"{"devices": [{"building": "B", "room": "2"}]}"#).unwrap();
        assert_eq!(ingested.rows[0].building, "B");
        assert!(matches!(rows_from_json("[1]"), Err(ParseError::NoKnownColumns(_))));
    }
}
