//! In-memory device store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::PreviewRow;

/// A saved device.
#[derive(Debug, Clone, Serialize)]
pub struct StoredDevice {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub row: PreviewRow,
}

/// Devices saved during this server's lifetime.
#[derive(Debug, Default)]
pub struct DeviceStore {
    devices: Vec<StoredDevice>,
}

/// Identity used to detect duplicates: same place, type and brand.
fn identity(row: &PreviewRow) -> (String, String, String, String) {
    (
        row.building.trim().to_lowercase(),
        row.room.trim().to_lowercase(),
        row.device_type.as_str().to_lowercase(),
        row.brand.as_deref().unwrap_or("").trim().to_lowercase(),
    )
}

impl DeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, row: &PreviewRow) -> bool {
        let key = identity(row);
        self.devices.iter().any(|d| identity(&d.row) == key)
    }

    /// Store `row` unless an identical device exists. Returns the new entry.
    pub fn insert(&mut self, row: PreviewRow) -> Option<&StoredDevice> {
        if self.contains(&row) {
            return None;
        }
        self.devices.push(StoredDevice {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            row,
        });
        self.devices.last()
    }

    pub fn list(&self) -> &[StoredDevice] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeviceType;

    fn row(room: &str, brand: Option<&str>) -> PreviewRow {
        PreviewRow {
            building: "A".into(),
            room: room.into(),
            device_type: DeviceType::Fan,
            brand: brand.map(str::to_string),
            ..PreviewRow::default()
        }
    }

    #[test]
    fn test_insert_and_duplicates() {
        let mut store = DeviceStore::new();
        assert!(store.insert(row("101", None)).is_some());
        assert!(store.insert(row(" 101 ", None)).is_none());
        assert!(store.insert(row("101", Some("Havells"))).is_some());
        assert!(store.insert(row("102", None)).is_some());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_serialized_entry_is_flat() {
        let mut store = DeviceStore::new();
        store.insert(row("101", None));
        let value = serde_json::to_value(&store.list()[0]).unwrap();
        assert_eq!(value["room"], "101");
        assert!(value["id"].is_string());
        assert!(value["created_at"].is_string());
    }
}
