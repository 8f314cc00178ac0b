use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A row returned by the Stackby list endpoint.
///
/// The API guarantees only a `fields` mapping from column name to value; any
/// other keys (row id, created time, ...) are preserved and re-emitted
/// untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A batch of new rows emitted by one trigger.
#[derive(Debug, Clone, Serialize)]
pub struct RowEvent {
    pub trigger: String,
    pub records: Vec<Record>,
}

/// How a poll was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    /// Background poll on the configured cadence.
    Scheduled,
    /// User-initiated test run: ignores the watermark filter and requests a
    /// single row, so the trigger can be previewed without matching history.
    Manual,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_preserves_unknown_keys() {
        let raw = json!({
            "createdAt": "2024-05-01T12:00:00Z",
            "fields": {"Count": 3, "Name": "Widget"},
            "id": "row_1"
        });

        let record: Record = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(record.fields["Name"], "Widget");
        assert_eq!(record.extra["id"], "row_1");

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn test_record_without_fields_key() {
        let record: Record = serde_json::from_value(json!({"id": "row_2"})).unwrap();
        assert!(record.fields.is_empty());
    }
}
