//! The persisted metadata record of a fragment.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Metadata of a fragment as it is written to and read from storage.
///
/// All fields are plain scalars. Timestamps are serialized as RFC 3339 strings and field names use
/// camel case:
///
/// ```json
/// {
///   "id": "4a1b...",
///   "ownerId": "11d4c22e...",
///   "created": "2024-01-01T12:00:00.123Z",
///   "updated": "2024-01-01T12:00:05.456Z",
///   "type": "text/markdown",
///   "size": 42
/// }
/// ```
///
/// The record itself does not enforce any invariants. Validation happens when a fragment entity is
/// constructed from it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentRecord {
    /// Identifier of the fragment, unique within its owner.
    pub id: String,
    /// Opaque identifier of the owning principal.
    pub owner_id: String,
    /// Time of creation.
    #[serde(with = "humantime_serde")]
    pub created: SystemTime,
    /// Time of the last metadata or data write.
    #[serde(with = "humantime_serde")]
    pub updated: SystemTime,
    /// Declared media type, possibly including parameters such as `charset`.
    #[serde(rename = "type")]
    pub media_type: String,
    /// Length of the stored data in bytes.
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn make_record() -> FragmentRecord {
        let created = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        FragmentRecord {
            id: "abc123".into(),
            owner_id: "owner".into(),
            created,
            updated: created + Duration::from_millis(1500),
            media_type: "text/plain; charset=utf-8".into(),
            size: 5,
        }
    }

    #[test]
    fn test_serialized_shape() {
        let value = serde_json::to_value(make_record()).unwrap();

        assert_eq!(value["id"], "abc123");
        assert_eq!(value["ownerId"], "owner");
        assert_eq!(value["created"], "2023-11-14T22:13:20Z");
        assert_eq!(value["type"], "text/plain; charset=utf-8");
        assert_eq!(value["size"], 5);
        assert!(value.get("owner_id").is_none());
        assert!(value.get("media_type").is_none());
    }

    #[test]
    fn test_timestamps_survive_serialization() {
        let record = make_record();
        let json = serde_json::to_string(&record).unwrap();
        let parsed: FragmentRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_rejects_negative_size() {
        let json = r#"{
            "id": "a",
            "ownerId": "b",
            "created": "2024-01-01T00:00:00Z",
            "updated": "2024-01-01T00:00:00Z",
            "type": "text/plain",
            "size": -1
        }"#;
        assert!(serde_json::from_str::<FragmentRecord>(json).is_err());
    }
}
