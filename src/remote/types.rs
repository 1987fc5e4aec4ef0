//! Wire types for the content management API.
//!
//! Entries are JSON documents of the shape
//! `{"sys": {"id", "version", "publishedVersion"}, "fields": {field: {locale: value}}}`.
//! The `sys` block is server-owned: ids are assigned on create and the
//! version counter bumps on every mutating call.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Header carrying the expected entry version on mutating calls.
pub const VERSION_HEADER: &str = "X-Entry-Version";

/// Header naming the schema when creating an entry.
pub const SCHEMA_HEADER: &str = "X-Entry-Schema";

/// Field name → locale → value.
pub type FieldMap = BTreeMap<String, BTreeMap<String, Value>>;

/// Server-owned entry metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrySys {
    /// Entry identifier, assigned remotely on create.
    pub id: String,
    /// Version token, bumped on every mutating call.
    pub version: u64,
    /// Version that was last published; present only on published entries.
    #[serde(rename = "publishedVersion", skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub published_version: Option<u64>,
}

/// A full remote entry as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub sys: EntrySys,
    #[serde(default)]
    pub fields: FieldMap,
}

/// Body sent on create and update calls.
#[derive(Debug, Clone, Serialize)]
pub struct EntryPayload {
    pub fields: FieldMap,
}

/// Response of the list/query endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryList {
    #[serde(default)]
    pub items: Vec<RemoteEntry>,
}

/// One field of a remote schema, as reported by the schema lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaField {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
}

/// Response of the schema lookup endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaList {
    #[serde(default)]
    pub items: Vec<Schema>,
}

/// A named remote schema.
#[derive(Debug, Clone, Deserialize)]
pub struct Schema {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<SchemaField>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_deserializes_published_version() {
        let entry: RemoteEntry = serde_json::from_value(json!({
            "sys": {"id": "e1", "version": 5, "publishedVersion": 4},
            "fields": {"title": {"en-US": "Hello"}}
        }))
        .unwrap();
        assert_eq!(entry.sys.id, "e1");
        assert_eq!(entry.sys.version, 5);
        assert_eq!(entry.sys.published_version, Some(4));
        assert_eq!(entry.fields["title"]["en-US"], json!("Hello"));
    }

    #[test]
    fn test_entry_without_published_version_or_fields() {
        let entry: RemoteEntry = serde_json::from_value(json!({
            "sys": {"id": "e2", "version": 1}
        }))
        .unwrap();
        assert_eq!(entry.sys.published_version, None);
        assert!(entry.fields.is_empty());
    }
}
