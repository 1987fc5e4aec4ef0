//! Column-to-field mapping file handling.
//!
//! The mapping file is a JSON document produced by the `map` command and
//! then filled in by hand. It records the table's columns and the remote
//! schema's fields for reference, but the engine only reads `mapping`:
//! local column name → remote field name.

use crate::error::{Error, Result};
use crate::remote::SchemaField;
use crate::storage::ColumnInfo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// The on-disk mapping document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingFile {
    /// Columns of the local table at generation time (reference only).
    #[serde(default)]
    pub table_columns: Vec<ColumnInfo>,
    /// Fields of the remote schema at generation time (reference only).
    #[serde(default)]
    pub remote_fields: Vec<SchemaField>,
    /// Local column name → remote field name.
    pub mapping: BTreeMap<String, String>,
}

impl MappingFile {
    /// Load a mapping file from disk.
    ///
    /// # Errors
    ///
    /// Returns `Error::Mapping` if the file is missing or unparseable.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Mapping(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::Mapping(format!("cannot parse {}: {e}", path.display())))
    }

    /// Build a stub mapping from the table columns and remote fields.
    ///
    /// Bookkeeping columns are excluded; all remaining columns get an
    /// empty field name for the operator to fill in.
    #[must_use]
    pub fn stub(
        table_columns: Vec<ColumnInfo>,
        remote_fields: Vec<SchemaField>,
        bookkeeping: &[&str],
    ) -> Self {
        let mapping = table_columns
            .iter()
            .filter(|c| !bookkeeping.contains(&c.name.as_str()))
            .map(|c| (c.name.clone(), String::new()))
            .collect();
        Self {
            table_columns,
            remote_fields,
            mapping,
        }
    }

    /// Write the document as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an IO or JSON error on failure.
    pub fn write(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The usable mapping for a run: entries whose field name has been
    /// filled in. Stub entries (empty field names) are ignored.
    ///
    /// # Errors
    ///
    /// Returns `Error::Mapping` when nothing is mapped at all.
    pub fn field_mapping(&self) -> Result<BTreeMap<String, String>> {
        let mapping: BTreeMap<String, String> = self
            .mapping
            .iter()
            .filter(|(_, field)| !field.is_empty())
            .map(|(col, field)| (col.clone(), field.clone()))
            .collect();
        if mapping.is_empty() {
            return Err(Error::Mapping(
                "mapping file has no mapped columns (fill in the field names)".to_string(),
            ));
        }
        Ok(mapping)
    }
}
