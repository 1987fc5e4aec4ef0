//! Data types for the reconciliation pass.
//!
//! A [`Row`] is one record read from the local table. Rows sharing a
//! common id are locale variants of one logical entity and are folded
//! into an [`EntityGroup`] by [`group_rows`] before reconciliation.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Publication status of a row / remote entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStatus {
    Published,
    Draft,
}

impl PublishStatus {
    /// Column text for this status.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::Published => "Published",
            Self::Draft => "Draft",
        }
    }

    /// Parse the status column text. Unknown or empty text is `None`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "Published" => Some(Self::Published),
            "Draft" => Some(Self::Draft),
            _ => None,
        }
    }
}

impl fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record from the local table.
///
/// The engine reads all columns but writes back only the remote entry id,
/// version, and status columns.
#[derive(Debug, Clone)]
pub struct Row {
    /// Primary key, unique per row.
    pub pk: i64,
    /// Logical id shared by all locale variants of one entity.
    pub common_id: Value,
    /// Remote entry id, if the entity has been created remotely.
    pub entry_id: Option<String>,
    /// Remote version token (numeric-as-string).
    pub entry_version: Option<String>,
    /// Publication status, if set.
    pub status: Option<PublishStatus>,
    /// Locale code of this variant.
    pub locale: String,
    /// Mapped content columns, keyed by column name.
    pub content: BTreeMap<String, Value>,
}

/// An ordered set of rows sharing one common id, one per locale.
///
/// Groups are ephemeral: built once per pass, never persisted. A group is
/// always non-empty; the first row serves as the representative for the
/// scalar bookkeeping values (entry id, version), which are expected to be
/// identical across the group.
#[derive(Debug, Clone)]
pub struct EntityGroup {
    rows: Vec<Row>,
}

impl EntityGroup {
    /// Wrap a non-empty row set. Callers must not pass an empty vec;
    /// [`group_rows`] never produces one.
    #[must_use]
    pub fn new(rows: Vec<Row>) -> Self {
        debug_assert!(!rows.is_empty());
        Self { rows }
    }

    /// All rows, in input order.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// The representative row for scalar bookkeeping values.
    #[must_use]
    pub fn representative(&self) -> &Row {
        &self.rows[0]
    }

    /// The common id shared by every member.
    #[must_use]
    pub fn common_id(&self) -> &Value {
        &self.representative().common_id
    }

    /// Remote entry id, read from the first member that has one.
    #[must_use]
    pub fn entry_id(&self) -> Option<&str> {
        self.rows.iter().find_map(|r| r.entry_id.as_deref())
    }

    /// Remote version token, read from the first member that has one.
    #[must_use]
    pub fn entry_version(&self) -> Option<&str> {
        self.rows.iter().find_map(|r| r.entry_version.as_deref())
    }

    /// Whether any row in the group is marked `Published`.
    #[must_use]
    pub fn any_published(&self) -> bool {
        self.rows
            .iter()
            .any(|r| r.status == Some(PublishStatus::Published))
    }
}

/// Partition rows into entity groups.
///
/// Precondition: `rows` is already sorted by common id (the storage layer
/// orders the select accordingly). A single linear pass compares each
/// row's common id against the previous one, starting a new group on
/// change, so the result is stable: rows keep their input order inside
/// each group, and concatenating all groups reconstructs the input.
#[must_use]
pub fn group_rows(rows: Vec<Row>) -> Vec<EntityGroup> {
    let mut groups = Vec::new();
    let mut current: Vec<Row> = Vec::new();

    for row in rows {
        if let Some(prev) = current.last() {
            if prev.common_id != row.common_id {
                groups.push(EntityGroup::new(std::mem::take(&mut current)));
            }
        }
        current.push(row);
    }
    if !current.is_empty() {
        groups.push(EntityGroup::new(current));
    }

    groups
}
