//! The reconciliation engine.
//!
//! [`engine::Reconciler`] drives one pass: it selects candidate rows for
//! an [`Operation`], folds them into entity groups, and pushes each group
//! through its state transition against the remote store, writing the
//! resulting entry id / version / status back to the local table.

pub mod engine;

use crate::storage::BaseFilter;

/// The five reconciliation operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Create remote entries for rows without one.
    Insert,
    /// Re-send the full field map for every candidate row.
    Update,
    /// Delete remote entries and clear the local link.
    Delete,
    /// Publish remote entries.
    Publish,
    /// Unpublish remote entries (back to draft).
    Draft,
}

impl Operation {
    /// The operation's candidate predicate on the local table.
    #[must_use]
    pub const fn base_filter(self) -> BaseFilter {
        match self {
            Self::Insert => BaseFilter::EntryIdNull,
            Self::Update => BaseFilter::All,
            Self::Delete | Self::Publish | Self::Draft => BaseFilter::EntryIdNotNull,
        }
    }

    /// Operation name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Publish => "publish",
            Self::Draft => "draft",
        }
    }
}

/// Terminal state of one group within a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The state transition ran and local bookkeeping was updated.
    Applied,
    /// Remote state was already correct; nothing to do.
    Skipped,
}

/// Tally of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Total groups considered.
    pub groups: usize,
    /// Groups whose transition was applied.
    pub applied: usize,
    /// Groups skipped because remote state was already correct.
    pub skipped: usize,
    /// Groups whose remote transition failed.
    pub failed: usize,
    /// Rows hard-deleted by the locale pre-pass.
    pub purged: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_base_filters() {
        assert_eq!(Operation::Insert.base_filter(), BaseFilter::EntryIdNull);
        assert_eq!(Operation::Update.base_filter(), BaseFilter::All);
        assert_eq!(Operation::Delete.base_filter(), BaseFilter::EntryIdNotNull);
        assert_eq!(Operation::Publish.base_filter(), BaseFilter::EntryIdNotNull);
        assert_eq!(Operation::Draft.base_filter(), BaseFilter::EntryIdNotNull);
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::Insert.as_str(), "insert");
        assert_eq!(Operation::Draft.as_str(), "draft");
    }
}
