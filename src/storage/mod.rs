//! Local store access.
//!
//! The engine talks to a single SQLite table through [`SyncTable`]:
//! one filtered select per pass, per-row write-backs of the remote
//! bookkeeping columns, and a column listing for mapping generation.

mod table;

pub use table::{BaseFilter, ColumnFilter, ColumnInfo, SyncTable};
