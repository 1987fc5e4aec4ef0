//! SQLite access to the reconciled table.
//!
//! Column names come from the configuration, so every statement is built
//! from quoted identifiers with values bound as parameters. The select is
//! ordered by common id, which is the precondition of the grouper.

use crate::config::{Columns, Config};
use crate::error::{Error, Result};
use crate::model::{PublishStatus, Row};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Operation-specific base predicate for candidate selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseFilter {
    /// Rows not yet linked to a remote entry (insert candidates).
    EntryIdNull,
    /// Rows already linked (delete/publish/draft candidates).
    EntryIdNotNull,
    /// Every row (update candidates).
    All,
}

/// Caller-supplied `column=value` equality filter, ANDed with the base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFilter {
    pub column: String,
    pub value: String,
}

impl ColumnFilter {
    /// Parse a `column=value` string.
    ///
    /// The column must be a bare identifier; the value is bound as a SQL
    /// parameter and may contain anything.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidFilter` when the string has no `=` or the
    /// column name is not a valid identifier.
    pub fn parse(raw: &str) -> Result<Self> {
        let (column, value) = raw
            .split_once('=')
            .ok_or_else(|| Error::InvalidFilter(raw.to_string()))?;
        if !is_identifier(column) {
            return Err(Error::InvalidFilter(raw.to_string()));
        }
        Ok(Self {
            column: column.to_string(),
            value: value.to_string(),
        })
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Double-quote an identifier for use in SQL text.
fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// One column as reported by the table schema, for mapping generation.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

/// SQLite-backed access to the reconciled table.
#[derive(Debug)]
pub struct SyncTable {
    conn: Connection,
    table: String,
    columns: Columns,
}

impl SyncTable {
    /// Open the database named in the configuration.
    ///
    /// # Errors
    ///
    /// Returns a database error if the file cannot be opened.
    pub fn open(config: &Config) -> Result<Self> {
        let conn = Connection::open(&config.database)?;
        Ok(Self {
            conn,
            table: config.table.clone(),
            columns: config.columns.clone(),
        })
    }

    /// Open an existing connection (used by tests with temp databases).
    #[must_use]
    pub fn from_connection(conn: Connection, config: &Config) -> Self {
        Self {
            conn,
            table: config.table.clone(),
            columns: config.columns.clone(),
        }
    }

    fn where_clause(&self, base: BaseFilter, filter: Option<&ColumnFilter>) -> String {
        let entry_id = quote(&self.columns.entry_id);
        let base_sql = match base {
            BaseFilter::EntryIdNull => Some(format!("{entry_id} IS NULL")),
            BaseFilter::EntryIdNotNull => Some(format!("{entry_id} IS NOT NULL")),
            BaseFilter::All => None,
        };
        let filter_sql = filter.map(|f| format!("{} = ?1", quote(&f.column)));

        match (base_sql, filter_sql) {
            (Some(b), Some(f)) => format!(" WHERE {f} AND {b}"),
            (Some(b), None) => format!(" WHERE {b}"),
            (None, Some(f)) => format!(" WHERE {f}"),
            (None, None) => String::new(),
        }
    }

    /// Select candidate rows, ordered by common id then primary key.
    ///
    /// # Errors
    ///
    /// Returns a database error on query failure, or `Error::Config`
    /// when a bookkeeping column is missing from the result set.
    pub fn load_rows(
        &self,
        base: BaseFilter,
        filter: Option<&ColumnFilter>,
    ) -> Result<Vec<Row>> {
        let sql = format!(
            "SELECT * FROM {}{} ORDER BY {}, {}",
            quote(&self.table),
            self.where_clause(base, filter),
            quote(&self.columns.common_id),
            quote(&self.columns.id),
        );
        tracing::debug!(%sql, "loading candidate rows");

        let mut stmt = self.conn.prepare(&sql)?;
        let names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(ToString::to_string)
            .collect();

        let mut rows_out = Vec::new();
        let mut db_rows = match filter {
            Some(f) => stmt.query(rusqlite::params![f.value])?,
            None => stmt.query([])?,
        };
        while let Some(db_row) = db_rows.next()? {
            rows_out.push(self.extract_row(db_row, &names)?);
        }
        Ok(rows_out)
    }

    fn extract_row(&self, db_row: &rusqlite::Row<'_>, names: &[String]) -> Result<Row> {
        let mut pk = None;
        let mut common_id = Value::Null;
        let mut entry_id = None;
        let mut entry_version = None;
        let mut status = None;
        let mut locale = String::new();
        let mut content = BTreeMap::new();

        for (idx, name) in names.iter().enumerate() {
            let value = json_value(db_row.get_ref(idx)?);
            if name == &self.columns.id {
                pk = value.as_i64();
            } else if name == &self.columns.common_id {
                common_id = value;
            } else if name == &self.columns.entry_id {
                entry_id = value.as_str().map(ToString::to_string);
            } else if name == &self.columns.entry_version {
                entry_version = scalar_to_string(&value);
            } else if name == &self.columns.status {
                status = value.as_str().and_then(PublishStatus::parse);
            } else if name == &self.columns.locale {
                locale = value.as_str().unwrap_or_default().to_string();
            } else {
                content.insert(name.clone(), value);
            }
        }

        let pk = pk.ok_or_else(|| {
            Error::Config(format!(
                "table {} has no integer column {}",
                self.table, self.columns.id
            ))
        })?;

        Ok(Row {
            pk,
            common_id,
            entry_id,
            entry_version,
            status,
            locale,
            content,
        })
    }

    /// Hard-delete rows of one locale matching the candidate predicate.
    ///
    /// Runs before the main pass when `--purge-locale` is given.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub fn purge_locale(
        &self,
        base: BaseFilter,
        filter: Option<&ColumnFilter>,
        locale: &str,
    ) -> Result<usize> {
        let mut sql = format!(
            "DELETE FROM {}{}",
            quote(&self.table),
            self.where_clause(base, filter),
        );
        // The locale placeholder index depends on whether the filter value
        // is also bound, not on whether the base predicate added a WHERE.
        let locale_cond = format!(
            "{} = {}",
            quote(&self.columns.locale),
            if filter.is_some() { "?2" } else { "?1" },
        );
        if sql.contains(" WHERE ") {
            sql.push_str(&format!(" AND {locale_cond}"));
        } else {
            sql.push_str(&format!(" WHERE {locale_cond}"));
        }

        let count = match filter {
            Some(f) => self.conn.execute(&sql, rusqlite::params![f.value, locale])?,
            None => self.conn.execute(&sql, rusqlite::params![locale])?,
        };
        Ok(count)
    }

    /// Persist the remote entry id and version for one row.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub fn write_remote_link(&self, pk: i64, entry_id: &str, version: &str) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET {} = ?1, {} = ?2 WHERE {} = ?3",
            quote(&self.table),
            quote(&self.columns.entry_id),
            quote(&self.columns.entry_version),
            quote(&self.columns.id),
        );
        self.conn
            .execute(&sql, rusqlite::params![entry_id, version, pk])?;
        Ok(())
    }

    /// Null out the remote entry id and version for one row (after delete).
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub fn clear_remote_link(&self, pk: i64) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET {} = NULL, {} = NULL WHERE {} = ?1",
            quote(&self.table),
            quote(&self.columns.entry_id),
            quote(&self.columns.entry_version),
            quote(&self.columns.id),
        );
        self.conn.execute(&sql, rusqlite::params![pk])?;
        Ok(())
    }

    /// Persist a new version and publication status for one row.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub fn write_status(&self, pk: i64, version: &str, status: PublishStatus) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET {} = ?1, {} = ?2 WHERE {} = ?3",
            quote(&self.table),
            quote(&self.columns.entry_version),
            quote(&self.columns.status),
            quote(&self.columns.id),
        );
        self.conn
            .execute(&sql, rusqlite::params![version, status.as_str(), pk])?;
        Ok(())
    }

    /// List the table's columns, for mapping-file generation.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub fn table_columns(&self) -> Result<Vec<ColumnInfo>> {
        let sql = format!("PRAGMA table_info({})", quote(&self.table));
        let mut stmt = self.conn.prepare(&sql)?;
        let columns = stmt
            .query_map([], |row| {
                Ok(ColumnInfo {
                    name: row.get(1)?,
                    data_type: row.get(2)?,
                    nullable: !row.get::<_, bool>(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(columns)
    }
}

/// Convert a SQLite value to JSON. Blobs have no mapped-field meaning and
/// come through as null.
fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
    }
}

/// Version columns may be TEXT or INTEGER; either way the engine carries
/// the token as a string.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;

    fn test_table() -> SyncTable {
        let config = Config::default();
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE item_tab (
                id INTEGER PRIMARY KEY,
                common_id INTEGER,
                entry_id TEXT,
                entry_version TEXT,
                content_status TEXT,
                content_locale TEXT,
                title TEXT,
                body TEXT
            );",
        )
        .unwrap();
        SyncTable::from_connection(conn, &config)
    }

    fn seed(table: &SyncTable) {
        table
            .conn
            .execute_batch(
                "INSERT INTO item_tab VALUES
                    (1, 10, NULL, NULL, 'Draft', 'en-US', 'Hello', 'Body en'),
                    (2, 10, NULL, NULL, 'Draft', 'de-DE', 'Hallo', 'Body de'),
                    (3, 11, 'e9', '4', 'Published', 'en-US', 'Other', 'Body');",
            )
            .unwrap();
    }

    #[test]
    fn test_column_filter_parse() {
        let filter = ColumnFilter::parse("content_locale=de-DE").unwrap();
        assert_eq!(filter.column, "content_locale");
        assert_eq!(filter.value, "de-DE");

        assert!(ColumnFilter::parse("no-equals").is_err());
        assert!(ColumnFilter::parse("1bad=x").is_err());
        assert!(ColumnFilter::parse("drop table;=x").is_err());
        // values may contain '=' and anything else
        let filter = ColumnFilter::parse("title=a=b").unwrap();
        assert_eq!(filter.value, "a=b");
    }

    #[test]
    fn test_load_rows_insert_candidates() {
        let table = test_table();
        seed(&table);

        let rows = table.load_rows(BaseFilter::EntryIdNull, None).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].pk, 1);
        assert_eq!(rows[0].common_id, json!(10));
        assert_eq!(rows[0].locale, "en-US");
        assert_eq!(rows[0].status, Some(PublishStatus::Draft));
        assert_eq!(rows[0].content.get("title"), Some(&json!("Hello")));
        assert!(!rows[0].content.contains_key("entry_id"));
    }

    #[test]
    fn test_load_rows_linked_candidates_and_filter() {
        let table = test_table();
        seed(&table);

        let rows = table.load_rows(BaseFilter::EntryIdNotNull, None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entry_id.as_deref(), Some("e9"));
        assert_eq!(rows[0].entry_version.as_deref(), Some("4"));

        let filter = ColumnFilter::parse("content_locale=de-DE").unwrap();
        let rows = table.load_rows(BaseFilter::All, Some(&filter)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pk, 2);
    }

    #[test]
    fn test_write_backs() {
        let table = test_table();
        seed(&table);

        table.write_remote_link(1, "e100", "1").unwrap();
        let rows = table.load_rows(BaseFilter::EntryIdNotNull, None).unwrap();
        assert!(rows.iter().any(|r| r.pk == 1 && r.entry_id.as_deref() == Some("e100")));

        table.write_status(1, "2", PublishStatus::Published).unwrap();
        let rows = table.load_rows(BaseFilter::EntryIdNotNull, None).unwrap();
        let row = rows.iter().find(|r| r.pk == 1).unwrap();
        assert_eq!(row.entry_version.as_deref(), Some("2"));
        assert_eq!(row.status, Some(PublishStatus::Published));

        table.clear_remote_link(1).unwrap();
        let rows = table.load_rows(BaseFilter::EntryIdNull, None).unwrap();
        assert!(rows.iter().any(|r| r.pk == 1));
    }

    #[test]
    fn test_purge_locale() {
        let table = test_table();
        seed(&table);

        let purged = table.purge_locale(BaseFilter::All, None, "de-DE").unwrap();
        assert_eq!(purged, 1);
        let rows = table.load_rows(BaseFilter::All, None).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.locale != "de-DE"));
    }

    #[test]
    fn test_purge_locale_with_base_filter_only() {
        let table = test_table();
        seed(&table);
        table
            .conn
            .execute_batch(
                "INSERT INTO item_tab VALUES
                    (4, 11, 'e9', '4', 'Published', 'de-DE', 'Andere', 'Body');",
            )
            .unwrap();

        // base predicate adds a WHERE but binds nothing; the locale is ?1
        let purged = table
            .purge_locale(BaseFilter::EntryIdNotNull, None, "de-DE")
            .unwrap();
        assert_eq!(purged, 1);

        let rows = table.load_rows(BaseFilter::All, None).unwrap();
        assert!(rows.iter().all(|r| r.pk != 4));
        // the unlinked de-DE row is not a candidate and survives
        assert!(rows.iter().any(|r| r.pk == 2));
    }

    #[test]
    fn test_purge_locale_with_caller_filter() {
        let table = test_table();
        seed(&table);

        let filter = ColumnFilter::parse("common_id=10").unwrap();
        let purged = table
            .purge_locale(BaseFilter::All, Some(&filter), "de-DE")
            .unwrap();
        assert_eq!(purged, 1);

        let rows = table.load_rows(BaseFilter::All, None).unwrap();
        assert!(rows.iter().all(|r| r.pk != 2));
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_table_columns() {
        let table = test_table();
        let columns = table.table_columns().unwrap();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"title"));
        assert!(names.contains(&"entry_version"));
    }
}
