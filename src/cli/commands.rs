//! Command handlers.
//!
//! Each handler wires the configuration, mapping, local table, and remote
//! client together and reports a one-line summary on stdout. Failure
//! details go to the log; exit codes come from the error category.

use crate::cli::RunArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::mapping::MappingFile;
use crate::remote::{EntryClient, RateLimiter};
use crate::storage::{ColumnFilter, SyncTable};
use crate::sync::engine::Reconciler;
use crate::sync::Operation;
use std::path::Path;
use std::sync::Arc;

/// Run one reconciliation pass.
///
/// # Errors
///
/// Returns the first local failure, or `Error::PassFailed` when one or
/// more groups failed remotely.
pub async fn run_operation(operation: Operation, args: &RunArgs, config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let mapping = MappingFile::load(&args.mapping_file)?.field_mapping()?;
    let filter = args
        .filter
        .as_deref()
        .map(ColumnFilter::parse)
        .transpose()?;

    let table = SyncTable::open(&config)?;
    let limiter = Arc::new(RateLimiter::new(&config.remote.rate_limit));
    let client = EntryClient::new(&config.remote, limiter);
    let engine = Reconciler::new(table, client, mapping, config.remote.common_id_field.clone());

    let stats = engine
        .run(operation, filter.as_ref(), args.purge_locale.as_deref())
        .await?;

    println!(
        "{}: {} group(s) - {} applied, {} skipped, {} failed",
        operation.as_str(),
        stats.groups,
        stats.applied,
        stats.skipped,
        stats.failed
    );
    if stats.purged > 0 {
        println!("purged {} row(s) before the pass", stats.purged);
    }

    if stats.failed > 0 {
        return Err(Error::PassFailed {
            failed: stats.failed,
            total: stats.groups,
        });
    }
    Ok(())
}

/// Generate a stub mapping file.
///
/// Reads the table's column list, fetches the remote schema's fields, and
/// writes `{ table_columns, remote_fields, mapping }` with empty field
/// names for the operator to fill in.
///
/// # Errors
///
/// Returns a database, remote, or IO error on failure.
pub async fn generate_map(mapping_file: &Path, config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;

    let table = SyncTable::open(&config)?;
    let columns = table.table_columns()?;
    if columns.is_empty() {
        return Err(Error::Config(format!(
            "table {} does not exist or has no columns",
            config.table
        )));
    }

    let limiter = Arc::new(RateLimiter::new(&config.remote.rate_limit));
    let client = EntryClient::new(&config.remote, limiter);
    let fields = client.schema_fields(&config.remote.schema_name).await?;

    let stub = MappingFile::stub(columns, fields, &config.bookkeeping_columns());
    stub.write(mapping_file)?;

    println!(
        "wrote mapping stub with {} column(s) to {}",
        stub.mapping.len(),
        mapping_file.display()
    );
    Ok(())
}
