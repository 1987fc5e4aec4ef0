//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// rowsync - reconcile table rows with a remote content store
#[derive(Parser, Debug)]
#[command(name = "rowsync", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(long, global = true, env = "ROWSYNC_CONFIG", default_value = "rowsync.json")]
    pub config: PathBuf,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Arguments shared by the five reconciliation operations.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Mapping file path (column → remote field)
    pub mapping_file: PathBuf,

    /// Narrow candidates with a column=value equality filter
    #[arg(long, value_name = "COLUMN=VALUE")]
    pub filter: Option<String>,

    /// Hard-delete rows of this locale before the pass
    #[arg(long, value_name = "LOCALE")]
    pub purge_locale: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create remote entries for rows without one
    Insert(RunArgs),

    /// Re-send the full field map for every candidate row
    Update(RunArgs),

    /// Delete remote entries and clear the local link
    Delete(RunArgs),

    /// Publish remote entries
    Publish(RunArgs),

    /// Unpublish remote entries (back to draft)
    Draft(RunArgs),

    /// Generate a stub mapping file from the table and remote schema
    Map {
        /// Where to write the stub mapping file
        mapping_file: PathBuf,
    },
}
