//! rowsync - reconcile relational table rows with a remote content store.
//!
//! This crate provides the core functionality for the `rowsync` CLI tool:
//! it propagates inserts, field updates, deletions, and publish/unpublish
//! transitions from rows of a local table to entries of a remote versioned
//! content store.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - Run configuration (JSON file + env overrides)
//! - [`mapping`] - Column-to-field mapping file handling
//! - [`model`] - Data types (Row, PublishStatus, EntityGroup)
//! - [`storage`] - SQLite table layer
//! - [`remote`] - Rate-limited remote entry client
//! - [`sync`] - The reconciliation engine
//! - [`error`] - Error types and exit-code mapping

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod mapping;
pub mod model;
pub mod remote;
pub mod storage;
pub mod sync;

pub use error::{Error, Result};
