//! Remote content store access.
//!
//! [`EntryClient`] wraps the store's management API; every call first
//! acquires admission from the shared [`RateLimiter`] so the configured
//! request rate is never exceeded, regardless of how many groups are in
//! flight.

mod client;
mod limiter;
mod types;

pub use client::EntryClient;
pub use limiter::RateLimiter;
pub use types::{EntryList, EntrySys, FieldMap, RemoteEntry, SchemaField, SCHEMA_HEADER, VERSION_HEADER};
