//! Error types for the rowsync CLI.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 4=validation, 6=sync, 7=config, 8=io)

use thiserror::Error;

/// Result type alias for rowsync operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Shell scripts driving the tool match on the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    DatabaseError,

    // Validation (exit 4)
    InvalidFilter,

    // Sync (exit 6)
    RemoteRejected,
    VersionConflict,
    PassFailed,

    // Config (exit 7)
    ConfigError,
    MappingError,
    SchemaNotFound,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::DatabaseError => "DATABASE_ERROR",
            Self::InvalidFilter => "INVALID_FILTER",
            Self::RemoteRejected => "REMOTE_REJECTED",
            Self::VersionConflict => "VERSION_CONFLICT",
            Self::PassFailed => "PASS_FAILED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::MappingError => "MAPPING_ERROR",
            Self::SchemaNotFound => "SCHEMA_NOT_FOUND",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::DatabaseError => 2,
            Self::InvalidFilter => 4,
            Self::RemoteRejected | Self::VersionConflict | Self::PassFailed => 6,
            Self::ConfigError | Self::MappingError | Self::SchemaNotFound => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in rowsync operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Remote store rejected {operation}{}: HTTP {status}: {body}",
        entry_id.as_deref().map(|id| format!(" for entry {id}")).unwrap_or_default())]
    RemoteRejected {
        /// Which client call was rejected (create, update, publish, ...).
        operation: &'static str,
        /// Entry id, when one was known at the time of the call.
        entry_id: Option<String>,
        status: u16,
        body: String,
    },

    #[error("Version conflict on entry {entry_id}: sent version {version}")]
    VersionConflict { entry_id: String, version: String },

    #[error("{failed} of {total} group(s) failed")]
    PassFailed { failed: usize, total: usize },

    #[error("Invalid filter: {0} (expected column=value)")]
    InvalidFilter(String),

    #[error("Remote schema not found: {name}")]
    SchemaNotFound { name: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Mapping error: {0}")]
    Mapping(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::RemoteRejected { .. } => ErrorCode::RemoteRejected,
            Self::VersionConflict { .. } => ErrorCode::VersionConflict,
            Self::PassFailed { .. } => ErrorCode::PassFailed,
            Self::InvalidFilter(_) => ErrorCode::InvalidFilter,
            Self::SchemaNotFound { .. } => ErrorCode::SchemaNotFound,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Mapping(_) => ErrorCode::MappingError,
            Self::Database(_) => ErrorCode::DatabaseError,
            // Transport failures count against the sync category: the pass
            // failed against the remote store, not against local state.
            Self::Http(_) => ErrorCode::RemoteRejected,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }
}
