//! Core error types for dayblocks-core.
//!
//! Every operation returns one of these values instead of aborting the caller.
//! The taxonomy mirrors how a request can fail: bad input, a placement that
//! collides with another block, a reference that no longer exists, or the
//! storage collaborator itself failing.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for dayblocks-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Input rejected before any write
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Overlapping one-off occurrence
    #[error("Conflict: {0}")]
    Conflict(#[from] ConflictError),

    /// Referenced record is missing (or owned by someone else)
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: String },

    /// Storage collaborator failure, surfaced verbatim
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl CoreError {
    pub fn not_found(entity: EntityKind, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Kind of record a [`CoreError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Occurrence,
    Template,
    BacklogItem,
    SubItem,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Occurrence => "Occurrence",
            EntityKind::Template => "Template",
            EntityKind::BacklogItem => "Backlog item",
            EntityKind::SubItem => "Sub-item",
        };
        f.write_str(name)
    }
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Time string is not HH:MM
    #[error("Malformed time '{0}': expected HH:MM between 00:00 and 23:59")]
    MalformedTime(String),

    /// Duration below the configured minimum
    #[error("Duration of {minutes} min is below the minimum of {minimum} min")]
    DurationTooShort { minutes: i32, minimum: i32 },

    /// Duration above one day
    #[error("Duration of {minutes} min exceeds the maximum of {maximum} min")]
    DurationTooLong { minutes: i32, maximum: i32 },

    /// Start time outside the day
    #[error("Start time {0} is outside the day (0..1440 minutes)")]
    StartOutOfDay(i32),

    /// Pinned time outside its block
    #[error("Pinned time {pin} lies outside the block {start}-{end}")]
    PinOutsideBlock { pin: String, start: String, end: String },

    /// Two pinned sub-items overlap
    #[error("Pinned sub-items '{first}' and '{second}' overlap")]
    PinOverlap { first: String, second: String },

    /// Out of bounds
    #[error("Index {index} out of bounds for {collection} (length: {len})")]
    OutOfBounds {
        collection: String,
        index: usize,
        len: usize,
    },

    /// A template with the same title already covers one of these weekdays
    #[error("A recurring block titled '{title}' already repeats on {weekday}")]
    DuplicateSeries { title: String, weekday: String },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Placement conflicts between one-off occurrences.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConflictError {
    #[error("{start}-{end} overlaps '{other_title}' ({other_start}-{other_end}, id {other_id})")]
    Overlap {
        start: String,
        end: String,
        other_id: String,
        other_title: String,
        other_start: String,
        other_end: String,
    },
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A JSON column could not be encoded or decoded
    #[error("Column encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    /// A stored row holds a value the domain cannot represent
    #[error("Corrupt row {id}: {message}")]
    CorruptRow { id: String, message: String },

    /// Owner-scoped write aimed at a row the owner does not have
    #[error("No record {id} for this owner")]
    MissingRecord { id: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseBusy
                    || inner.code == rusqlite::ErrorCode::DatabaseLocked
                {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_entity() {
        let err = CoreError::not_found(EntityKind::BacklogItem, "b-1");
        assert_eq!(err.to_string(), "Backlog item not found: b-1");
    }

    #[test]
    fn validation_wraps_into_core_error() {
        let err: CoreError = ValidationError::DurationTooShort {
            minutes: 2,
            minimum: 5,
        }
        .into();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(err.to_string().contains("below the minimum of 5"));
    }

    #[test]
    fn rusqlite_generic_error_becomes_query_failed() {
        let err: StorageError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, StorageError::QueryFailed(_)));
    }
}
