//! Persistence interface and its implementations.
//!
//! The core talks to storage only through [`OccurrenceStore`] and
//! [`BacklogStore`]. Every call carries the owner id, and implementations
//! never return or touch rows belonging to another owner.

mod config;
pub mod memory;
pub mod migrations;
pub mod sqlite;

pub use config::{AppearanceConfig, Config, PlannerConfig};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::backlog::BacklogItem;
use crate::block::Occurrence;
use crate::error::{ConfigError, StorageError};

/// Row selection for [`OccurrenceStore::query_occurrences`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OccurrenceFilter {
    /// One-off occurrences on exactly this date
    OneOffOn(NaiveDate),
    /// Every template
    Templates,
    /// One-off occurrences forked from this template
    ForkedFrom(String),
}

impl OccurrenceFilter {
    pub fn matches(&self, occurrence: &Occurrence) -> bool {
        match self {
            Self::OneOffOn(date) => !occurrence.is_template() && occurrence.date == *date,
            Self::Templates => occurrence.is_template(),
            Self::ForkedFrom(template_id) => occurrence.forked_from() == Some(template_id.as_str()),
        }
    }
}

/// Row selection for [`BacklogStore::list_backlog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BacklogFilter {
    Pending,
    All,
}

/// Owner-scoped key-value access to occurrences.
pub trait OccurrenceStore {
    fn get_occurrence(&self, owner_id: &str, id: &str) -> Result<Option<Occurrence>, StorageError>;

    /// Matching rows ordered by start time.
    fn query_occurrences(
        &self,
        owner_id: &str,
        filter: &OccurrenceFilter,
    ) -> Result<Vec<Occurrence>, StorageError>;

    fn insert_occurrence(&mut self, occurrence: &Occurrence) -> Result<String, StorageError>;

    /// Replace a row the owner already has.
    fn update_occurrence(&mut self, occurrence: &Occurrence) -> Result<(), StorageError>;

    fn delete_occurrence(&mut self, owner_id: &str, id: &str) -> Result<(), StorageError>;
}

/// Owner-scoped key-value access to backlog items.
pub trait BacklogStore {
    fn get_backlog_item(&self, owner_id: &str, id: &str) -> Result<Option<BacklogItem>, StorageError>;

    /// Matching rows ordered by creation time.
    fn list_backlog(&self, owner_id: &str, filter: BacklogFilter) -> Result<Vec<BacklogItem>, StorageError>;

    fn insert_backlog_item(&mut self, item: &BacklogItem) -> Result<String, StorageError>;

    /// Replace a row the owner already has.
    fn update_backlog_item(&mut self, item: &BacklogItem) -> Result<(), StorageError>;

    fn delete_backlog_item(&mut self, owner_id: &str, id: &str) -> Result<(), StorageError>;
}

/// Returns the data directory, creating it if needed.
///
/// `DAYBLOCKS_DATA_DIR` wins outright. Otherwise `~/.config/dayblocks/`, or
/// `~/.config/dayblocks-dev/` when `DAYBLOCKS_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("DAYBLOCKS_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("DAYBLOCKS_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("dayblocks-dev")
            } else {
                base_dir.join("dayblocks")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
