//! # Dayblocks Core Library
//!
//! This library provides the core logic for Dayblocks, a planner that lays a
//! day out as non-overlapping time blocks. Blocks are one-off or recurring,
//! and each holds an ordered list of sub-items, some pinned to a clock time.
//! The CLI is a thin layer over the same library.
//!
//! ## Architecture
//!
//! - **Recurrence**: templates are expanded per date into virtual occurrences;
//!   writes fork them into concrete rows (copy-on-write)
//! - **Layout**: greedy leftmost-fit placement of floating sub-items around
//!   pinned ones, with gap and overflow annotations
//! - **Backlog**: pending work and a best-fit heuristic matching it to free time
//! - **Storage**: owner-scoped store traits, SQLite and in-memory stores, and
//!   TOML-based configuration
//!
//! ## Key Components
//!
//! - [`DayPlanner`]: Every user intent as one call
//! - [`ForkingEngine`]: Copy-on-write writes against occurrences
//! - [`SqliteStore`]: Occurrence and backlog persistence
//! - [`Config`]: Application configuration management

pub mod backlog;
pub mod block;
pub mod error;
pub mod gesture;
pub mod planner;
pub mod storage;
pub mod time;
pub mod timeline;

pub use backlog::{BacklogItem, Priority, Suggestion, SuggestionMode};
pub use block::{
    BlockLayout, BlockStatus, Cadence, DeleteOutcome, ForkingEngine, MutationOutcome, MutationScope,
    Occurrence, OccurrenceDraft, OccurrencePatch, OccurrenceRef, ResolvedOccurrence, SubItem,
    SubItemOp,
};
pub use error::{ConfigError, ConflictError, CoreError, EntityKind, StorageError, ValidationError};
pub use planner::{BacklogDraft, DayPlan, DayPlanner, DetachOutcome, PlannedGap, PlannedOccurrence};
pub use storage::{BacklogFilter, BacklogStore, Config, MemoryStore, OccurrenceStore, SqliteStore};
pub use timeline::DayGap;
