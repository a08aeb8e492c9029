//! Day-level view of free time between occurrences.

pub mod gap;

pub use gap::{find_day_gaps, DayGap, GapDetector, GapSize, Span};
