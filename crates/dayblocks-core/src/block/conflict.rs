//! Overlap checks between one-off occurrences on the same date.
//!
//! Recurring occurrences are not checked, neither against each other nor
//! against one-offs.

use chrono::NaiveDate;
use tracing::warn;

use super::model::Occurrence;
use crate::error::{ConflictError, Result};
use crate::storage::{OccurrenceFilter, OccurrenceStore};
use crate::time::format_hhmm;

/// Half-open intervals `[a_start, a_start + a_duration)` and
/// `[b_start, b_start + b_duration)` intersect.
pub fn overlaps(a_start: i32, a_duration: i32, b_start: i32, b_duration: i32) -> bool {
    a_start < b_start + b_duration && a_start + a_duration > b_start
}

/// First occurrence in `others` overlapping the candidate interval, skipping
/// `exclude_id`.
pub fn find_conflict<'a>(
    others: &'a [Occurrence],
    start: i32,
    duration: i32,
    exclude_id: Option<&str>,
) -> Option<&'a Occurrence> {
    others
        .iter()
        .filter(|o| Some(o.id.as_str()) != exclude_id)
        .find(|o| overlaps(start, duration, o.start_time, o.total_duration))
}

/// Whether a one-off at `start` for `duration` minutes would collide with
/// another one-off the owner has on `date`.
pub fn has_conflict<S: OccurrenceStore + ?Sized>(
    store: &S,
    owner_id: &str,
    date: NaiveDate,
    start: i32,
    duration: i32,
    exclude_id: Option<&str>,
) -> Result<bool> {
    let others = store.query_occurrences(owner_id, &OccurrenceFilter::OneOffOn(date))?;
    Ok(find_conflict(&others, start, duration, exclude_id).is_some())
}

/// Like [`has_conflict`], but fails with a [`ConflictError`] naming the
/// occurrence in the way.
pub fn ensure_no_conflict<S: OccurrenceStore + ?Sized>(
    store: &S,
    owner_id: &str,
    date: NaiveDate,
    start: i32,
    duration: i32,
    exclude_id: Option<&str>,
) -> Result<()> {
    let others = store.query_occurrences(owner_id, &OccurrenceFilter::OneOffOn(date))?;
    if let Some(other) = find_conflict(&others, start, duration, exclude_id) {
        warn!(
            %date,
            start = %format_hhmm(start),
            other_id = %other.id,
            "rejected overlapping placement"
        );
        return Err(ConflictError::Overlap {
            start: format_hhmm(start),
            end: format_hhmm(start + duration),
            other_id: other.id.clone(),
            other_title: other.title.clone(),
            other_start: format_hhmm(other.start_time),
            other_end: format_hhmm(other.end_time()),
        }
        .into());
    }
    Ok(())
}
