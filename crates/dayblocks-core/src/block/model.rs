//! Occurrence and sub-item types.
//!
//! An [`Occurrence`] is either a one-off block on a single date or a
//! recurring template. Templates are never shown directly; the resolver
//! projects them onto matching dates.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::time::{format_hhmm, is_within_day, MAX_DURATION_MINUTES};

/// Block type used when no specific type was chosen.
pub const GENERAL_BLOCK_TYPE: &str = "general";

/// Completion state of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlockStatus {
    #[default]
    Pending,
    Completed,
}

impl BlockStatus {
    pub fn toggled(self) -> Self {
        match self {
            Self::Pending => Self::Completed,
            Self::Completed => Self::Pending,
        }
    }
}

/// How a template repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    /// Same weekday as the anchor date, every week
    Weekly,
    /// Every Monday through Friday (legacy bulk form)
    WeekdaySeries,
}

/// Recurrence rule of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub cadence: Cadence,
    /// Reference date; always equal to the owning template's `date`
    pub anchor_date: NaiveDate,
}

/// One-off block or recurring template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OccurrenceKind {
    OneOff {
        /// Template this block was forked from, if any
        #[serde(default)]
        forked_from: Option<String>,
    },
    Template {
        rule: RecurrenceRule,
        /// Dates that are forked or suppressed
        #[serde(default)]
        exception_dates: BTreeSet<NaiveDate>,
    },
}

impl OccurrenceKind {
    pub fn one_off() -> Self {
        Self::OneOff { forked_from: None }
    }

    pub fn template(cadence: Cadence, anchor_date: NaiveDate) -> Self {
        Self::Template {
            rule: RecurrenceRule {
                cadence,
                anchor_date,
            },
            exception_dates: BTreeSet::new(),
        }
    }
}

/// Where a sub-item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubItemOrigin {
    #[default]
    Fixed,
    FromBacklog,
}

/// Link from a sub-item back to the backlog item it was taken from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogRef {
    pub item_id: String,
    /// Index of the backlog sub-item when only a split was assigned
    #[serde(default)]
    pub nested_index: Option<usize>,
}

/// Checklist entry nested inside a sub-item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedSubItem {
    pub title: String,
    pub duration: i32,
    #[serde(default)]
    pub done: bool,
}

/// A task inside a block, optionally pinned to a clock time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubItem {
    pub title: String,
    pub duration: i32,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub pinned_time: Option<i32>,
    #[serde(default)]
    pub origin: SubItemOrigin,
    #[serde(default)]
    pub backlog_ref: Option<BacklogRef>,
    #[serde(default)]
    pub nested: Vec<NestedSubItem>,
}

impl SubItem {
    /// Floating, fixed-origin sub-item.
    pub fn new(title: impl Into<String>, duration: i32) -> Self {
        Self {
            title: title.into(),
            duration,
            done: false,
            pinned_time: None,
            origin: SubItemOrigin::Fixed,
            backlog_ref: None,
            nested: Vec::new(),
        }
    }

    pub fn pinned_at(mut self, minute_of_day: i32) -> Self {
        self.pinned_time = Some(minute_of_day);
        self
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned_time.is_some()
    }
}

/// A scheduled block: a one-off occurrence or a recurring template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    /// Calendar day for one-offs; anchor date for templates
    pub date: NaiveDate,
    /// Minutes since midnight
    pub start_time: i32,
    pub total_duration: i32,
    pub color: String,
    pub icon: String,
    #[serde(default = "default_block_type")]
    pub block_type: String,
    #[serde(default)]
    pub status: BlockStatus,
    #[serde(flatten)]
    pub kind: OccurrenceKind,
    #[serde(default)]
    pub sub_items: Vec<SubItem>,
}

fn default_block_type() -> String {
    GENERAL_BLOCK_TYPE.to_string()
}

/// Limits applied when validating an occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRules {
    pub min_block_minutes: i32,
    pub min_sub_item_minutes: i32,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            min_block_minutes: 5,
            min_sub_item_minutes: 1,
        }
    }
}

impl Occurrence {
    /// End of the block in minutes since midnight (may exceed 1440).
    pub fn end_time(&self) -> i32 {
        self.start_time + self.total_duration
    }

    pub fn is_template(&self) -> bool {
        matches!(self.kind, OccurrenceKind::Template { .. })
    }

    pub fn rule(&self) -> Option<&RecurrenceRule> {
        match &self.kind {
            OccurrenceKind::Template { rule, .. } => Some(rule),
            OccurrenceKind::OneOff { .. } => None,
        }
    }

    pub fn exception_dates(&self) -> Option<&BTreeSet<NaiveDate>> {
        match &self.kind {
            OccurrenceKind::Template {
                exception_dates, ..
            } => Some(exception_dates),
            OccurrenceKind::OneOff { .. } => None,
        }
    }

    pub fn forked_from(&self) -> Option<&str> {
        match &self.kind {
            OccurrenceKind::OneOff { forked_from } => forked_from.as_deref(),
            OccurrenceKind::Template { .. } => None,
        }
    }

    /// Record `date` as an exception. Returns `false` if it was already
    /// recorded or this is not a template.
    pub fn add_exception(&mut self, date: NaiveDate) -> bool {
        match &mut self.kind {
            OccurrenceKind::Template {
                exception_dates, ..
            } => exception_dates.insert(date),
            OccurrenceKind::OneOff { .. } => false,
        }
    }

    /// Read-only projection of this template onto `date`.
    pub fn project_onto(&self, date: NaiveDate) -> Occurrence {
        let mut projection = self.clone();
        projection.date = date;
        projection
    }

    /// Concrete one-off copy of this template for `date`, under a fresh id.
    pub fn fork_for(&self, date: NaiveDate, new_id: String) -> Occurrence {
        let mut fork = self.clone();
        fork.id = new_id;
        fork.date = date;
        fork.kind = OccurrenceKind::OneOff {
            forked_from: Some(self.id.clone()),
        };
        fork
    }

    /// Check field ranges and the pin invariants.
    pub fn validate(&self, rules: &ValidationRules) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "title".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if !is_within_day(self.start_time) {
            return Err(ValidationError::StartOutOfDay(self.start_time));
        }
        if self.total_duration < rules.min_block_minutes {
            return Err(ValidationError::DurationTooShort {
                minutes: self.total_duration,
                minimum: rules.min_block_minutes,
            });
        }
        check_max_duration(self.total_duration)?;

        for item in &self.sub_items {
            if item.duration < rules.min_sub_item_minutes {
                return Err(ValidationError::DurationTooShort {
                    minutes: item.duration,
                    minimum: rules.min_sub_item_minutes,
                });
            }
            check_max_duration(item.duration)?;
            if let Some(pin) = item.pinned_time {
                if pin < self.start_time || pin > self.end_time() {
                    return Err(ValidationError::PinOutsideBlock {
                        pin: format_hhmm(pin),
                        start: format_hhmm(self.start_time),
                        end: format_hhmm(self.end_time()),
                    });
                }
            }
        }

        let mut pinned: Vec<&SubItem> = self.sub_items.iter().filter(|s| s.is_pinned()).collect();
        pinned.sort_by_key(|s| s.pinned_time);
        for pair in pinned.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let a_start = a.pinned_time.unwrap_or_default();
            let b_start = b.pinned_time.unwrap_or_default();
            if b_start < a_start + a.duration {
                return Err(ValidationError::PinOverlap {
                    first: a.title.clone(),
                    second: b.title.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Reject durations longer than [`MAX_DURATION_MINUTES`].
pub fn check_max_duration(minutes: i32) -> Result<(), ValidationError> {
    if minutes > MAX_DURATION_MINUTES {
        return Err(ValidationError::DurationTooLong {
            minutes,
            maximum: MAX_DURATION_MINUTES,
        });
    }
    Ok(())
}

/// Fields for a new block.
#[derive(Debug, Clone, Default)]
pub struct OccurrenceDraft {
    pub title: String,
    pub date: Option<NaiveDate>,
    pub start_time: i32,
    pub total_duration: i32,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub block_type: Option<String>,
    pub sub_items: Vec<SubItem>,
}

/// Partial update of an occurrence. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrencePatch {
    pub title: Option<String>,
    pub start_time: Option<i32>,
    pub total_duration: Option<i32>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub block_type: Option<String>,
    pub status: Option<BlockStatus>,
    pub sub_items: Option<Vec<SubItem>>,
}

impl OccurrencePatch {
    pub fn start_time(minute_of_day: i32) -> Self {
        Self {
            start_time: Some(minute_of_day),
            ..Self::default()
        }
    }

    pub fn total_duration(minutes: i32) -> Self {
        Self {
            total_duration: Some(minutes),
            ..Self::default()
        }
    }

    pub fn status(status: BlockStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn sub_items(items: Vec<SubItem>) -> Self {
        Self {
            sub_items: Some(items),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether applying this patch can change the block's interval.
    pub fn moves_interval(&self) -> bool {
        self.start_time.is_some() || self.total_duration.is_some()
    }

    /// Apply onto `target`.
    ///
    /// When the start time changes and the patch carries no sub-item list of
    /// its own, pinned sub-items move with the block.
    pub fn apply(&self, target: &mut Occurrence) {
        if let Some(title) = &self.title {
            target.title = title.clone();
        }
        if let Some(start) = self.start_time {
            let shift = start - target.start_time;
            target.start_time = start;
            if self.sub_items.is_none() && shift != 0 {
                for item in &mut target.sub_items {
                    if let Some(pin) = item.pinned_time.as_mut() {
                        *pin += shift;
                    }
                }
            }
        }
        if let Some(duration) = self.total_duration {
            target.total_duration = duration;
        }
        if let Some(color) = &self.color {
            target.color = color.clone();
        }
        if let Some(icon) = &self.icon {
            target.icon = icon.clone();
        }
        if let Some(block_type) = &self.block_type {
            target.block_type = block_type.clone();
        }
        if let Some(status) = self.status {
            target.status = status;
        }
        if let Some(items) = &self.sub_items {
            target.sub_items = items.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(start: i32, duration: i32) -> Occurrence {
        Occurrence {
            id: "b-1".to_string(),
            owner_id: "owner".to_string(),
            title: "Deep work".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            start_time: start,
            total_duration: duration,
            color: "#000".to_string(),
            icon: "clock".to_string(),
            block_type: GENERAL_BLOCK_TYPE.to_string(),
            status: BlockStatus::Pending,
            kind: OccurrenceKind::one_off(),
            sub_items: Vec::new(),
        }
    }

    #[test]
    fn validate_accepts_pin_on_block_edges() {
        let mut b = block(540, 60);
        b.sub_items = vec![SubItem::new("a", 10).pinned_at(540), SubItem::new("b", 0).pinned_at(600)];
        let rules = ValidationRules {
            min_sub_item_minutes: 0,
            ..ValidationRules::default()
        };
        assert!(b.validate(&rules).is_ok());
    }

    #[test]
    fn validate_rejects_pin_outside_block() {
        let mut b = block(540, 60);
        b.sub_items = vec![SubItem::new("late", 10).pinned_at(601)];
        assert!(matches!(
            b.validate(&ValidationRules::default()),
            Err(ValidationError::PinOutsideBlock { .. })
        ));
    }

    #[test]
    fn validate_rejects_overlapping_pins() {
        let mut b = block(540, 60);
        b.sub_items = vec![
            SubItem::new("a", 20).pinned_at(550),
            SubItem::new("b", 10).pinned_at(560),
        ];
        assert!(matches!(
            b.validate(&ValidationRules::default()),
            Err(ValidationError::PinOverlap { .. })
        ));
    }

    #[test]
    fn validate_rejects_short_block_and_bad_start() {
        assert!(matches!(
            block(540, 3).validate(&ValidationRules::default()),
            Err(ValidationError::DurationTooShort { minutes: 3, minimum: 5 })
        ));
        assert!(matches!(
            block(1440, 30).validate(&ValidationRules::default()),
            Err(ValidationError::StartOutOfDay(1440))
        ));
    }

    #[test]
    fn validate_caps_block_and_sub_item_length() {
        let rules = ValidationRules::default();
        assert!(block(1380, MAX_DURATION_MINUTES).validate(&rules).is_ok());
        assert!(matches!(
            block(600, i32::MAX).validate(&rules),
            Err(ValidationError::DurationTooLong { minutes: i32::MAX, maximum: 1440 })
        ));

        let mut b = block(540, 60);
        b.sub_items = vec![SubItem::new("endless", i32::MAX).pinned_at(540)];
        assert!(matches!(
            b.validate(&rules),
            Err(ValidationError::DurationTooLong { .. })
        ));
    }

    #[test]
    fn moving_start_shifts_pins() {
        let mut b = block(540, 60);
        b.sub_items = vec![SubItem::new("a", 10).pinned_at(560), SubItem::new("b", 10)];
        OccurrencePatch::start_time(600).apply(&mut b);
        assert_eq!(b.start_time, 600);
        assert_eq!(b.sub_items[0].pinned_time, Some(620));
        assert_eq!(b.sub_items[1].pinned_time, None);
    }

    #[test]
    fn explicit_sub_items_win_over_pin_shift() {
        let mut b = block(540, 60);
        b.sub_items = vec![SubItem::new("a", 10).pinned_at(560)];
        let patch = OccurrencePatch {
            start_time: Some(600),
            sub_items: Some(vec![SubItem::new("a", 10).pinned_at(605)]),
            ..OccurrencePatch::default()
        };
        patch.apply(&mut b);
        assert_eq!(b.sub_items[0].pinned_time, Some(605));
    }

    #[test]
    fn fork_copies_fields_and_links_template() {
        let mut template = block(540, 60);
        template.kind = OccurrenceKind::template(Cadence::Weekly, template.date);
        template.add_exception(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());

        let date = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        let fork = template.fork_for(date, "fork-1".to_string());
        assert_eq!(fork.id, "fork-1");
        assert_eq!(fork.date, date);
        assert_eq!(fork.forked_from(), Some("b-1"));
        assert!(fork.exception_dates().is_none());
        assert_eq!(fork.start_time, template.start_time);
    }

    #[test]
    fn add_exception_is_idempotent() {
        let mut template = block(540, 60);
        template.kind = OccurrenceKind::template(Cadence::Weekly, template.date);
        let date = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        assert!(template.add_exception(date));
        assert!(!template.add_exception(date));
        assert_eq!(template.exception_dates().map(|d| d.len()), Some(1));
    }

    #[test]
    fn occurrence_json_flattens_kind() {
        let mut b = block(540, 60);
        b.kind = OccurrenceKind::template(Cadence::WeekdaySeries, b.date);
        let json = serde_json::to_value(&b).unwrap();
        assert_eq!(json["kind"], "template");
        assert_eq!(json["rule"]["cadence"], "weekday_series");
        let back: Occurrence = serde_json::from_value(json).unwrap();
        assert_eq!(back, b);
    }
}
