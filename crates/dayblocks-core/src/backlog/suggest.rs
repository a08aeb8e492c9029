//! Best-fit suggestion of backlog work for a span of free time.
//!
//! Candidates are whole backlog items that fit the budget, or, when an item
//! is too large, its next pending sub-item on its own. Ranking buckets by
//! deadline urgency, then declared priority, then duration, with a final
//! preference for untyped work when filling gaps.

use std::cmp::{Ordering, Reverse};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::model::{is_general_type, is_urgent_deadline, BacklogItem, Priority};

/// What the free time belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionMode {
    /// Free capacity inside a block: fill as much of it as possible
    Block,
    /// Unscheduled time between blocks: waste as little as possible
    Gap,
}

impl std::str::FromStr for SuggestionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "block" => Ok(Self::Block),
            "gap" => Ok(Self::Gap),
            other => Err(format!("unknown mode '{other}' (expected block or gap)")),
        }
    }
}

/// One pending sub-item of a backlog item that is too large to fit whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitCandidate {
    pub parent_id: String,
    pub nested_index: usize,
    /// `"<sub-item> - <parent>"`
    pub title: String,
    pub duration: i32,
    pub priority: Priority,
    pub deadline: Option<NaiveDate>,
    pub linked_block_type: Option<String>,
}

/// Why a suggestion was picked, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionReason {
    DeadlineSoon,
    HighPriority,
    NextStepOfLargerItem,
    FitsTime,
}

impl SuggestionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeadlineSoon => "Deadline approaching",
            Self::HighPriority => "High priority",
            Self::NextStepOfLargerItem => "Next step of a larger item",
            Self::FitsTime => "Fits available time",
        }
    }
}

/// A suggested piece of backlog work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "candidate", rename_all = "snake_case")]
pub enum Suggestion {
    Whole(BacklogItem),
    Split(SplitCandidate),
}

impl Suggestion {
    pub fn backlog_id(&self) -> &str {
        match self {
            Self::Whole(item) => &item.id,
            Self::Split(split) => &split.parent_id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Whole(item) => &item.title,
            Self::Split(split) => &split.title,
        }
    }

    pub fn duration(&self) -> i32 {
        match self {
            Self::Whole(item) => item.estimated_duration,
            Self::Split(split) => split.duration,
        }
    }

    pub fn priority(&self) -> Priority {
        match self {
            Self::Whole(item) => item.priority,
            Self::Split(split) => split.priority,
        }
    }

    pub fn deadline(&self) -> Option<NaiveDate> {
        match self {
            Self::Whole(item) => item.deadline,
            Self::Split(split) => split.deadline,
        }
    }

    fn linked_block_type(&self) -> Option<&str> {
        match self {
            Self::Whole(item) => item.linked_block_type.as_deref(),
            Self::Split(split) => split.linked_block_type.as_deref(),
        }
    }

    fn is_general(&self) -> bool {
        is_general_type(self.linked_block_type())
    }

    fn is_urgent(&self, today: NaiveDate) -> bool {
        is_urgent_deadline(self.deadline(), today)
    }

    pub fn reason(&self, today: NaiveDate) -> SuggestionReason {
        if self.is_urgent(today) {
            SuggestionReason::DeadlineSoon
        } else if self.priority() == Priority::High {
            SuggestionReason::HighPriority
        } else if matches!(self, Self::Split(_)) {
            SuggestionReason::NextStepOfLargerItem
        } else {
            SuggestionReason::FitsTime
        }
    }
}

/// Parameters of one suggestion lookup.
#[derive(Debug, Clone, Copy)]
pub struct SuggestionQuery<'a> {
    pub budget_minutes: i32,
    pub mode: SuggestionMode,
    /// Type of the receiving block; only consulted in [`SuggestionMode::Block`]
    pub block_type: Option<&'a str>,
    /// Reference day for deadline urgency
    pub today: NaiveDate,
}

/// Engine producing ranked suggestions from a backlog pool.
pub struct SuggestionEngine;

impl SuggestionEngine {
    fn passes_type_filter(item: &BacklogItem, query: &SuggestionQuery<'_>) -> bool {
        match query.mode {
            SuggestionMode::Block => item.fits_block_type(query.block_type),
            SuggestionMode::Gap => true,
        }
    }

    /// Whole items and splits that fit the budget, in pool order.
    pub fn candidates(pool: &[BacklogItem], query: &SuggestionQuery<'_>) -> Vec<Suggestion> {
        if query.budget_minutes <= 0 {
            return Vec::new();
        }

        let mut out = Vec::new();
        for item in pool.iter().filter(|i| i.is_pending()) {
            let type_ok = Self::passes_type_filter(item, query);
            if type_ok && item.estimated_duration <= query.budget_minutes {
                out.push(Suggestion::Whole(item.clone()));
                continue;
            }

            let Some((index, next)) = item.next_pending_sub_item() else {
                continue;
            };
            if type_ok && next.duration <= query.budget_minutes {
                out.push(Suggestion::Split(SplitCandidate {
                    parent_id: item.id.clone(),
                    nested_index: index,
                    title: format!("{} - {}", next.title, item.title),
                    duration: next.duration,
                    priority: item.priority,
                    deadline: item.deadline,
                    linked_block_type: item.linked_block_type.clone(),
                }));
            }
        }
        out
    }

    fn compare(a: &Suggestion, b: &Suggestion, query: &SuggestionQuery<'_>) -> Ordering {
        let urgency = Reverse(a.is_urgent(query.today)).cmp(&Reverse(b.is_urgent(query.today)));
        let priority = b.priority().cmp(&a.priority());
        let duration = match query.mode {
            SuggestionMode::Block => b.duration().cmp(&a.duration()),
            SuggestionMode::Gap => a.duration().cmp(&b.duration()),
        };
        let generality = match query.mode {
            SuggestionMode::Block => Ordering::Equal,
            SuggestionMode::Gap => Reverse(a.is_general()).cmp(&Reverse(b.is_general())),
        };
        urgency.then(priority).then(duration).then(generality)
    }

    /// All candidates, best first. The sort is stable over pool order.
    pub fn ranked(pool: &[BacklogItem], query: &SuggestionQuery<'_>) -> Vec<Suggestion> {
        let mut candidates = Self::candidates(pool, query);
        candidates.sort_by(|a, b| Self::compare(a, b, query));
        candidates
    }

    /// The single best candidate, if any.
    pub fn best_fit(pool: &[BacklogItem], query: &SuggestionQuery<'_>) -> Option<Suggestion> {
        let best = Self::ranked(pool, query).into_iter().next();
        debug!(
            budget = query.budget_minutes,
            mode = ?query.mode,
            pick = best.as_ref().map(Suggestion::title),
            "best fit"
        );
        best
    }
}

/// Convenience wrapper around [`SuggestionEngine::best_fit`].
pub fn best_fit(
    pool: &[BacklogItem],
    budget_minutes: i32,
    mode: SuggestionMode,
    block_type: Option<&str>,
    today: NaiveDate,
) -> Option<Suggestion> {
    SuggestionEngine::best_fit(
        pool,
        &SuggestionQuery {
            budget_minutes,
            mode,
            block_type,
            today,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backlog::model::BacklogStatus;
    use crate::block::NestedSubItem;
    use proptest::prelude::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
    }

    fn item(id: &str, minutes: i32, priority: Priority) -> BacklogItem {
        let mut i = BacklogItem::new(id, "owner", id, minutes);
        i.priority = priority;
        i
    }

    #[test]
    fn empty_or_exhausted_pool_gives_none() {
        assert!(best_fit(&[], 60, SuggestionMode::Gap, None, today()).is_none());
        let mut done = item("done", 10, Priority::High);
        done.status = BacklogStatus::Completed;
        assert!(best_fit(&[done], 60, SuggestionMode::Gap, None, today()).is_none());
        assert!(best_fit(&[item("big", 90, Priority::Low)], 60, SuggestionMode::Gap, None, today()).is_none());
    }

    #[test]
    fn urgency_beats_priority() {
        let mut soon = item("soon", 20, Priority::Low);
        soon.deadline = Some(today() + chrono::Duration::days(1));
        let pool = vec![item("important", 20, Priority::High), soon];
        let pick = best_fit(&pool, 30, SuggestionMode::Block, None, today()).unwrap();
        assert_eq!(pick.backlog_id(), "soon");
        assert_eq!(pick.reason(today()), SuggestionReason::DeadlineSoon);
    }

    #[test]
    fn deadline_two_days_out_is_not_urgent() {
        let mut later = item("later", 20, Priority::Low);
        later.deadline = Some(today() + chrono::Duration::days(2));
        let pool = vec![later, item("important", 20, Priority::High)];
        let pick = best_fit(&pool, 30, SuggestionMode::Block, None, today()).unwrap();
        assert_eq!(pick.backlog_id(), "important");
    }

    #[test]
    fn block_mode_prefers_longest_gap_mode_shortest() {
        let pool = vec![
            item("short", 10, Priority::Medium),
            item("long", 50, Priority::Medium),
            item("mid", 30, Priority::Medium),
        ];
        let block = best_fit(&pool, 60, SuggestionMode::Block, None, today()).unwrap();
        assert_eq!(block.backlog_id(), "long");
        let gap = best_fit(&pool, 60, SuggestionMode::Gap, None, today()).unwrap();
        assert_eq!(gap.backlog_id(), "short");
    }

    #[test]
    fn block_mode_filters_by_type_gap_mode_prefers_general() {
        let mut typed = item("typed", 20, Priority::Medium);
        typed.linked_block_type = Some("fitness".to_string());
        let general = item("general", 20, Priority::Medium);

        let pool = vec![typed.clone(), general.clone()];
        let study = best_fit(&pool, 30, SuggestionMode::Block, Some("study"), today()).unwrap();
        assert_eq!(study.backlog_id(), "general");

        let only_typed = vec![typed.clone()];
        assert!(best_fit(&only_typed, 30, SuggestionMode::Block, Some("study"), today()).is_none());
        assert!(best_fit(&only_typed, 30, SuggestionMode::Block, Some("fitness"), today()).is_some());

        let gap = best_fit(&pool, 30, SuggestionMode::Gap, None, today()).unwrap();
        assert_eq!(gap.backlog_id(), "general");
    }

    #[test]
    fn oversized_item_splits_into_next_pending_sub_item() {
        let mut essay = item("essay", 180, Priority::High);
        essay.title = "Essay".to_string();
        essay.sub_items = vec![
            NestedSubItem { title: "Outline".into(), duration: 20, done: true },
            NestedSubItem { title: "Draft".into(), duration: 45, done: false },
            NestedSubItem { title: "Edit".into(), duration: 10, done: false },
        ];
        let pick = best_fit(&[essay], 60, SuggestionMode::Gap, None, today()).unwrap();
        match pick {
            Suggestion::Split(split) => {
                assert_eq!(split.parent_id, "essay");
                assert_eq!(split.nested_index, 1);
                assert_eq!(split.title, "Draft - Essay");
                assert_eq!(split.duration, 45);
            }
            other => panic!("expected split, got {other:?}"),
        }
    }

    #[test]
    fn split_only_considers_first_pending_sub_item() {
        let mut essay = item("essay", 180, Priority::High);
        essay.sub_items = vec![
            NestedSubItem { title: "Draft".into(), duration: 90, done: false },
            NestedSubItem { title: "Edit".into(), duration: 10, done: false },
        ];
        assert!(best_fit(&[essay], 60, SuggestionMode::Gap, None, today()).is_none());
    }

    #[test]
    fn ties_keep_pool_order() {
        let pool = vec![item("first", 20, Priority::Medium), item("second", 20, Priority::Medium)];
        let pick = best_fit(&pool, 30, SuggestionMode::Gap, None, today()).unwrap();
        assert_eq!(pick.backlog_id(), "first");
    }

    #[test]
    fn non_positive_budget_gives_none() {
        let pool = vec![item("zero", 0, Priority::High)];
        assert!(best_fit(&pool, 0, SuggestionMode::Gap, None, today()).is_none());
    }

    proptest! {
        #[test]
        fn never_exceeds_budget(
            durations in prop::collection::vec((1i32..240, prop::collection::vec(1i32..120, 0..4)), 0..10),
            budget in 1i32..180,
            gap_mode in any::<bool>(),
        ) {
            let pool: Vec<BacklogItem> = durations
                .into_iter()
                .enumerate()
                .map(|(i, (minutes, subs))| {
                    let mut b = item(&format!("b{i}"), minutes, Priority::Medium);
                    b.sub_items = subs
                        .into_iter()
                        .map(|d| NestedSubItem { title: "s".into(), duration: d, done: false })
                        .collect();
                    b
                })
                .collect();
            let mode = if gap_mode { SuggestionMode::Gap } else { SuggestionMode::Block };
            if let Some(pick) = best_fit(&pool, budget, mode, None, today()) {
                prop_assert!(pick.duration() <= budget);
            }
        }
    }
}
