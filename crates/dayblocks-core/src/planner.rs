//! The planner facade: every user intent as one call.
//!
//! [`DayPlanner`] owns a store and the configuration. Reads resolve the day
//! and annotate it with layouts, gaps and suggestions. Writes against an
//! occurrence go through [`ForkingEngine`], so a virtual occurrence is
//! forked before anything is stored for it.

use chrono::{Datelike, Local, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::backlog::{BacklogItem, BacklogSubItem, Priority, Suggestion, SuggestionEngine, SuggestionMode, SuggestionQuery};
use crate::block::{
    check_max_duration, ensure_no_conflict, layout, resolve, BacklogRef, BlockLayout, BlockStatus,
    Cadence, DeleteOutcome, ForkingEngine, MutationOutcome, MutationScope, Occurrence, OccurrenceDraft,
    OccurrenceKind, OccurrencePatch, OccurrenceRef, ResolvedOccurrence, SubItem, SubItemOp,
    SubItemOrigin, GENERAL_BLOCK_TYPE,
};
use crate::error::{CoreError, EntityKind, Result, ValidationError};
use crate::gesture::drag_to;
use crate::storage::{BacklogFilter, BacklogStore, Config, OccurrenceFilter, OccurrenceStore};
use crate::timeline::{find_day_gaps, DayGap};

/// One resolved occurrence with its rendering annotations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedOccurrence {
    /// Token to address this occurrence in later calls
    pub token: String,
    pub reference: OccurrenceRef,
    pub occurrence: ResolvedOccurrence,
    pub layout: BlockLayout,
    /// Sub-items need more time than the block declares
    pub capacity_conflict: bool,
    /// Best backlog work for the block's largest free slot
    pub suggestion: Option<Suggestion>,
}

/// A gap between occurrences with the best backlog work for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedGap {
    pub gap: DayGap,
    pub suggestion: Option<Suggestion>,
}

/// Everything needed to render one day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayPlan {
    pub date: NaiveDate,
    pub entries: Vec<PlannedOccurrence>,
    pub gaps: Vec<PlannedGap>,
}

/// Fields for a new backlog item.
#[derive(Debug, Clone, Default)]
pub struct BacklogDraft {
    pub title: String,
    pub estimated_duration: i32,
    pub priority: Priority,
    pub linked_block_type: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub sub_items: Vec<BacklogSubItem>,
}

/// Result of moving a sub-item back to the backlog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetachOutcome {
    pub mutation: MutationOutcome,
    pub backlog_item: BacklogItem,
}

/// Weekdays a template with `cadence` anchored on `anchor` repeats on.
fn series_weekdays(cadence: Cadence, anchor: NaiveDate) -> Vec<Weekday> {
    match cadence {
        Cadence::Weekly => vec![anchor.weekday()],
        Cadence::WeekdaySeries => vec![
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ],
    }
}

fn invalid(field: &str, message: impl Into<String>) -> CoreError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        message: message.into(),
    }
    .into()
}

/// Intent facade over a store.
pub struct DayPlanner<S> {
    store: S,
    config: Config,
}

impl<S: OccurrenceStore + BacklogStore> DayPlanner<S> {
    pub fn new(store: S, config: Config) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn engine<'a>(&'a mut self, owner_id: &'a str) -> ForkingEngine<'a, S> {
        let rules = self.config.validation_rules();
        ForkingEngine::new(&mut self.store, owner_id, rules)
    }

    fn build_occurrence(&self, owner_id: &str, draft: OccurrenceDraft, kind: OccurrenceKind) -> Occurrence {
        let date = match &kind {
            OccurrenceKind::Template { rule, .. } => rule.anchor_date,
            OccurrenceKind::OneOff { .. } => draft.date.unwrap_or_else(|| Local::now().date_naive()),
        };
        Occurrence {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            title: draft.title.trim().to_string(),
            date,
            start_time: draft.start_time,
            total_duration: draft.total_duration,
            color: draft
                .color
                .unwrap_or_else(|| self.config.appearance.default_color.clone()),
            icon: draft
                .icon
                .unwrap_or_else(|| self.config.appearance.default_icon.clone()),
            block_type: draft
                .block_type
                .unwrap_or_else(|| GENERAL_BLOCK_TYPE.to_string()),
            status: BlockStatus::Pending,
            kind,
            sub_items: draft.sub_items,
        }
    }

    // === Occurrences ===

    /// Create a one-off block. Rejected if it overlaps another one-off.
    pub fn create_one_off(&mut self, owner_id: &str, draft: OccurrenceDraft) -> Result<Occurrence> {
        let occurrence = self.build_occurrence(owner_id, draft, OccurrenceKind::one_off());
        occurrence.validate(&self.config.validation_rules())?;
        ensure_no_conflict(
            &self.store,
            owner_id,
            occurrence.date,
            occurrence.start_time,
            occurrence.total_duration,
            None,
        )?;
        self.store.insert_occurrence(&occurrence)?;
        info!(id = %occurrence.id, date = %occurrence.date, "created occurrence");
        Ok(occurrence)
    }

    /// Create a recurring template anchored on `draft.date`.
    ///
    /// Rejected with [`ValidationError::DuplicateSeries`] if a template with
    /// the same title already repeats on one of the same weekdays.
    pub fn create_template(
        &mut self,
        owner_id: &str,
        draft: OccurrenceDraft,
        cadence: Cadence,
    ) -> Result<Occurrence> {
        let anchor = draft.date.unwrap_or_else(|| Local::now().date_naive());
        let template = self.build_occurrence(owner_id, draft, OccurrenceKind::template(cadence, anchor));
        template.validate(&self.config.validation_rules())?;

        let weekdays = series_weekdays(cadence, anchor);
        let existing = self
            .store
            .query_occurrences(owner_id, &OccurrenceFilter::Templates)?;
        for other in existing.iter().filter(|t| t.title.eq_ignore_ascii_case(&template.title)) {
            let Some(rule) = other.rule() else { continue };
            let shared = series_weekdays(rule.cadence, other.date)
                .into_iter()
                .find(|wd| weekdays.contains(wd));
            if let Some(weekday) = shared {
                return Err(ValidationError::DuplicateSeries {
                    title: template.title.clone(),
                    weekday: weekday.to_string(),
                }
                .into());
            }
        }

        self.store.insert_occurrence(&template)?;
        info!(id = %template.id, ?cadence, anchor = %anchor, "created template");
        Ok(template)
    }

    /// The occurrences of `date`, sorted by start time.
    pub fn resolve_day(&self, owner_id: &str, date: NaiveDate) -> Result<Vec<ResolvedOccurrence>> {
        resolve(&self.store, owner_id, date)
    }

    /// The block `reference` addresses, as it currently appears.
    pub fn occurrence(&mut self, owner_id: &str, reference: &OccurrenceRef) -> Result<Occurrence> {
        self.engine(owner_id).current_state(reference)
    }

    /// Resolved day with layouts, gaps and suggestions.
    pub fn day_plan(&self, owner_id: &str, date: NaiveDate, today: NaiveDate) -> Result<DayPlan> {
        let resolved = resolve(&self.store, owner_id, date)?;
        let pool = self.store.list_backlog(owner_id, BacklogFilter::Pending)?;

        let entries = resolved
            .into_iter()
            .map(|occurrence| {
                let block = occurrence.block();
                let block_layout = layout(block);
                let suggestion = if block.status == BlockStatus::Pending {
                    SuggestionEngine::best_fit(
                        &pool,
                        &SuggestionQuery {
                            budget_minutes: block_layout.largest_free_slot_minutes,
                            mode: SuggestionMode::Block,
                            block_type: Some(&block.block_type),
                            today,
                        },
                    )
                } else {
                    None
                };
                let reference = occurrence.reference();
                PlannedOccurrence {
                    token: reference.to_string(),
                    reference,
                    capacity_conflict: block_layout.has_capacity_conflict(),
                    layout: block_layout,
                    suggestion,
                    occurrence,
                }
            })
            .collect::<Vec<_>>();

        let (day_start, day_end) = self.config.day_window()?;
        let gaps = find_day_gaps(
            entries.iter().map(|e| e.occurrence.block()),
            day_start,
            day_end,
            self.config.planner.min_gap_minutes,
        )
        .into_iter()
        .map(|gap| PlannedGap {
            suggestion: SuggestionEngine::best_fit(
                &pool,
                &SuggestionQuery {
                    budget_minutes: gap.duration_minutes(),
                    mode: SuggestionMode::Gap,
                    block_type: None,
                    today,
                },
            ),
            gap,
        })
        .collect();

        Ok(DayPlan {
            date,
            entries,
            gaps,
        })
    }

    /// Apply an arbitrary patch (rename, recolor, ...).
    pub fn update_occurrence(
        &mut self,
        owner_id: &str,
        reference: &OccurrenceRef,
        patch: &OccurrencePatch,
        scope: MutationScope,
    ) -> Result<MutationOutcome> {
        self.engine(owner_id).apply_mutation(reference, patch, scope)
    }

    /// Move a block to `new_start`; pinned sub-items move with it.
    pub fn move_occurrence(
        &mut self,
        owner_id: &str,
        reference: &OccurrenceRef,
        new_start: i32,
        scope: MutationScope,
    ) -> Result<MutationOutcome> {
        self.engine(owner_id)
            .apply_mutation(reference, &OccurrencePatch::start_time(new_start), scope)
    }

    /// Move a block by a drag gesture of `delta_pixels`.
    ///
    /// A drag that quantizes to no movement writes nothing.
    pub fn drag_occurrence(
        &mut self,
        owner_id: &str,
        reference: &OccurrenceRef,
        delta_pixels: f64,
        scope: MutationScope,
    ) -> Result<MutationOutcome> {
        let mut engine = self.engine(owner_id);
        let target = engine.target(reference)?;
        let base = target.base(scope);
        let new_start = drag_to(delta_pixels, base.start_time);
        if new_start == base.start_time {
            return Ok(MutationOutcome {
                reference: reference.clone(),
                forked: false,
                occurrence: target.current(),
            });
        }
        engine.apply_mutation(reference, &OccurrencePatch::start_time(new_start), scope)
    }

    /// Flip pending/completed for this date only.
    pub fn toggle_status(&mut self, owner_id: &str, reference: &OccurrenceRef) -> Result<MutationOutcome> {
        let mut engine = self.engine(owner_id);
        let current = engine.current_state(reference)?;
        engine.apply_mutation(
            reference,
            &OccurrencePatch::status(current.status.toggled()),
            MutationScope::Instance,
        )
    }

    /// Grow the block so every sub-item fits.
    pub fn resize_to_fit(
        &mut self,
        owner_id: &str,
        reference: &OccurrenceRef,
        scope: MutationScope,
    ) -> Result<MutationOutcome> {
        let mut engine = self.engine(owner_id);
        let target = engine.target(reference)?;
        let base = target.base(scope);
        let fit = layout(&base).fit_duration();
        if fit == base.total_duration {
            return Ok(MutationOutcome {
                reference: reference.clone(),
                forked: false,
                occurrence: target.current(),
            });
        }
        engine.apply_mutation(reference, &OccurrencePatch::total_duration(fit), scope)
    }

    /// Delete a block, a single date of a series, or the series.
    pub fn delete_occurrence(
        &mut self,
        owner_id: &str,
        reference: &OccurrenceRef,
        scope: MutationScope,
    ) -> Result<DeleteOutcome> {
        self.engine(owner_id).delete(reference, scope)
    }

    // === Sub-items ===

    /// Edit the sub-item list; a virtual occurrence is forked first unless
    /// `scope` is [`MutationScope::Series`].
    pub fn apply_sub_item_op(
        &mut self,
        owner_id: &str,
        reference: &OccurrenceRef,
        op: &SubItemOp,
        scope: MutationScope,
    ) -> Result<MutationOutcome> {
        let mut engine = self.engine(owner_id);
        let mut items = engine.base_state(reference, scope)?.sub_items;
        op.apply(&mut items)?;
        engine.apply_mutation(reference, &OccurrencePatch::sub_items(items), scope)
    }

    /// Remove a sub-item and put it back on the backlog as pending work.
    pub fn detach_sub_item(
        &mut self,
        owner_id: &str,
        reference: &OccurrenceRef,
        index: usize,
    ) -> Result<DetachOutcome> {
        let mut engine = self.engine(owner_id);
        let current = engine.current_state(reference)?;
        let mut items = current.sub_items;
        let Some(removed) = (SubItemOp::Remove { index }).apply(&mut items)? else {
            return Err(CoreError::not_found(EntityKind::SubItem, index.to_string()));
        };
        let mutation = engine.apply_mutation(
            reference,
            &OccurrencePatch::sub_items(items),
            MutationScope::Instance,
        )?;

        let backlog_item = BacklogItem::from_sub_item(Uuid::new_v4().to_string(), owner_id, &removed);
        self.store.insert_backlog_item(&backlog_item)?;
        info!(backlog_id = %backlog_item.id, "detached sub-item to backlog");
        Ok(DetachOutcome {
            mutation,
            backlog_item,
        })
    }

    fn pending_backlog_item(&self, owner_id: &str, backlog_id: &str) -> Result<BacklogItem> {
        let item = self
            .store
            .get_backlog_item(owner_id, backlog_id)?
            .ok_or_else(|| CoreError::not_found(EntityKind::BacklogItem, backlog_id))?;
        if !item.is_pending() {
            return Err(invalid("backlog item", format!("{backlog_id} is already completed")));
        }
        Ok(item)
    }

    /// Append a whole backlog item as a sub-item and consume it.
    pub fn assign_backlog_item(
        &mut self,
        owner_id: &str,
        reference: &OccurrenceRef,
        backlog_id: &str,
    ) -> Result<MutationOutcome> {
        let item = self.pending_backlog_item(owner_id, backlog_id)?;
        let outcome = self.apply_sub_item_op(
            owner_id,
            reference,
            &SubItemOp::Add {
                item: item.to_sub_item(),
            },
            MutationScope::Instance,
        )?;
        self.store.delete_backlog_item(owner_id, &item.id)?;
        info!(backlog_id = %item.id, target = %outcome.reference, "assigned backlog item");
        Ok(outcome)
    }

    /// Append one pending sub-item of a backlog item.
    ///
    /// The backlog sub-item is marked done; the backlog item is consumed
    /// once all of its sub-items are done.
    pub fn assign_split(
        &mut self,
        owner_id: &str,
        reference: &OccurrenceRef,
        backlog_id: &str,
        nested_index: usize,
    ) -> Result<MutationOutcome> {
        let mut item = self.pending_backlog_item(owner_id, backlog_id)?;
        let len = item.sub_items.len();
        let Some(part) = item.sub_items.get(nested_index) else {
            return Err(ValidationError::OutOfBounds {
                collection: "backlog sub_items".to_string(),
                index: nested_index,
                len,
            }
            .into());
        };
        if part.done {
            return Err(invalid("nested_index", format!("sub-item {nested_index} is already done")));
        }

        let sub_item = SubItem {
            title: format!("{} - {}", part.title, item.title),
            duration: part.duration,
            done: false,
            pinned_time: None,
            origin: SubItemOrigin::FromBacklog,
            backlog_ref: Some(BacklogRef {
                item_id: item.id.clone(),
                nested_index: Some(nested_index),
            }),
            nested: Vec::new(),
        };
        let outcome = self.apply_sub_item_op(
            owner_id,
            reference,
            &SubItemOp::Add { item: sub_item },
            MutationScope::Instance,
        )?;

        item.sub_items[nested_index].done = true;
        if item.all_sub_items_done() {
            self.store.delete_backlog_item(owner_id, &item.id)?;
            info!(backlog_id = %item.id, "backlog item fully assigned");
        } else {
            self.store.update_backlog_item(&item)?;
        }
        Ok(outcome)
    }

    /// Turn a backlog item into its own one-off block and consume it.
    pub fn schedule_backlog_item(
        &mut self,
        owner_id: &str,
        backlog_id: &str,
        date: NaiveDate,
        start_time: i32,
    ) -> Result<Occurrence> {
        let item = self.pending_backlog_item(owner_id, backlog_id)?;
        let sub_items = item
            .sub_items
            .iter()
            .enumerate()
            .map(|(index, part)| SubItem {
                title: part.title.clone(),
                duration: part.duration,
                done: part.done,
                pinned_time: None,
                origin: SubItemOrigin::FromBacklog,
                backlog_ref: Some(BacklogRef {
                    item_id: item.id.clone(),
                    nested_index: Some(index),
                }),
                nested: Vec::new(),
            })
            .collect();

        let occurrence = self.create_one_off(
            owner_id,
            OccurrenceDraft {
                title: item.title.clone(),
                date: Some(date),
                start_time,
                total_duration: item.estimated_duration,
                block_type: item.linked_block_type.clone(),
                sub_items,
                ..OccurrenceDraft::default()
            },
        )?;
        self.store.delete_backlog_item(owner_id, &item.id)?;
        info!(backlog_id = %item.id, occurrence_id = %occurrence.id, "scheduled backlog item");
        Ok(occurrence)
    }

    // === Backlog ===

    pub fn add_backlog_item(&mut self, owner_id: &str, draft: BacklogDraft) -> Result<BacklogItem> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(invalid("title", "must not be empty"));
        }
        let minimum = self.config.planner.min_sub_item_minutes;
        if draft.estimated_duration < minimum {
            return Err(ValidationError::DurationTooShort {
                minutes: draft.estimated_duration,
                minimum,
            }
            .into());
        }
        if let Some(short) = draft.sub_items.iter().find(|s| s.duration < minimum) {
            return Err(ValidationError::DurationTooShort {
                minutes: short.duration,
                minimum,
            }
            .into());
        }
        // Parts become sub-items when assigned, so they share the block cap.
        for part in &draft.sub_items {
            check_max_duration(part.duration)?;
        }

        let mut item = BacklogItem::new(Uuid::new_v4().to_string(), owner_id, title, draft.estimated_duration);
        item.priority = draft.priority;
        item.linked_block_type = draft.linked_block_type;
        item.deadline = draft.deadline;
        item.sub_items = draft.sub_items;
        self.store.insert_backlog_item(&item)?;
        info!(id = %item.id, "added backlog item");
        Ok(item)
    }

    pub fn list_backlog(&self, owner_id: &str, filter: BacklogFilter) -> Result<Vec<BacklogItem>> {
        Ok(self.store.list_backlog(owner_id, filter)?)
    }

    pub fn complete_backlog_item(&mut self, owner_id: &str, backlog_id: &str) -> Result<BacklogItem> {
        let mut item = self
            .store
            .get_backlog_item(owner_id, backlog_id)?
            .ok_or_else(|| CoreError::not_found(EntityKind::BacklogItem, backlog_id))?;
        item.status = crate::backlog::BacklogStatus::Completed;
        self.store.update_backlog_item(&item)?;
        Ok(item)
    }

    pub fn delete_backlog_item(&mut self, owner_id: &str, backlog_id: &str) -> Result<()> {
        if self.store.get_backlog_item(owner_id, backlog_id)?.is_none() {
            return Err(CoreError::not_found(EntityKind::BacklogItem, backlog_id));
        }
        self.store.delete_backlog_item(owner_id, backlog_id)?;
        Ok(())
    }

    /// Ranked suggestions from the owner's pending backlog, best first.
    pub fn suggestions(
        &self,
        owner_id: &str,
        budget_minutes: i32,
        mode: SuggestionMode,
        block_type: Option<&str>,
        today: NaiveDate,
    ) -> Result<Vec<Suggestion>> {
        let pool = self.store.list_backlog(owner_id, BacklogFilter::Pending)?;
        Ok(SuggestionEngine::ranked(
            &pool,
            &SuggestionQuery {
                budget_minutes,
                mode,
                block_type,
                today,
            },
        ))
    }

    /// The single best suggestion, if any.
    pub fn suggest(
        &self,
        owner_id: &str,
        budget_minutes: i32,
        mode: SuggestionMode,
        block_type: Option<&str>,
        today: NaiveDate,
    ) -> Result<Option<Suggestion>> {
        let pool = self.store.list_backlog(owner_id, BacklogFilter::Pending)?;
        Ok(SuggestionEngine::best_fit(
            &pool,
            &SuggestionQuery {
                budget_minutes,
                mode,
                block_type,
                today,
            },
        ))
    }
}
