//! Copy-on-write writes against occurrences.
//!
//! Every write goes through [`ForkingEngine`]. A concrete reference is
//! patched in place. A virtual reference either edits the template
//! ([`MutationScope::Series`]) or forks: the date becomes an exception on the
//! template and a one-off carrying the patched state is inserted.
//!
//! The fork is two writes with no transaction around them. If the insert
//! fails after the exception was stored, the date is suppressed without a
//! replacement; re-resolving the day shows the gap.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::conflict::ensure_no_conflict;
use super::model::{Cadence, Occurrence, OccurrenceKind, OccurrencePatch, ValidationRules};
use super::recurrence::template_matches;
use super::reference::OccurrenceRef;
use crate::error::{CoreError, EntityKind, Result};
use crate::storage::{OccurrenceFilter, OccurrenceStore};
use crate::time::next_on_or_after;

/// What a write against a virtual occurrence affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationScope {
    /// Only this date
    #[default]
    Instance,
    /// The template, so this and every other matching date
    Series,
}

impl std::str::FromStr for MutationScope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "instance" => Ok(Self::Instance),
            "series" => Ok(Self::Series),
            other => Err(format!("unknown scope '{other}' (expected instance or series)")),
        }
    }
}

/// Result of [`ForkingEngine::apply_mutation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationOutcome {
    /// Address of the written state; concrete after a fork
    pub reference: OccurrenceRef,
    /// A new one-off was materialized
    pub forked: bool,
    /// The block as it now appears on the addressed date
    pub occurrence: Occurrence,
}

/// Result of [`ForkingEngine::delete`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// A persisted one-off was removed
    Deleted { id: String },
    /// The date was added to the template's exceptions
    Suppressed { template_id: String, date: NaiveDate },
    /// The template was removed
    SeriesEnded { template_id: String },
    /// A weekday series was replaced by weekly templates for the kept days
    SeriesSplit {
        removed_template_id: String,
        replacements: Vec<Occurrence>,
    },
}

/// Where a reference currently points.
#[derive(Debug, Clone)]
pub enum Target {
    /// A persisted row
    Concrete(Occurrence),
    /// A template date with no row of its own
    Virtual { template: Occurrence, date: NaiveDate },
    /// A template date that was already forked
    Forked { template: Occurrence, fork: Occurrence },
}

impl Target {
    /// The block as the addressed date shows it.
    pub fn current(&self) -> Occurrence {
        match self {
            Self::Concrete(o) => o.clone(),
            Self::Virtual { template, date } => template.project_onto(*date),
            Self::Forked { fork, .. } => fork.clone(),
        }
    }

    /// The state a `scope` write is computed from.
    ///
    /// Same as [`Target::current`] except for a series write through a
    /// forked date: that starts from the template, so nothing the fork
    /// changed leaks into the series.
    pub fn base(&self, scope: MutationScope) -> Occurrence {
        match (self, scope) {
            (Self::Forked { template, fork }, MutationScope::Series) => template.project_onto(fork.date),
            _ => self.current(),
        }
    }
}

/// Applies writes to one owner's occurrences.
pub struct ForkingEngine<'a, S: OccurrenceStore + ?Sized> {
    store: &'a mut S,
    owner_id: &'a str,
    rules: ValidationRules,
}

impl<'a, S: OccurrenceStore + ?Sized> ForkingEngine<'a, S> {
    pub fn new(store: &'a mut S, owner_id: &'a str, rules: ValidationRules) -> Self {
        Self {
            store,
            owner_id,
            rules,
        }
    }

    /// Look up what `reference` addresses.
    ///
    /// A virtual reference to an excepted date follows the fork made for
    /// that date, so a stale reference keeps working after a fork.
    pub fn target(&self, reference: &OccurrenceRef) -> Result<Target> {
        match reference {
            OccurrenceRef::Concrete { id } => self
                .store
                .get_occurrence(self.owner_id, id)?
                .map(Target::Concrete)
                .ok_or_else(|| CoreError::not_found(EntityKind::Occurrence, id.clone())),
            OccurrenceRef::Virtual { template_id, date } => {
                let template = self
                    .store
                    .get_occurrence(self.owner_id, template_id)?
                    .filter(Occurrence::is_template)
                    .ok_or_else(|| CoreError::not_found(EntityKind::Template, template_id.clone()))?;

                if template_matches(&template, *date) {
                    return Ok(Target::Virtual {
                        template,
                        date: *date,
                    });
                }

                let excepted = template
                    .exception_dates()
                    .is_some_and(|dates| dates.contains(date));
                if excepted {
                    let forks = self.store.query_occurrences(
                        self.owner_id,
                        &OccurrenceFilter::ForkedFrom(template_id.clone()),
                    )?;
                    if let Some(fork) = forks.into_iter().find(|f| f.date == *date) {
                        debug!(%reference, fork_id = %fork.id, "virtual reference follows fork");
                        return Ok(Target::Forked { template, fork });
                    }
                }

                warn!(%reference, "stale virtual reference");
                Err(CoreError::not_found(EntityKind::Occurrence, reference.to_string()))
            }
        }
    }

    /// The block as `reference` currently shows it.
    pub fn current_state(&self, reference: &OccurrenceRef) -> Result<Occurrence> {
        Ok(self.target(reference)?.current())
    }

    /// The state a `scope` write to `reference` should be computed from.
    pub fn base_state(&self, reference: &OccurrenceRef, scope: MutationScope) -> Result<Occurrence> {
        Ok(self.target(reference)?.base(scope))
    }

    /// Apply `patch` to whatever `reference` addresses.
    ///
    /// A series write through a forked date updates the template but leaves
    /// the fork alone, so the outcome carries the unchanged fork.
    ///
    /// Nothing is written if validation or the conflict check fails.
    pub fn apply_mutation(
        &mut self,
        reference: &OccurrenceRef,
        patch: &OccurrencePatch,
        scope: MutationScope,
    ) -> Result<MutationOutcome> {
        match (self.target(reference)?, scope) {
            (Target::Concrete(record), _) => {
                let updated = self.patch_record(record, patch)?;
                Ok(MutationOutcome {
                    reference: OccurrenceRef::concrete(updated.id.clone()),
                    forked: false,
                    occurrence: updated,
                })
            }
            (Target::Virtual { template, date }, MutationScope::Series) => {
                let updated = self.patch_record(template, patch)?;
                Ok(MutationOutcome {
                    reference: reference.clone(),
                    forked: false,
                    occurrence: updated.project_onto(date),
                })
            }
            (Target::Forked { template, fork }, MutationScope::Series) => {
                self.patch_record(template, patch)?;
                Ok(MutationOutcome {
                    reference: OccurrenceRef::concrete(fork.id.clone()),
                    forked: false,
                    occurrence: fork,
                })
            }
            (Target::Forked { fork, .. }, MutationScope::Instance) => {
                let updated = self.patch_record(fork, patch)?;
                Ok(MutationOutcome {
                    reference: OccurrenceRef::concrete(updated.id.clone()),
                    forked: false,
                    occurrence: updated,
                })
            }
            (Target::Virtual { template, date }, MutationScope::Instance) => {
                let fork = self.fork(template, date, patch)?;
                Ok(MutationOutcome {
                    reference: OccurrenceRef::concrete(fork.id.clone()),
                    forked: true,
                    occurrence: fork,
                })
            }
        }
    }

    /// Patch, validate and store an existing row.
    fn patch_record(&mut self, mut record: Occurrence, patch: &OccurrencePatch) -> Result<Occurrence> {
        patch.apply(&mut record);
        record.validate(&self.rules)?;
        if !record.is_template() && patch.moves_interval() {
            ensure_no_conflict(
                &*self.store,
                self.owner_id,
                record.date,
                record.start_time,
                record.total_duration,
                Some(&record.id),
            )?;
        }
        self.store.update_occurrence(&record)?;
        info!(id = %record.id, template = record.is_template(), "updated occurrence");
        Ok(record)
    }

    /// Materialize `template` on `date` with `patch` applied.
    fn fork(&mut self, mut template: Occurrence, date: NaiveDate, patch: &OccurrencePatch) -> Result<Occurrence> {
        let mut fork = template.fork_for(date, Uuid::new_v4().to_string());
        patch.apply(&mut fork);
        fork.validate(&self.rules)?;
        if patch.moves_interval() {
            ensure_no_conflict(
                &*self.store,
                self.owner_id,
                date,
                fork.start_time,
                fork.total_duration,
                None,
            )?;
        }

        if template.add_exception(date) {
            self.store.update_occurrence(&template)?;
        }
        self.store.insert_occurrence(&fork)?;
        info!(template_id = %template.id, %date, fork_id = %fork.id, "forked occurrence");
        Ok(fork)
    }

    /// Delete what `reference` addresses.
    ///
    /// With [`MutationScope::Series`] on a weekday series, only the
    /// addressed weekday is dropped: the template is replaced by one weekly
    /// template per remaining weekday.
    pub fn delete(&mut self, reference: &OccurrenceRef, scope: MutationScope) -> Result<DeleteOutcome> {
        match (self.target(reference)?, scope) {
            (Target::Concrete(record), _) => {
                self.store.delete_occurrence(self.owner_id, &record.id)?;
                info!(id = %record.id, "deleted occurrence");
                if record.is_template() {
                    Ok(DeleteOutcome::SeriesEnded {
                        template_id: record.id,
                    })
                } else {
                    Ok(DeleteOutcome::Deleted { id: record.id })
                }
            }
            (Target::Virtual { mut template, date }, MutationScope::Instance) => {
                template.add_exception(date);
                self.store.update_occurrence(&template)?;
                info!(template_id = %template.id, %date, "suppressed occurrence");
                Ok(DeleteOutcome::Suppressed {
                    template_id: template.id,
                    date,
                })
            }
            (Target::Forked { fork, .. }, MutationScope::Instance) => {
                self.store.delete_occurrence(self.owner_id, &fork.id)?;
                info!(id = %fork.id, "deleted forked occurrence");
                Ok(DeleteOutcome::Deleted { id: fork.id })
            }
            (Target::Virtual { template, date }, MutationScope::Series)
            | (Target::Forked { template, fork: Occurrence { date, .. } }, MutationScope::Series) => {
                let cadence = template.rule().map(|r| r.cadence);
                if cadence == Some(Cadence::WeekdaySeries) {
                    let removed_template_id = template.id.clone();
                    let replacements = self.split_weekday_series(template, date.weekday())?;
                    Ok(DeleteOutcome::SeriesSplit {
                        removed_template_id,
                        replacements,
                    })
                } else {
                    self.store.delete_occurrence(self.owner_id, &template.id)?;
                    info!(template_id = %template.id, "ended series");
                    Ok(DeleteOutcome::SeriesEnded {
                        template_id: template.id,
                    })
                }
            }
        }
    }

    /// Replace a weekday-series template with weekly templates for every
    /// weekday except `removed`.
    ///
    /// Each replacement is anchored on the first matching day on or after the
    /// old anchor and keeps the exceptions that fall on its weekday. Forks of
    /// the kept weekdays are re-pointed at their new template.
    pub fn split_weekday_series(&mut self, template: Occurrence, removed: Weekday) -> Result<Vec<Occurrence>> {
        const WEEKDAYS: [Weekday; 5] = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ];

        let exceptions = template.exception_dates().cloned().unwrap_or_default();
        let forks = self.store.query_occurrences(
            self.owner_id,
            &OccurrenceFilter::ForkedFrom(template.id.clone()),
        )?;

        let mut replacements = Vec::with_capacity(WEEKDAYS.len() - 1);
        for weekday in WEEKDAYS.into_iter().filter(|wd| *wd != removed) {
            let anchor = next_on_or_after(template.date, weekday);
            let mut replacement = template.clone();
            replacement.id = Uuid::new_v4().to_string();
            replacement.date = anchor;
            replacement.kind = OccurrenceKind::template(Cadence::Weekly, anchor);
            for date in exceptions.iter().filter(|d| d.weekday() == weekday) {
                replacement.add_exception(*date);
            }
            self.store.insert_occurrence(&replacement)?;
            replacements.push(replacement);
        }

        for mut fork in forks {
            let Some(new_parent) = replacements
                .iter()
                .find(|r| r.date.weekday() == fork.date.weekday())
            else {
                continue;
            };
            fork.kind = OccurrenceKind::OneOff {
                forked_from: Some(new_parent.id.clone()),
            };
            self.store.update_occurrence(&fork)?;
        }

        self.store.delete_occurrence(self.owner_id, &template.id)?;
        info!(
            template_id = %template.id,
            %removed,
            replacements = replacements.len(),
            "split weekday series"
        );
        Ok(replacements)
    }
}
