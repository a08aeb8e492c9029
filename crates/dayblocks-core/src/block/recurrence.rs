//! Expanding templates into the occurrences of one day.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::model::{Cadence, Occurrence};
use super::reference::OccurrenceRef;
use crate::error::Result;
use crate::storage::{OccurrenceFilter, OccurrenceStore};

/// A template projected onto one date. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualOccurrence {
    pub template_id: String,
    pub date: NaiveDate,
    /// Template fields with `date` replaced
    pub projection: Occurrence,
}

/// An entry in a resolved day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ResolvedOccurrence {
    Concrete(Occurrence),
    Virtual(VirtualOccurrence),
}

impl ResolvedOccurrence {
    pub fn reference(&self) -> OccurrenceRef {
        match self {
            Self::Concrete(o) => OccurrenceRef::concrete(o.id.clone()),
            Self::Virtual(v) => OccurrenceRef::virtual_on(v.template_id.clone(), v.date),
        }
    }

    /// Block fields as they appear on this date.
    pub fn block(&self) -> &Occurrence {
        match self {
            Self::Concrete(o) => o,
            Self::Virtual(v) => &v.projection,
        }
    }

    pub fn start_time(&self) -> i32 {
        self.block().start_time
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, Self::Virtual(_))
    }
}

/// Whether `template` produces an occurrence on `date`.
pub fn template_matches(template: &Occurrence, date: NaiveDate) -> bool {
    let Some(rule) = template.rule() else {
        return false;
    };
    if date < template.date {
        return false;
    }
    if template
        .exception_dates()
        .is_some_and(|exceptions| exceptions.contains(&date))
    {
        return false;
    }

    match rule.cadence {
        Cadence::Weekly => date.weekday() == template.date.weekday(),
        Cadence::WeekdaySeries => crate::time::is_weekday(date),
    }
}

/// Merge one-off occurrences with the virtual expansions of `templates` for
/// `date`, sorted by start time.
///
/// One-offs are expected to already be filtered to `date`. Sorting is stable,
/// so entries sharing a start time keep one-offs before virtual ones.
pub fn expand(
    one_offs: Vec<Occurrence>,
    templates: &[Occurrence],
    date: NaiveDate,
) -> Vec<ResolvedOccurrence> {
    let mut resolved: Vec<ResolvedOccurrence> = one_offs
        .into_iter()
        .filter(|o| !o.is_template() && o.date == date)
        .map(ResolvedOccurrence::Concrete)
        .collect();

    for template in templates.iter().filter(|t| template_matches(t, date)) {
        resolved.push(ResolvedOccurrence::Virtual(VirtualOccurrence {
            template_id: template.id.clone(),
            date,
            projection: template.project_onto(date),
        }));
    }

    resolved.sort_by_key(ResolvedOccurrence::start_time);
    resolved
}

/// Resolve the occurrences `owner_id` has on `date`.
pub fn resolve<S: OccurrenceStore + ?Sized>(
    store: &S,
    owner_id: &str,
    date: NaiveDate,
) -> Result<Vec<ResolvedOccurrence>> {
    let one_offs = store.query_occurrences(owner_id, &OccurrenceFilter::OneOffOn(date))?;
    let templates = store.query_occurrences(owner_id, &OccurrenceFilter::Templates)?;
    let resolved = expand(one_offs, &templates, date);
    debug!(
        %date,
        total = resolved.len(),
        virtual_count = resolved.iter().filter(|r| r.is_virtual()).count(),
        "resolved day"
    );
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::model::{BlockStatus, OccurrenceKind, GENERAL_BLOCK_TYPE};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn occurrence(id: &str, date: NaiveDate, start: i32, kind: OccurrenceKind) -> Occurrence {
        Occurrence {
            id: id.to_string(),
            owner_id: "owner".to_string(),
            title: id.to_string(),
            date,
            start_time: start,
            total_duration: 60,
            color: "#000".to_string(),
            icon: "clock".to_string(),
            block_type: GENERAL_BLOCK_TYPE.to_string(),
            status: BlockStatus::Pending,
            kind,
            sub_items: Vec::new(),
        }
    }

    fn weekly(id: &str, anchor: NaiveDate, start: i32) -> Occurrence {
        occurrence(id, anchor, start, OccurrenceKind::template(Cadence::Weekly, anchor))
    }

    #[test]
    fn weekly_template_matches_same_weekday_only() {
        let monday = d(2024, 1, 1);
        let t = weekly("t", monday, 540);

        let next_monday = expand(vec![], std::slice::from_ref(&t), d(2024, 1, 8));
        assert_eq!(next_monday.len(), 1);
        let entry = &next_monday[0];
        assert!(entry.is_virtual());
        assert_eq!(entry.block().start_time, 540);
        assert_eq!(entry.block().end_time(), 600);
        assert_eq!(entry.block().date, d(2024, 1, 8));
        assert_eq!(entry.reference().to_string(), "t-virtual-2024-01-08");

        assert!(expand(vec![], std::slice::from_ref(&t), d(2024, 1, 9)).is_empty());
    }

    #[test]
    fn template_does_not_match_before_anchor_or_on_exception() {
        let mut t = weekly("t", d(2024, 1, 8), 540);
        assert!(!template_matches(&t, d(2024, 1, 1)));
        assert!(template_matches(&t, d(2024, 1, 8)));
        t.add_exception(d(2024, 1, 15));
        assert!(!template_matches(&t, d(2024, 1, 15)));
        assert!(template_matches(&t, d(2024, 1, 22)));
    }

    #[test]
    fn weekday_series_matches_monday_to_friday() {
        let anchor = d(2024, 1, 3);
        let t = occurrence(
            "t",
            anchor,
            480,
            OccurrenceKind::template(Cadence::WeekdaySeries, anchor),
        );
        assert!(!template_matches(&t, d(2024, 1, 2)));
        assert!(template_matches(&t, d(2024, 1, 4)));
        assert!(template_matches(&t, d(2024, 1, 5)));
        assert!(!template_matches(&t, d(2024, 1, 6)));
        assert!(!template_matches(&t, d(2024, 1, 7)));
        assert!(template_matches(&t, d(2024, 1, 8)));
    }

    #[test]
    fn one_off_never_matches_as_template() {
        let o = occurrence("o", d(2024, 1, 1), 540, OccurrenceKind::one_off());
        assert!(!template_matches(&o, d(2024, 1, 8)));
    }

    #[test]
    fn merged_day_is_sorted_by_start() {
        let monday = d(2024, 1, 1);
        let templates = vec![weekly("late", monday, 900), weekly("early", monday, 420)];
        let one_offs = vec![
            occurrence("mid", d(2024, 1, 8), 600, OccurrenceKind::one_off()),
            occurrence("other-day", d(2024, 1, 9), 300, OccurrenceKind::one_off()),
        ];
        let day = expand(one_offs, &templates, d(2024, 1, 8));
        let ids: Vec<_> = day.iter().map(|r| r.block().id.as_str()).collect();
        assert_eq!(ids, ["early", "mid", "late"]);
    }
}
