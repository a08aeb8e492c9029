//! Integration tests for the planner on top of SQLite.
//!
//! Covers forks, splits and backlog consumption surviving a reopen of the
//! database file.

use chrono::NaiveDate;
use dayblocks_core::storage::migrations::{get_schema_version, CURRENT_VERSION};
use dayblocks_core::{
    BacklogDraft, BacklogFilter, BlockStatus, Cadence, Config, DayPlanner, MutationScope,
    OccurrenceDraft, OccurrenceRef, SqliteStore, SubItem, SubItemOp,
};

const OWNER: &str = "local";

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn draft(title: &str, date: NaiveDate, start: i32, duration: i32) -> OccurrenceDraft {
    OccurrenceDraft {
        title: title.to_string(),
        date: Some(date),
        start_time: start,
        total_duration: duration,
        ..OccurrenceDraft::default()
    }
}

#[test]
fn fork_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dayblocks.db");

    let template_id = {
        let mut p = DayPlanner::new(SqliteStore::open_at(&path).unwrap(), Config::default());
        let template = p
            .create_template(OWNER, draft("Review", d(2024, 1, 1), 540, 60), Cadence::Weekly)
            .unwrap();
        let reference = OccurrenceRef::virtual_on(template.id.clone(), d(2024, 1, 8));
        p.apply_sub_item_op(
            OWNER,
            &reference,
            &SubItemOp::Add {
                item: SubItem::new("Inbox", 15).pinned_at(550),
            },
            MutationScope::Instance,
        )
        .unwrap();
        p.toggle_status(OWNER, &reference).unwrap();
        template.id
    };

    let p = DayPlanner::new(SqliteStore::open_at(&path).unwrap(), Config::default());
    let day = p.resolve_day(OWNER, d(2024, 1, 8)).unwrap();
    assert_eq!(day.len(), 1);
    assert!(!day[0].is_virtual());
    let fork = day[0].block();
    assert_eq!(fork.forked_from(), Some(template_id.as_str()));
    assert_eq!(fork.status, BlockStatus::Completed);
    assert_eq!(fork.sub_items[0].pinned_time, Some(550));

    let next = p.resolve_day(OWNER, d(2024, 1, 15)).unwrap();
    assert!(next[0].is_virtual());
    assert!(next[0].block().sub_items.is_empty());
}

#[test]
fn weekday_split_and_backlog_in_sqlite() {
    let mut p = DayPlanner::new(SqliteStore::open_memory().unwrap(), Config::default());
    let template = p
        .create_template(OWNER, draft("Standup", d(2024, 1, 1), 540, 15), Cadence::WeekdaySeries)
        .unwrap();
    p.delete_occurrence(
        OWNER,
        &OccurrenceRef::virtual_on(template.id, d(2024, 1, 3)),
        MutationScope::Series,
    )
    .unwrap();
    assert!(p.resolve_day(OWNER, d(2024, 1, 10)).unwrap().is_empty());
    assert_eq!(p.resolve_day(OWNER, d(2024, 1, 11)).unwrap().len(), 1);

    let item = p
        .add_backlog_item(
            OWNER,
            BacklogDraft {
                title: "Taxes".to_string(),
                estimated_duration: 45,
                deadline: Some(d(2024, 4, 15)),
                ..BacklogDraft::default()
            },
        )
        .unwrap();
    let block = p.schedule_backlog_item(OWNER, &item.id, d(2024, 1, 10), 600).unwrap();
    assert_eq!(block.title, "Taxes");
    assert!(p.list_backlog(OWNER, BacklogFilter::All).unwrap().is_empty());
    assert_eq!(p.resolve_day(OWNER, d(2024, 1, 10)).unwrap().len(), 1);
}

#[test]
fn reopened_database_is_at_current_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dayblocks.db");
    drop(SqliteStore::open_at(&path).unwrap());

    let conn = rusqlite::Connection::open(&path).unwrap();
    assert_eq!(get_schema_version(&conn), CURRENT_VERSION);
}
