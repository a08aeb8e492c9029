//! SQLite-based storage for occurrences and backlog items.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::error;

use super::{data_dir, migrations, BacklogFilter, BacklogStore, OccurrenceFilter, OccurrenceStore};
use crate::backlog::{BacklogItem, BacklogStatus, Priority};
use crate::block::{BlockStatus, Cadence, Occurrence, OccurrenceKind, RecurrenceRule};
use crate::error::{Result, StorageError};

const OCCURRENCE_COLUMNS: &str = "id, owner_id, title, date, start_time, total_duration, color, icon,
     block_type, status, kind, cadence, anchor_date, forked_from, exception_dates, sub_items";

const BACKLOG_COLUMNS: &str = "id, owner_id, title, priority, estimated_duration, linked_block_type,
     deadline, status, sub_items, created_at";

// === Helper Functions ===

fn format_status(status: BlockStatus) -> &'static str {
    match status {
        BlockStatus::Pending => "pending",
        BlockStatus::Completed => "completed",
    }
}

fn parse_status(s: &str) -> Option<BlockStatus> {
    match s {
        "pending" => Some(BlockStatus::Pending),
        "completed" => Some(BlockStatus::Completed),
        _ => None,
    }
}

fn format_cadence(cadence: Cadence) -> &'static str {
    match cadence {
        Cadence::Weekly => "weekly",
        Cadence::WeekdaySeries => "weekday_series",
    }
}

fn parse_cadence(s: &str) -> Option<Cadence> {
    match s {
        "weekly" => Some(Cadence::Weekly),
        "weekday_series" => Some(Cadence::WeekdaySeries),
        _ => None,
    }
}

fn format_priority(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "low",
        Priority::Medium => "medium",
        Priority::High => "high",
    }
}

fn format_backlog_status(status: BacklogStatus) -> &'static str {
    match status {
        BacklogStatus::Pending => "pending",
        BacklogStatus::Completed => "completed",
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(id: &str, s: &str) -> Result<NaiveDate, StorageError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| StorageError::CorruptRow {
        id: id.to_string(),
        message: format!("bad date '{s}': {e}"),
    })
}

fn corrupt(id: &str, message: impl Into<String>) -> StorageError {
    StorageError::CorruptRow {
        id: id.to_string(),
        message: message.into(),
    }
}

/// Log a failed SQLite call and convert it.
fn logged<T>(op: &'static str, result: rusqlite::Result<T>) -> Result<T, StorageError> {
    result.map_err(|e| {
        error!(op, error = %e, "sqlite call failed");
        StorageError::from(e)
    })
}

/// Raw columns of an `occurrences` row.
struct OccurrenceRow {
    id: String,
    owner_id: String,
    title: String,
    date: String,
    start_time: i32,
    total_duration: i32,
    color: String,
    icon: String,
    block_type: String,
    status: String,
    kind: String,
    cadence: Option<String>,
    anchor_date: Option<String>,
    forked_from: Option<String>,
    exception_dates: String,
    sub_items: String,
}

impl OccurrenceRow {
    fn read(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            title: row.get(2)?,
            date: row.get(3)?,
            start_time: row.get(4)?,
            total_duration: row.get(5)?,
            color: row.get(6)?,
            icon: row.get(7)?,
            block_type: row.get(8)?,
            status: row.get(9)?,
            kind: row.get(10)?,
            cadence: row.get(11)?,
            anchor_date: row.get(12)?,
            forked_from: row.get(13)?,
            exception_dates: row.get(14)?,
            sub_items: row.get(15)?,
        })
    }

    fn into_occurrence(self) -> Result<Occurrence, StorageError> {
        let id = self.id;
        let date = parse_date(&id, &self.date)?;
        let status = parse_status(&self.status)
            .ok_or_else(|| corrupt(&id, format!("unknown status '{}'", self.status)))?;

        let kind = match self.kind.as_str() {
            "one_off" => OccurrenceKind::OneOff {
                forked_from: self.forked_from,
            },
            "template" => {
                let cadence = self
                    .cadence
                    .as_deref()
                    .and_then(parse_cadence)
                    .ok_or_else(|| corrupt(&id, "template without a valid cadence"))?;
                let anchor_date = match self.anchor_date.as_deref() {
                    Some(s) => parse_date(&id, s)?,
                    None => date,
                };
                let exception_dates: BTreeSet<NaiveDate> =
                    serde_json::from_str(&self.exception_dates)?;
                OccurrenceKind::Template {
                    rule: RecurrenceRule {
                        cadence,
                        anchor_date,
                    },
                    exception_dates,
                }
            }
            other => return Err(corrupt(&id, format!("unknown kind '{other}'"))),
        };

        Ok(Occurrence {
            owner_id: self.owner_id,
            title: self.title,
            date,
            start_time: self.start_time,
            total_duration: self.total_duration,
            color: self.color,
            icon: self.icon,
            block_type: self.block_type,
            status,
            kind,
            sub_items: serde_json::from_str(&self.sub_items)?,
            id,
        })
    }
}

/// Column values for writing an occurrence.
struct OccurrenceColumns {
    kind: &'static str,
    cadence: Option<&'static str>,
    anchor_date: Option<String>,
    forked_from: Option<String>,
    exception_dates: String,
    sub_items: String,
}

impl OccurrenceColumns {
    fn of(occurrence: &Occurrence) -> Result<Self, StorageError> {
        let sub_items = serde_json::to_string(&occurrence.sub_items)?;
        Ok(match &occurrence.kind {
            OccurrenceKind::OneOff { forked_from } => Self {
                kind: "one_off",
                cadence: None,
                anchor_date: None,
                forked_from: forked_from.clone(),
                exception_dates: "[]".to_string(),
                sub_items,
            },
            OccurrenceKind::Template {
                rule,
                exception_dates,
            } => Self {
                kind: "template",
                cadence: Some(format_cadence(rule.cadence)),
                anchor_date: Some(format_date(rule.anchor_date)),
                forked_from: None,
                exception_dates: serde_json::to_string(exception_dates)?,
                sub_items,
            },
        })
    }
}

/// Raw columns of a `backlog_items` row.
struct BacklogRow {
    id: String,
    owner_id: String,
    title: String,
    priority: String,
    estimated_duration: i32,
    linked_block_type: Option<String>,
    deadline: Option<String>,
    status: String,
    sub_items: String,
    created_at: String,
}

impl BacklogRow {
    fn read(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            title: row.get(2)?,
            priority: row.get(3)?,
            estimated_duration: row.get(4)?,
            linked_block_type: row.get(5)?,
            deadline: row.get(6)?,
            status: row.get(7)?,
            sub_items: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    fn into_item(self) -> Result<BacklogItem, StorageError> {
        let id = self.id;
        let priority: Priority = self
            .priority
            .parse()
            .map_err(|e: String| corrupt(&id, e))?;
        let status = match self.status.as_str() {
            "pending" => BacklogStatus::Pending,
            "completed" => BacklogStatus::Completed,
            other => return Err(corrupt(&id, format!("unknown status '{other}'"))),
        };
        let deadline = self
            .deadline
            .as_deref()
            .map(|s| parse_date(&id, s))
            .transpose()?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| corrupt(&id, format!("bad created_at: {e}")))?;

        Ok(BacklogItem {
            owner_id: self.owner_id,
            title: self.title,
            priority,
            estimated_duration: self.estimated_duration,
            linked_block_type: self.linked_block_type,
            deadline,
            status,
            sub_items: serde_json::from_str(&self.sub_items)?,
            created_at,
            id,
        })
    }
}

/// SQLite database holding every owner's occurrences and backlog.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open the database at `<data_dir>/dayblocks.db`.
    ///
    /// Creates tables if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("dayblocks.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) the database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        migrations::migrate(&conn).map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    fn query_occurrence_rows(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Occurrence>, StorageError> {
        let mut stmt = logged("prepare occurrences query", self.conn.prepare(sql))?;
        let rows = logged(
            "query occurrences",
            stmt.query_map(params, OccurrenceRow::read)
                .and_then(|mapped| mapped.collect::<rusqlite::Result<Vec<_>>>()),
        )?;
        rows.into_iter().map(OccurrenceRow::into_occurrence).collect()
    }
}

impl OccurrenceStore for SqliteStore {
    fn get_occurrence(&self, owner_id: &str, id: &str) -> Result<Option<Occurrence>, StorageError> {
        let sql = format!("SELECT {OCCURRENCE_COLUMNS} FROM occurrences WHERE id = ?1 AND owner_id = ?2");
        let row = logged(
            "get occurrence",
            self.conn
                .query_row(&sql, params![id, owner_id], OccurrenceRow::read)
                .optional(),
        )?;
        row.map(OccurrenceRow::into_occurrence).transpose()
    }

    fn query_occurrences(
        &self,
        owner_id: &str,
        filter: &OccurrenceFilter,
    ) -> Result<Vec<Occurrence>, StorageError> {
        match filter {
            OccurrenceFilter::OneOffOn(date) => self.query_occurrence_rows(
                &format!(
                    "SELECT {OCCURRENCE_COLUMNS} FROM occurrences
                     WHERE owner_id = ?1 AND kind = 'one_off' AND date = ?2
                     ORDER BY start_time, id"
                ),
                &[&owner_id, &format_date(*date)],
            ),
            OccurrenceFilter::Templates => self.query_occurrence_rows(
                &format!(
                    "SELECT {OCCURRENCE_COLUMNS} FROM occurrences
                     WHERE owner_id = ?1 AND kind = 'template'
                     ORDER BY start_time, id"
                ),
                &[&owner_id],
            ),
            OccurrenceFilter::ForkedFrom(template_id) => self.query_occurrence_rows(
                &format!(
                    "SELECT {OCCURRENCE_COLUMNS} FROM occurrences
                     WHERE owner_id = ?1 AND forked_from = ?2
                     ORDER BY start_time, id"
                ),
                &[&owner_id, template_id],
            ),
        }
    }

    fn insert_occurrence(&mut self, occurrence: &Occurrence) -> Result<String, StorageError> {
        let cols = OccurrenceColumns::of(occurrence)?;
        logged(
            "insert occurrence",
            self.conn.execute(
                &format!(
                    "INSERT INTO occurrences ({OCCURRENCE_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
                ),
                params![
                    occurrence.id,
                    occurrence.owner_id,
                    occurrence.title,
                    format_date(occurrence.date),
                    occurrence.start_time,
                    occurrence.total_duration,
                    occurrence.color,
                    occurrence.icon,
                    occurrence.block_type,
                    format_status(occurrence.status),
                    cols.kind,
                    cols.cadence,
                    cols.anchor_date,
                    cols.forked_from,
                    cols.exception_dates,
                    cols.sub_items,
                ],
            ),
        )?;
        Ok(occurrence.id.clone())
    }

    fn update_occurrence(&mut self, occurrence: &Occurrence) -> Result<(), StorageError> {
        let cols = OccurrenceColumns::of(occurrence)?;
        let changed = logged(
            "update occurrence",
            self.conn.execute(
                "UPDATE occurrences SET
                    title = ?3, date = ?4, start_time = ?5, total_duration = ?6, color = ?7,
                    icon = ?8, block_type = ?9, status = ?10, kind = ?11, cadence = ?12,
                    anchor_date = ?13, forked_from = ?14, exception_dates = ?15, sub_items = ?16
                 WHERE id = ?1 AND owner_id = ?2",
                params![
                    occurrence.id,
                    occurrence.owner_id,
                    occurrence.title,
                    format_date(occurrence.date),
                    occurrence.start_time,
                    occurrence.total_duration,
                    occurrence.color,
                    occurrence.icon,
                    occurrence.block_type,
                    format_status(occurrence.status),
                    cols.kind,
                    cols.cadence,
                    cols.anchor_date,
                    cols.forked_from,
                    cols.exception_dates,
                    cols.sub_items,
                ],
            ),
        )?;
        if changed == 0 {
            return Err(StorageError::MissingRecord {
                id: occurrence.id.clone(),
            });
        }
        Ok(())
    }

    fn delete_occurrence(&mut self, owner_id: &str, id: &str) -> Result<(), StorageError> {
        let changed = logged(
            "delete occurrence",
            self.conn.execute(
                "DELETE FROM occurrences WHERE id = ?1 AND owner_id = ?2",
                params![id, owner_id],
            ),
        )?;
        if changed == 0 {
            return Err(StorageError::MissingRecord { id: id.to_string() });
        }
        Ok(())
    }
}

impl BacklogStore for SqliteStore {
    fn get_backlog_item(&self, owner_id: &str, id: &str) -> Result<Option<BacklogItem>, StorageError> {
        let sql = format!("SELECT {BACKLOG_COLUMNS} FROM backlog_items WHERE id = ?1 AND owner_id = ?2");
        let row = logged(
            "get backlog item",
            self.conn
                .query_row(&sql, params![id, owner_id], BacklogRow::read)
                .optional(),
        )?;
        row.map(BacklogRow::into_item).transpose()
    }

    fn list_backlog(&self, owner_id: &str, filter: BacklogFilter) -> Result<Vec<BacklogItem>, StorageError> {
        let status_clause = match filter {
            BacklogFilter::Pending => "AND status = 'pending'",
            BacklogFilter::All => "",
        };
        let sql = format!(
            "SELECT {BACKLOG_COLUMNS} FROM backlog_items
             WHERE owner_id = ?1 {status_clause}
             ORDER BY created_at, id"
        );
        let mut stmt = logged("prepare backlog query", self.conn.prepare(&sql))?;
        let rows = logged(
            "list backlog",
            stmt.query_map(params![owner_id], BacklogRow::read)
                .and_then(|mapped| mapped.collect::<rusqlite::Result<Vec<_>>>()),
        )?;
        rows.into_iter().map(BacklogRow::into_item).collect()
    }

    fn insert_backlog_item(&mut self, item: &BacklogItem) -> Result<String, StorageError> {
        logged(
            "insert backlog item",
            self.conn.execute(
                &format!(
                    "INSERT INTO backlog_items ({BACKLOG_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                params![
                    item.id,
                    item.owner_id,
                    item.title,
                    format_priority(item.priority),
                    item.estimated_duration,
                    item.linked_block_type,
                    item.deadline.map(format_date),
                    format_backlog_status(item.status),
                    serde_json::to_string(&item.sub_items)?,
                    item.created_at.to_rfc3339(),
                ],
            ),
        )?;
        Ok(item.id.clone())
    }

    fn update_backlog_item(&mut self, item: &BacklogItem) -> Result<(), StorageError> {
        let changed = logged(
            "update backlog item",
            self.conn.execute(
                "UPDATE backlog_items SET
                    title = ?3, priority = ?4, estimated_duration = ?5, linked_block_type = ?6,
                    deadline = ?7, status = ?8, sub_items = ?9
                 WHERE id = ?1 AND owner_id = ?2",
                params![
                    item.id,
                    item.owner_id,
                    item.title,
                    format_priority(item.priority),
                    item.estimated_duration,
                    item.linked_block_type,
                    item.deadline.map(format_date),
                    format_backlog_status(item.status),
                    serde_json::to_string(&item.sub_items)?,
                ],
            ),
        )?;
        if changed == 0 {
            return Err(StorageError::MissingRecord {
                id: item.id.clone(),
            });
        }
        Ok(())
    }

    fn delete_backlog_item(&mut self, owner_id: &str, id: &str) -> Result<(), StorageError> {
        let changed = logged(
            "delete backlog item",
            self.conn.execute(
                "DELETE FROM backlog_items WHERE id = ?1 AND owner_id = ?2",
                params![id, owner_id],
            ),
        )?;
        if changed == 0 {
            return Err(StorageError::MissingRecord { id: id.to_string() });
        }
        Ok(())
    }
}
