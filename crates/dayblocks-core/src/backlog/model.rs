//! Backlog items: pending work waiting to be placed into blocks.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::block::{BacklogRef, NestedSubItem, SubItem, SubItemOrigin, GENERAL_BLOCK_TYPE};

/// Checklist entry of a backlog item. Same shape as a nested sub-item.
pub type BacklogSubItem = NestedSubItem;

/// Work linked to no block type, or to the general one.
pub fn is_general_type(linked_block_type: Option<&str>) -> bool {
    linked_block_type.map_or(true, |t| t == GENERAL_BLOCK_TYPE)
}

/// A deadline counts as urgent when it is tomorrow or earlier.
pub fn is_urgent_deadline(deadline: Option<NaiveDate>, today: NaiveDate) -> bool {
    deadline.is_some_and(|deadline| deadline <= today + chrono::Duration::days(1))
}

/// Declared priority. Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" | "med" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown priority '{other}' (expected low, medium or high)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BacklogStatus {
    #[default]
    Pending,
    Completed,
}

/// A unit of pending work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogItem {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    #[serde(default)]
    pub priority: Priority,
    pub estimated_duration: i32,
    #[serde(default)]
    pub linked_block_type: Option<String>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub status: BacklogStatus,
    #[serde(default)]
    pub sub_items: Vec<BacklogSubItem>,
    pub created_at: DateTime<Utc>,
}

impl BacklogItem {
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        title: impl Into<String>,
        estimated_duration: i32,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            title: title.into(),
            priority: Priority::Medium,
            estimated_duration,
            linked_block_type: None,
            deadline: None,
            status: BacklogStatus::Pending,
            sub_items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == BacklogStatus::Pending
    }

    /// Not tied to a specific block type.
    pub fn is_general(&self) -> bool {
        is_general_type(self.linked_block_type.as_deref())
    }

    /// Whether this item may go into a block of type `block_type`.
    pub fn fits_block_type(&self, block_type: Option<&str>) -> bool {
        self.is_general() || self.linked_block_type.as_deref() == block_type
    }

    /// First sub-item that is not done yet.
    pub fn next_pending_sub_item(&self) -> Option<(usize, &BacklogSubItem)> {
        self.sub_items.iter().enumerate().find(|(_, s)| !s.done)
    }

    pub fn all_sub_items_done(&self) -> bool {
        self.sub_items.iter().all(|s| s.done)
    }

    /// Due today, tomorrow, or already overdue.
    pub fn is_urgent(&self, today: NaiveDate) -> bool {
        is_urgent_deadline(self.deadline, today)
    }

    /// The whole item as a block sub-item; its checklist becomes nested items.
    pub fn to_sub_item(&self) -> SubItem {
        SubItem {
            title: self.title.clone(),
            duration: self.estimated_duration,
            done: false,
            pinned_time: None,
            origin: SubItemOrigin::FromBacklog,
            backlog_ref: Some(BacklogRef {
                item_id: self.id.clone(),
                nested_index: None,
            }),
            nested: self.sub_items.clone(),
        }
    }

    /// Re-create a detached block sub-item as pending backlog work.
    pub fn from_sub_item(id: impl Into<String>, owner_id: impl Into<String>, sub_item: &SubItem) -> Self {
        let mut item = Self::new(id, owner_id, sub_item.title.clone(), sub_item.duration);
        item.sub_items = sub_item.nested.clone();
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn urgency_covers_overdue_today_and_tomorrow() {
        let mut item = BacklogItem::new("b", "o", "Report", 30);
        let today = d(2024, 3, 10);
        assert!(!item.is_urgent(today));
        for (deadline, urgent) in [
            (d(2024, 3, 1), true),
            (d(2024, 3, 10), true),
            (d(2024, 3, 11), true),
            (d(2024, 3, 12), false),
        ] {
            item.deadline = Some(deadline);
            assert_eq!(item.is_urgent(today), urgent, "deadline {deadline}");
        }
    }

    #[test]
    fn block_type_matching() {
        let mut item = BacklogItem::new("b", "o", "Run", 30);
        assert!(item.fits_block_type(Some("fitness")));
        item.linked_block_type = Some("general".to_string());
        assert!(item.fits_block_type(None));
        item.linked_block_type = Some("fitness".to_string());
        assert!(item.fits_block_type(Some("fitness")));
        assert!(!item.fits_block_type(Some("study")));
        assert!(!item.fits_block_type(None));
    }

    #[test]
    fn next_pending_sub_item_skips_done() {
        let mut item = BacklogItem::new("b", "o", "Essay", 120);
        item.sub_items = vec![
            NestedSubItem { title: "Outline".into(), duration: 20, done: true },
            NestedSubItem { title: "Draft".into(), duration: 60, done: false },
        ];
        let (index, next) = item.next_pending_sub_item().unwrap();
        assert_eq!(index, 1);
        assert_eq!(next.title, "Draft");
        assert!(!item.all_sub_items_done());
    }

    #[test]
    fn converts_to_and_from_sub_items() {
        let mut item = BacklogItem::new("b-1", "o", "Essay", 90);
        item.sub_items = vec![NestedSubItem { title: "Draft".into(), duration: 60, done: false }];
        let sub = item.to_sub_item();
        assert_eq!(sub.origin, SubItemOrigin::FromBacklog);
        assert_eq!(sub.backlog_ref.as_ref().map(|r| r.item_id.as_str()), Some("b-1"));
        assert_eq!(sub.nested.len(), 1);

        let back = BacklogItem::from_sub_item("b-2", "o", &sub);
        assert_eq!(back.title, "Essay");
        assert_eq!(back.estimated_duration, 90);
        assert_eq!(back.sub_items, item.sub_items);
        assert!(back.is_pending());
    }

    #[test]
    fn priority_parses_and_orders() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
        assert!(Priority::High > Priority::Medium && Priority::Medium > Priority::Low);
    }
}
