//! In-memory store for tests and embedders that persist elsewhere.

use std::collections::BTreeMap;

use super::{BacklogFilter, BacklogStore, OccurrenceFilter, OccurrenceStore};
use crate::backlog::BacklogItem;
use crate::block::Occurrence;
use crate::error::StorageError;

/// `BTreeMap`-backed store keyed by id.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    occurrences: BTreeMap<String, Occurrence>,
    backlog: BTreeMap<String, BacklogItem>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows of every owner, for assertions in tests.
    pub fn occurrence_count(&self) -> usize {
        self.occurrences.len()
    }

    pub fn backlog_count(&self) -> usize {
        self.backlog.len()
    }
}

impl OccurrenceStore for MemoryStore {
    fn get_occurrence(&self, owner_id: &str, id: &str) -> Result<Option<Occurrence>, StorageError> {
        Ok(self
            .occurrences
            .get(id)
            .filter(|o| o.owner_id == owner_id)
            .cloned())
    }

    fn query_occurrences(
        &self,
        owner_id: &str,
        filter: &OccurrenceFilter,
    ) -> Result<Vec<Occurrence>, StorageError> {
        let mut rows: Vec<Occurrence> = self
            .occurrences
            .values()
            .filter(|o| o.owner_id == owner_id && filter.matches(o))
            .cloned()
            .collect();
        rows.sort_by_key(|o| o.start_time);
        Ok(rows)
    }

    fn insert_occurrence(&mut self, occurrence: &Occurrence) -> Result<String, StorageError> {
        if self.occurrences.contains_key(&occurrence.id) {
            return Err(StorageError::QueryFailed(format!(
                "duplicate occurrence id {}",
                occurrence.id
            )));
        }
        self.occurrences
            .insert(occurrence.id.clone(), occurrence.clone());
        Ok(occurrence.id.clone())
    }

    fn update_occurrence(&mut self, occurrence: &Occurrence) -> Result<(), StorageError> {
        match self.occurrences.get_mut(&occurrence.id) {
            Some(existing) if existing.owner_id == occurrence.owner_id => {
                *existing = occurrence.clone();
                Ok(())
            }
            _ => Err(StorageError::MissingRecord {
                id: occurrence.id.clone(),
            }),
        }
    }

    fn delete_occurrence(&mut self, owner_id: &str, id: &str) -> Result<(), StorageError> {
        match self.occurrences.get(id) {
            Some(existing) if existing.owner_id == owner_id => {
                self.occurrences.remove(id);
                Ok(())
            }
            _ => Err(StorageError::MissingRecord { id: id.to_string() }),
        }
    }
}

impl BacklogStore for MemoryStore {
    fn get_backlog_item(&self, owner_id: &str, id: &str) -> Result<Option<BacklogItem>, StorageError> {
        Ok(self
            .backlog
            .get(id)
            .filter(|b| b.owner_id == owner_id)
            .cloned())
    }

    fn list_backlog(&self, owner_id: &str, filter: BacklogFilter) -> Result<Vec<BacklogItem>, StorageError> {
        let mut rows: Vec<BacklogItem> = self
            .backlog
            .values()
            .filter(|b| b.owner_id == owner_id)
            .filter(|b| filter == BacklogFilter::All || b.is_pending())
            .cloned()
            .collect();
        rows.sort_by_key(|b| b.created_at);
        Ok(rows)
    }

    fn insert_backlog_item(&mut self, item: &BacklogItem) -> Result<String, StorageError> {
        if self.backlog.contains_key(&item.id) {
            return Err(StorageError::QueryFailed(format!(
                "duplicate backlog id {}",
                item.id
            )));
        }
        self.backlog.insert(item.id.clone(), item.clone());
        Ok(item.id.clone())
    }

    fn update_backlog_item(&mut self, item: &BacklogItem) -> Result<(), StorageError> {
        match self.backlog.get_mut(&item.id) {
            Some(existing) if existing.owner_id == item.owner_id => {
                *existing = item.clone();
                Ok(())
            }
            _ => Err(StorageError::MissingRecord {
                id: item.id.clone(),
            }),
        }
    }

    fn delete_backlog_item(&mut self, owner_id: &str, id: &str) -> Result<(), StorageError> {
        match self.backlog.get(id) {
            Some(existing) if existing.owner_id == owner_id => {
                self.backlog.remove(id);
                Ok(())
            }
            _ => Err(StorageError::MissingRecord { id: id.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockStatus, OccurrenceKind, GENERAL_BLOCK_TYPE};
    use chrono::NaiveDate;

    fn occurrence(id: &str, owner: &str) -> Occurrence {
        Occurrence {
            id: id.to_string(),
            owner_id: owner.to_string(),
            title: "Block".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            start_time: 540,
            total_duration: 60,
            color: "#000".to_string(),
            icon: "clock".to_string(),
            block_type: GENERAL_BLOCK_TYPE.to_string(),
            status: BlockStatus::Pending,
            kind: OccurrenceKind::one_off(),
            sub_items: Vec::new(),
        }
    }

    #[test]
    fn reads_are_owner_scoped() {
        let mut store = MemoryStore::new();
        store.insert_occurrence(&occurrence("a", "alice")).unwrap();
        assert!(store.get_occurrence("alice", "a").unwrap().is_some());
        assert!(store.get_occurrence("bob", "a").unwrap().is_none());
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(store
            .query_occurrences("bob", &OccurrenceFilter::OneOffOn(date))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn writes_are_owner_scoped() {
        let mut store = MemoryStore::new();
        store.insert_occurrence(&occurrence("a", "alice")).unwrap();

        let mut hijack = occurrence("a", "bob");
        hijack.title = "mine now".to_string();
        assert!(matches!(
            store.update_occurrence(&hijack),
            Err(StorageError::MissingRecord { .. })
        ));
        assert!(store.delete_occurrence("bob", "a").is_err());
        assert_eq!(store.get_occurrence("alice", "a").unwrap().unwrap().title, "Block");
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut store = MemoryStore::new();
        store.insert_occurrence(&occurrence("a", "alice")).unwrap();
        assert!(store.insert_occurrence(&occurrence("a", "alice")).is_err());
    }
}
