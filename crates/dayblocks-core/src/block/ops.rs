//! Edits to a block's sub-item list.

use serde::{Deserialize, Serialize};

use super::model::SubItem;
use crate::error::ValidationError;

/// One edit of a sub-item list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SubItemOp {
    Add { item: SubItem },
    Remove { index: usize },
    ToggleDone { index: usize },
    /// Toggle one checklist entry; the parent is done once all entries are
    ToggleNested { index: usize, nested_index: usize },
    /// Pin to a clock time, or unpin with `None`
    SetPin {
        index: usize,
        pinned_time: Option<i32>,
    },
    Reorder { from: usize, to: usize },
}

fn check_index(collection: &str, index: usize, len: usize) -> Result<(), ValidationError> {
    if index >= len {
        return Err(ValidationError::OutOfBounds {
            collection: collection.to_string(),
            index,
            len,
        });
    }
    Ok(())
}

impl SubItemOp {
    /// Apply to `items`. Returns the removed sub-item for [`SubItemOp::Remove`].
    ///
    /// Pin bounds are not checked here; the block is validated as a whole
    /// after the edit.
    pub fn apply(&self, items: &mut Vec<SubItem>) -> Result<Option<SubItem>, ValidationError> {
        match self {
            Self::Add { item } => {
                items.push(item.clone());
                Ok(None)
            }
            Self::Remove { index } => {
                check_index("sub_items", *index, items.len())?;
                Ok(Some(items.remove(*index)))
            }
            Self::ToggleDone { index } => {
                check_index("sub_items", *index, items.len())?;
                let item = &mut items[*index];
                item.done = !item.done;
                Ok(None)
            }
            Self::ToggleNested {
                index,
                nested_index,
            } => {
                check_index("sub_items", *index, items.len())?;
                let item = &mut items[*index];
                check_index("nested", *nested_index, item.nested.len())?;
                let nested = &mut item.nested[*nested_index];
                nested.done = !nested.done;
                item.done = item.nested.iter().all(|n| n.done);
                Ok(None)
            }
            Self::SetPin { index, pinned_time } => {
                check_index("sub_items", *index, items.len())?;
                items[*index].pinned_time = *pinned_time;
                Ok(None)
            }
            Self::Reorder { from, to } => {
                check_index("sub_items", *from, items.len())?;
                check_index("sub_items", *to, items.len())?;
                let moved = items.remove(*from);
                items.insert(*to, moved);
                Ok(None)
            }
        }
    }
}
