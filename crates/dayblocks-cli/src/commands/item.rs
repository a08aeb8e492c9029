//! Sub-item commands. Each takes the block id or a virtual token.

use clap::Subcommand;
use dayblocks_core::{OccurrenceRef, SubItem, SubItemOp};

use super::{parse_time, print_json, scope, CmdResult, Session};

#[derive(Subcommand)]
pub enum ItemAction {
    /// Add a sub-item
    Add {
        reference: OccurrenceRef,
        title: String,
        /// Length in minutes
        #[arg(long)]
        duration: i32,
        /// Pin to a clock time (HH:MM)
        #[arg(long, value_parser = parse_time)]
        pin: Option<i32>,
        /// Add to every date of the series
        #[arg(long)]
        series: bool,
    },
    /// Remove a sub-item
    Remove { reference: OccurrenceRef, index: usize },
    /// Toggle a sub-item, or one of its checklist entries with --nested
    Toggle {
        reference: OccurrenceRef,
        index: usize,
        #[arg(long)]
        nested: Option<usize>,
    },
    /// Pin a sub-item to a clock time
    Pin {
        reference: OccurrenceRef,
        index: usize,
        /// Time (HH:MM)
        #[arg(value_parser = parse_time)]
        time: i32,
    },
    /// Let a pinned sub-item flow again
    Unpin { reference: OccurrenceRef, index: usize },
    /// Move a sub-item to another position
    Reorder {
        reference: OccurrenceRef,
        from: usize,
        to: usize,
    },
    /// Move a sub-item back to the backlog
    Detach { reference: OccurrenceRef, index: usize },
    /// Put a whole backlog item into the block
    Assign {
        reference: OccurrenceRef,
        backlog_id: String,
    },
    /// Put one part of a backlog item into the block
    AssignSplit {
        reference: OccurrenceRef,
        backlog_id: String,
        /// Index of the backlog item's sub-item
        index: usize,
    },
}

pub fn run(action: ItemAction, owner: Option<String>) -> CmdResult {
    let mut session = Session::open(owner)?;
    let owner = session.owner.clone();
    let planner = &mut session.planner;

    let (reference, op, series) = match action {
        ItemAction::Add {
            reference,
            title,
            duration,
            pin,
            series,
        } => {
            let mut item = SubItem::new(title, duration);
            item.pinned_time = pin;
            (reference, SubItemOp::Add { item }, series)
        }
        ItemAction::Remove { reference, index } => (reference, SubItemOp::Remove { index }, false),
        ItemAction::Toggle {
            reference,
            index,
            nested,
        } => {
            let op = match nested {
                Some(nested_index) => SubItemOp::ToggleNested { index, nested_index },
                None => SubItemOp::ToggleDone { index },
            };
            (reference, op, false)
        }
        ItemAction::Pin {
            reference,
            index,
            time,
        } => (
            reference,
            SubItemOp::SetPin {
                index,
                pinned_time: Some(time),
            },
            false,
        ),
        ItemAction::Unpin { reference, index } => (
            reference,
            SubItemOp::SetPin {
                index,
                pinned_time: None,
            },
            false,
        ),
        ItemAction::Reorder { reference, from, to } => (reference, SubItemOp::Reorder { from, to }, false),
        ItemAction::Detach { reference, index } => {
            let outcome = planner.detach_sub_item(&owner, &reference, index)?;
            return print_json(&outcome);
        }
        ItemAction::Assign {
            reference,
            backlog_id,
        } => {
            let outcome = planner.assign_backlog_item(&owner, &reference, &backlog_id)?;
            return print_json(&outcome);
        }
        ItemAction::AssignSplit {
            reference,
            backlog_id,
            index,
        } => {
            let outcome = planner.assign_split(&owner, &reference, &backlog_id, index)?;
            return print_json(&outcome);
        }
    };

    let outcome = planner.apply_sub_item_op(&owner, &reference, &op, scope(series))?;
    print_json(&outcome)
}
