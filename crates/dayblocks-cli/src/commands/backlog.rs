use chrono::NaiveDate;
use clap::Subcommand;
use dayblocks_core::block::NestedSubItem;
use dayblocks_core::{BacklogDraft, BacklogFilter, Priority, SuggestionMode};

use super::{parse_time, print_json, today, CmdResult, Session};

/// `clap` value parser for `title:minutes` sub-items.
fn parse_sub_item(s: &str) -> Result<NestedSubItem, String> {
    let (title, minutes) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("expected title:minutes, got '{s}'"))?;
    let duration = minutes
        .trim()
        .parse::<i32>()
        .map_err(|_| format!("invalid minutes '{minutes}'"))?;
    Ok(NestedSubItem {
        title: title.trim().to_string(),
        duration,
        done: false,
    })
}

#[derive(Subcommand)]
pub enum BacklogAction {
    /// Add pending work
    Add {
        title: String,
        /// Estimated minutes
        #[arg(long)]
        duration: i32,
        /// low, medium or high
        #[arg(long, default_value = "medium")]
        priority: Priority,
        /// Only suggest inside blocks of this type
        #[arg(long)]
        block_type: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        deadline: Option<NaiveDate>,
        /// Sub-item as title:minutes (repeatable)
        #[arg(long = "sub", value_parser = parse_sub_item)]
        sub_items: Vec<NestedSubItem>,
    },
    /// List backlog items
    List {
        /// Include completed items
        #[arg(long)]
        all: bool,
    },
    /// Mark an item completed
    Done { id: String },
    /// Delete an item
    Delete { id: String },
    /// Turn an item into its own block
    Schedule {
        id: String,
        /// Date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Start time (HH:MM)
        #[arg(long, value_parser = parse_time)]
        start: i32,
    },
    /// Suggest work for a span of free minutes
    Suggest {
        #[arg(long)]
        budget: i32,
        /// block or gap
        #[arg(long, default_value = "gap")]
        mode: SuggestionMode,
        /// Type of the block being filled
        #[arg(long)]
        block_type: Option<String>,
        /// Print every candidate, best first
        #[arg(long)]
        all: bool,
        /// Reference day for deadline urgency (default: today)
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}

pub fn run(action: BacklogAction, owner: Option<String>) -> CmdResult {
    let mut session = Session::open(owner)?;
    let owner = session.owner.clone();
    let planner = &mut session.planner;

    match action {
        BacklogAction::Add {
            title,
            duration,
            priority,
            block_type,
            deadline,
            sub_items,
        } => {
            let item = planner.add_backlog_item(
                &owner,
                BacklogDraft {
                    title,
                    estimated_duration: duration,
                    priority,
                    linked_block_type: block_type,
                    deadline,
                    sub_items,
                },
            )?;
            print_json(&item)?;
        }
        BacklogAction::List { all } => {
            let filter = if all {
                BacklogFilter::All
            } else {
                BacklogFilter::Pending
            };
            print_json(&planner.list_backlog(&owner, filter)?)?;
        }
        BacklogAction::Done { id } => {
            print_json(&planner.complete_backlog_item(&owner, &id)?)?;
        }
        BacklogAction::Delete { id } => {
            planner.delete_backlog_item(&owner, &id)?;
            println!("deleted {id}");
        }
        BacklogAction::Schedule { id, date, start } => {
            let date = date.unwrap_or_else(today);
            print_json(&planner.schedule_backlog_item(&owner, &id, date, start)?)?;
        }
        BacklogAction::Suggest {
            budget,
            mode,
            block_type,
            all,
            today: now,
        } => {
            let now = now.unwrap_or_else(today);
            if all {
                let ranked = planner.suggestions(&owner, budget, mode, block_type.as_deref(), now)?;
                print_json(&ranked)?;
            } else {
                let best = planner.suggest(&owner, budget, mode, block_type.as_deref(), now)?;
                print_json(&best)?;
            }
        }
    }
    Ok(())
}
