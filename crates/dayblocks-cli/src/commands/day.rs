use chrono::NaiveDate;
use clap::Subcommand;
use dayblocks_core::time::{format_duration, format_range};
use dayblocks_core::{DayPlan, Suggestion};

use super::{print_json, today, CmdResult, Session};

#[derive(Subcommand)]
pub enum DayAction {
    /// Show blocks, layouts, gaps and suggestions for a day
    Show {
        /// Date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Reference day for deadline urgency (default: today)
        #[arg(long)]
        today: Option<NaiveDate>,
        /// Print a readable agenda instead of JSON
        #[arg(long)]
        text: bool,
    },
}

fn suggestion_text(suggestion: &Suggestion) -> String {
    format!("{} ({})", suggestion.title(), format_duration(suggestion.duration()))
}

/// One line per block and per gap, in start order.
fn agenda(plan: &DayPlan) -> Vec<(i32, String)> {
    let mut lines = Vec::with_capacity(plan.entries.len() + plan.gaps.len());
    for entry in &plan.entries {
        let block = entry.occurrence.block();
        let mut line = format!(
            "{}  {} ({})",
            format_range(block.start_time, block.total_duration),
            block.title,
            format_duration(block.total_duration)
        );
        if entry.capacity_conflict {
            line.push_str(&format!(
                " needs {}",
                format_duration(entry.layout.needed_minutes)
            ));
        }
        if let Some(suggestion) = &entry.suggestion {
            line.push_str(&format!(" + {}", suggestion_text(suggestion)));
        }
        line.push_str(&format!("  [{}]", entry.token));
        lines.push((block.start_time, line));
    }
    for planned in &plan.gaps {
        let mut line = format!(
            "{}  free ({})",
            planned.gap.label(),
            format_duration(planned.gap.duration_minutes())
        );
        if let Some(suggestion) = &planned.suggestion {
            line.push_str(&format!(" + {}", suggestion_text(suggestion)));
        }
        lines.push((planned.gap.start, line));
    }
    lines.sort_by_key(|(start, _)| *start);
    lines
}

pub fn run(action: DayAction, owner: Option<String>) -> CmdResult {
    let session = Session::open(owner)?;

    match action {
        DayAction::Show {
            date,
            today: now,
            text,
        } => {
            let now = now.unwrap_or_else(today);
            let plan = session
                .planner
                .day_plan(&session.owner, date.unwrap_or(now), now)?;
            if text {
                println!("{}", plan.date);
                for (_, line) in agenda(&plan) {
                    println!("{line}");
                }
            } else {
                print_json(&plan)?;
            }
        }
    }
    Ok(())
}
