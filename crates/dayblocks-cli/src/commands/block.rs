//! Time block commands.

use chrono::NaiveDate;
use clap::{Subcommand, ValueEnum};
use dayblocks_core::{Cadence, OccurrenceDraft, OccurrencePatch, OccurrenceRef};

use super::{parse_time, print_json, scope, CmdResult, Session};

#[derive(Clone, Copy, ValueEnum)]
pub enum CadenceArg {
    /// Same weekday every week
    Weekly,
    /// Monday through Friday
    Weekdays,
}

impl From<CadenceArg> for Cadence {
    fn from(arg: CadenceArg) -> Self {
        match arg {
            CadenceArg::Weekly => Cadence::Weekly,
            CadenceArg::Weekdays => Cadence::WeekdaySeries,
        }
    }
}

#[derive(Subcommand)]
pub enum BlockAction {
    /// Create a one-off block
    Create {
        title: String,
        /// Date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Start time (HH:MM)
        #[arg(long, value_parser = parse_time)]
        start: i32,
        /// Length in minutes
        #[arg(long)]
        duration: i32,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        /// Block type used to match backlog work (default: general)
        #[arg(long = "type")]
        block_type: Option<String>,
    },
    /// Create a recurring block
    Repeat {
        title: String,
        /// First date of the series (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Start time (HH:MM)
        #[arg(long, value_parser = parse_time)]
        start: i32,
        /// Length in minutes
        #[arg(long)]
        duration: i32,
        #[arg(long, value_enum, default_value = "weekly")]
        cadence: CadenceArg,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long = "type")]
        block_type: Option<String>,
    },
    /// Change title, color, icon or type
    Edit {
        /// Block id or `<template>-virtual-<date>` token
        reference: OccurrenceRef,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long = "type")]
        block_type: Option<String>,
        /// Apply to the whole series
        #[arg(long)]
        series: bool,
    },
    /// Move a block to a new start time
    Move {
        reference: OccurrenceRef,
        /// New start time (HH:MM)
        #[arg(value_parser = parse_time)]
        start: i32,
        #[arg(long)]
        series: bool,
    },
    /// Move a block by a drag distance in pixels
    Drag {
        reference: OccurrenceRef,
        /// Signed drag distance
        #[arg(allow_negative_numbers = true)]
        pixels: f64,
        #[arg(long)]
        series: bool,
    },
    /// Toggle pending/completed for one date
    Status { reference: OccurrenceRef },
    /// Grow a block so all its sub-items fit
    ResizeFit {
        reference: OccurrenceRef,
        #[arg(long)]
        series: bool,
    },
    /// Delete a block, one date of a series, or the series
    Delete {
        reference: OccurrenceRef,
        /// Delete the series (a weekday series only loses this weekday)
        #[arg(long)]
        series: bool,
    },
}

pub fn run(action: BlockAction, owner: Option<String>) -> CmdResult {
    let mut session = Session::open(owner)?;
    let owner = session.owner.clone();
    let planner = &mut session.planner;

    match action {
        BlockAction::Create {
            title,
            date,
            start,
            duration,
            color,
            icon,
            block_type,
        } => {
            let block = planner.create_one_off(
                &owner,
                OccurrenceDraft {
                    title,
                    date,
                    start_time: start,
                    total_duration: duration,
                    color,
                    icon,
                    block_type,
                    sub_items: Vec::new(),
                },
            )?;
            print_json(&block)?;
        }
        BlockAction::Repeat {
            title,
            date,
            start,
            duration,
            cadence,
            color,
            icon,
            block_type,
        } => {
            let template = planner.create_template(
                &owner,
                OccurrenceDraft {
                    title,
                    date,
                    start_time: start,
                    total_duration: duration,
                    color,
                    icon,
                    block_type,
                    sub_items: Vec::new(),
                },
                cadence.into(),
            )?;
            print_json(&template)?;
        }
        BlockAction::Edit {
            reference,
            title,
            color,
            icon,
            block_type,
            series,
        } => {
            let patch = OccurrencePatch {
                title,
                color,
                icon,
                block_type,
                ..OccurrencePatch::default()
            };
            if patch.is_empty() {
                return Err("nothing to change: pass --title, --color, --icon or --type".into());
            }
            let outcome = planner.update_occurrence(&owner, &reference, &patch, scope(series))?;
            print_json(&outcome)?;
        }
        BlockAction::Move {
            reference,
            start,
            series,
        } => {
            let outcome = planner.move_occurrence(&owner, &reference, start, scope(series))?;
            print_json(&outcome)?;
        }
        BlockAction::Drag {
            reference,
            pixels,
            series,
        } => {
            let outcome = planner.drag_occurrence(&owner, &reference, pixels, scope(series))?;
            print_json(&outcome)?;
        }
        BlockAction::Status { reference } => {
            let outcome = planner.toggle_status(&owner, &reference)?;
            print_json(&outcome)?;
        }
        BlockAction::ResizeFit { reference, series } => {
            let outcome = planner.resize_to_fit(&owner, &reference, scope(series))?;
            print_json(&outcome)?;
        }
        BlockAction::Delete { reference, series } => {
            let outcome = planner.delete_occurrence(&owner, &reference, scope(series))?;
            print_json(&outcome)?;
        }
    }
    Ok(())
}
