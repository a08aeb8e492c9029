//! Subcommand implementations.
//!
//! Every command loads the config, opens the SQLite store in the data
//! directory and prints its result as pretty JSON on stdout.

pub mod backlog;
pub mod block;
pub mod completions;
pub mod config;
pub mod day;
pub mod item;

use chrono::{Local, NaiveDate};
use dayblocks_core::time::parse_hhmm;
use dayblocks_core::{Config, DayPlanner, MutationScope, SqliteStore};
use serde::Serialize;
use tracing::debug;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Planner bound to the acting owner.
pub struct Session {
    pub planner: DayPlanner<SqliteStore>,
    pub owner: String,
}

impl Session {
    pub fn open(owner: Option<String>) -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::load()?;
        let owner = owner.unwrap_or_else(|| config.planner.owner_id.clone());
        let store = SqliteStore::open()?;
        debug!(%owner, config = %Config::path()?.display(), "session opened");
        Ok(Self {
            planner: DayPlanner::new(store, config),
            owner,
        })
    }
}

pub fn print_json<T: Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// `clap` value parser for `HH:MM` arguments.
pub fn parse_time(s: &str) -> Result<i32, String> {
    parse_hhmm(s).map_err(|e| e.to_string())
}

pub fn scope(series: bool) -> MutationScope {
    if series {
        MutationScope::Series
    } else {
        MutationScope::Instance
    }
}
