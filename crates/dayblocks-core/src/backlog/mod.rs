//! Backlog of pending work and the best-fit suggestion heuristic.

mod model;
pub mod suggest;

pub use model::{BacklogItem, BacklogStatus, BacklogSubItem, Priority};
pub use suggest::{
    best_fit, SplitCandidate, Suggestion, SuggestionEngine, SuggestionMode, SuggestionQuery,
    SuggestionReason,
};
