//! Time blocks: the occurrence model, recurrence, layout and writes.

pub mod conflict;
pub mod fork;
pub mod layout;
mod model;
pub mod ops;
pub mod recurrence;
mod reference;

pub use conflict::{ensure_no_conflict, has_conflict};
pub use fork::{DeleteOutcome, ForkingEngine, MutationOutcome, MutationScope, Target};
pub use layout::{layout, layout_items, BlockLayout, PlacedSubItem};
pub use model::{
    check_max_duration, BacklogRef, BlockStatus, Cadence, NestedSubItem, Occurrence, OccurrenceDraft, OccurrenceKind,
    OccurrencePatch, RecurrenceRule, SubItem, SubItemOrigin, ValidationRules, GENERAL_BLOCK_TYPE,
};
pub use ops::SubItemOp;
pub use recurrence::{resolve, template_matches, ResolvedOccurrence, VirtualOccurrence};
pub use reference::OccurrenceRef;
