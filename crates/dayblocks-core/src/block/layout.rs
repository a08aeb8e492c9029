//! Chronological placement of sub-items inside a block.
//!
//! Pinned sub-items keep their clock time. Floating ones are placed greedily
//! at the leftmost point after the block start that does not overlap anything
//! already placed, in list order. The result is sorted by computed start,
//! annotated with the idle time before each item and whether it spills past
//! the end of the block.
//!
//! Greedy leftmost-fit is order-dependent and not gap-optimal; with the
//! handful of items a block holds, the O(n²) scan is fine.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::model::{Occurrence, SubItem};

/// A sub-item with its computed position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedSubItem {
    /// Position in the occurrence's sub-item list
    pub index: usize,
    pub item: SubItem,
    pub computed_start: i32,
    pub computed_end: i32,
    pub gap_before_minutes: i32,
    pub is_past_block_end: bool,
    /// Pinned, but pushed off its pin by an overlapping earlier pin
    #[serde(default)]
    pub displaced: bool,
}

/// Layout of one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockLayout {
    pub block_start: i32,
    pub block_end: i32,
    pub items: Vec<PlacedSubItem>,
    /// End of the last placed item, never before the block start
    pub flow_end: i32,
    /// Minutes from block start to flow end
    pub needed_minutes: i32,
    pub total_gap_minutes: i32,
    /// Longest idle stretch inside the block, including after the last item
    pub largest_free_slot_minutes: i32,
}

impl BlockLayout {
    pub fn declared_minutes(&self) -> i32 {
        self.block_end - self.block_start
    }

    /// Items need more time than the block declares.
    pub fn has_capacity_conflict(&self) -> bool {
        self.needed_minutes > self.declared_minutes()
    }

    pub fn overflow_minutes(&self) -> i32 {
        (self.needed_minutes - self.declared_minutes()).max(0)
    }

    /// Duration that would make every item fit ("resize to fit").
    pub fn fit_duration(&self) -> i32 {
        self.needed_minutes.max(self.declared_minutes())
    }
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    start: i32,
    end: i32,
}

/// Earliest point at or after `from` where `[point, point + duration)` avoids
/// every segment.
fn leftmost_fit(segments: &[Segment], from: i32, duration: i32) -> i32 {
    let mut point = from;
    while let Some(blocking) = segments
        .iter()
        .find(|s| point < s.end && point + duration > s.start)
    {
        point = blocking.end;
    }
    point
}

fn insert_sorted(segments: &mut Vec<Segment>, segment: Segment) {
    let at = segments.partition_point(|s| s.start <= segment.start);
    segments.insert(at, segment);
}

/// Lay out the sub-items of `occurrence`.
pub fn layout(occurrence: &Occurrence) -> BlockLayout {
    layout_items(
        occurrence.start_time,
        occurrence.total_duration,
        &occurrence.sub_items,
    )
}

/// Lay out `items` in a block starting at `block_start` lasting
/// `total_duration` minutes.
pub fn layout_items(block_start: i32, total_duration: i32, items: &[SubItem]) -> BlockLayout {
    let block_end = block_start + total_duration;
    let mut segments: Vec<Segment> = Vec::with_capacity(items.len());
    let mut placed: Vec<PlacedSubItem> = Vec::with_capacity(items.len());

    let mut pinned: Vec<(usize, &SubItem, i32)> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| item.pinned_time.map(|pin| (i, item, pin)))
        .collect();
    pinned.sort_by_key(|&(i, _, pin)| (pin, i));

    for (index, item, pin) in pinned {
        let start = leftmost_fit(&segments, pin, item.duration);
        if start != pin {
            debug!(index, pin, start, "pinned sub-item overlaps an earlier pin");
        }
        insert_sorted(
            &mut segments,
            Segment {
                start,
                end: start + item.duration,
            },
        );
        placed.push(place(index, item, start, start != pin));
    }

    for (index, item) in items.iter().enumerate().filter(|(_, i)| !i.is_pinned()) {
        let start = leftmost_fit(&segments, block_start, item.duration);
        insert_sorted(
            &mut segments,
            Segment {
                start,
                end: start + item.duration,
            },
        );
        placed.push(place(index, item, start, false));
    }

    placed.sort_by_key(|p| (p.computed_start, p.computed_end, p.index));

    let mut last_end = block_start;
    let mut total_gap = 0;
    let mut largest_slot = 0;
    for p in &mut placed {
        p.gap_before_minutes = (p.computed_start - last_end).max(0);
        p.is_past_block_end = p.computed_end > block_end;
        total_gap += p.gap_before_minutes;
        let usable = (p.computed_start.min(block_end) - last_end).max(0);
        largest_slot = largest_slot.max(usable);
        last_end = last_end.max(p.computed_end);
    }
    largest_slot = largest_slot.max(block_end - last_end);

    let layout = BlockLayout {
        block_start,
        block_end,
        items: placed,
        flow_end: last_end,
        needed_minutes: last_end - block_start,
        total_gap_minutes: total_gap,
        largest_free_slot_minutes: largest_slot,
    };
    debug!(
        block_start,
        needed = layout.needed_minutes,
        declared = total_duration,
        gaps = layout.total_gap_minutes,
        "laid out block"
    );
    layout
}

fn place(index: usize, item: &SubItem, start: i32, displaced: bool) -> PlacedSubItem {
    PlacedSubItem {
        index,
        item: item.clone(),
        computed_start: start,
        computed_end: start + item.duration,
        gap_before_minutes: 0,
        is_past_block_end: false,
        displaced,
    }
}
