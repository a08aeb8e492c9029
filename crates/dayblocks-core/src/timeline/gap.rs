//! Free time between the blocks of one day.
//!
//! Works on minute-of-day spans inside a configured day window. Stretches
//! shorter than the detector's minimum are not reported.

use serde::{Deserialize, Serialize};

use crate::block::Occurrence;
use crate::time::format_range;

/// Size category of a gap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapSize {
    Small,  // under 30 minutes
    Medium, // 30-59 minutes
    Large,  // 60+ minutes
}

impl GapSize {
    pub fn from_minutes(minutes: i32) -> Self {
        if minutes < 30 {
            Self::Small
        } else if minutes < 60 {
            Self::Medium
        } else {
            Self::Large
        }
    }
}

/// A busy interval, `[start, end)` in minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: i32,
    pub end: i32,
}

impl Span {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn of(occurrence: &Occurrence) -> Self {
        Self::new(occurrence.start_time, occurrence.end_time())
    }
}

/// Unscheduled time between blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayGap {
    pub start: i32,
    pub end: i32,
    pub size: GapSize,
}

impl DayGap {
    fn new(start: i32, end: i32) -> Self {
        Self {
            start,
            end,
            size: GapSize::from_minutes(end - start),
        }
    }

    pub fn duration_minutes(&self) -> i32 {
        self.end - self.start
    }

    pub fn label(&self) -> String {
        format_range(self.start, self.duration_minutes())
    }
}

/// Finds gaps in a day's schedule.
#[derive(Debug, Clone)]
pub struct GapDetector {
    min_gap_minutes: i32,
}

impl GapDetector {
    /// Detector reporting gaps of 15 minutes or more.
    pub fn new() -> Self {
        Self {
            min_gap_minutes: 15,
        }
    }

    pub fn with_min_gap(mut self, minutes: i32) -> Self {
        self.min_gap_minutes = minutes.max(1);
        self
    }

    /// Gaps between `spans` inside `[day_start, day_end)`, sorted by start.
    ///
    /// Spans may overlap and arrive in any order.
    pub fn find_gaps(&self, spans: &[Span], day_start: i32, day_end: i32) -> Vec<DayGap> {
        let mut sorted = spans.to_vec();
        sorted.sort_by_key(|s| (s.start, s.end));

        let mut gaps = Vec::new();
        let mut last_end = day_start;
        for span in &sorted {
            if span.end <= last_end {
                continue;
            }
            if span.start >= day_end {
                break;
            }
            if span.start > last_end {
                self.push_gap(&mut gaps, last_end, span.start.min(day_end));
            }
            last_end = span.end.min(day_end);
        }

        if last_end < day_end {
            self.push_gap(&mut gaps, last_end, day_end);
        }
        gaps
    }

    fn push_gap(&self, gaps: &mut Vec<DayGap>, start: i32, end: i32) {
        if end - start >= self.min_gap_minutes {
            gaps.push(DayGap::new(start, end));
        }
    }
}

impl Default for GapDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Gaps between `occurrences` inside the day window.
pub fn find_day_gaps<'a>(
    occurrences: impl IntoIterator<Item = &'a Occurrence>,
    day_start: i32,
    day_end: i32,
    min_gap_minutes: i32,
) -> Vec<DayGap> {
    let spans: Vec<Span> = occurrences.into_iter().map(Span::of).collect();
    GapDetector::new()
        .with_min_gap(min_gap_minutes)
        .find_gaps(&spans, day_start, day_end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn starts(gaps: &[DayGap]) -> Vec<(i32, i32)> {
        gaps.iter().map(|g| (g.start, g.end)).collect()
    }

    #[test]
    fn empty_day_is_one_gap() {
        let gaps = GapDetector::new().find_gaps(&[], 360, 1380);
        assert_eq!(starts(&gaps), [(360, 1380)]);
        assert_eq!(gaps[0].size, GapSize::Large);
    }

    #[test]
    fn gaps_between_and_after_blocks() {
        let spans = [Span::new(540, 600), Span::new(420, 480), Span::new(660, 720)];
        let gaps = GapDetector::new().find_gaps(&spans, 360, 1380);
        assert_eq!(
            starts(&gaps),
            [(360, 420), (480, 540), (600, 660), (720, 1380)]
        );
    }

    #[test]
    fn overlapping_spans_merge() {
        let spans = [Span::new(540, 660), Span::new(600, 630), Span::new(650, 700)];
        let gaps = GapDetector::new().find_gaps(&spans, 540, 800);
        assert_eq!(starts(&gaps), [(700, 800)]);
    }

    #[test]
    fn short_gaps_are_dropped() {
        let spans = [Span::new(540, 600), Span::new(610, 700)];
        let gaps = GapDetector::new().with_min_gap(15).find_gaps(&spans, 540, 700);
        assert!(gaps.is_empty());
        let gaps = GapDetector::new().with_min_gap(5).find_gaps(&spans, 540, 700);
        assert_eq!(starts(&gaps), [(600, 610)]);
        assert_eq!(gaps[0].size, GapSize::Small);
    }

    #[test]
    fn spans_outside_window_are_clipped() {
        let spans = [Span::new(300, 400), Span::new(1300, 1500)];
        let gaps = GapDetector::new().find_gaps(&spans, 360, 1380);
        assert_eq!(starts(&gaps), [(400, 1300)]);
    }

    #[test]
    fn gap_size_and_label() {
        let gap = DayGap::new(600, 645);
        assert_eq!(gap.duration_minutes(), 45);
        assert_eq!(gap.size, GapSize::Medium);
        assert_eq!(gap.label(), "10:00-10:45");
    }
}
