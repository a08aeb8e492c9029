//! Drag-gesture quantizer.
//!
//! Maps a continuous pixel delta from a drag to a whole-minute change of a
//! block's start time. Short drags move minute by minute; the further the
//! pointer travels, the coarser the step and the larger the jump per pixel.

use serde::{Deserialize, Serialize};

use crate::time::{clamp_to_day, MINUTES_PER_DAY};

/// Speed gear selected by the absolute drag distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gear {
    /// Under 40px: fine adjustment, 1-minute steps
    Fine,
    /// 40-120px: 5-minute steps
    Medium,
    /// 120-250px: 10-minute steps
    Coarse,
    /// 250px and beyond: 30-minute steps
    Rapid,
}

impl Gear {
    /// Select the gear for an absolute pixel distance.
    pub fn for_distance(pixels: f64) -> Self {
        if pixels < 40.0 {
            Self::Fine
        } else if pixels < 120.0 {
            Self::Medium
        } else if pixels < 250.0 {
            Self::Coarse
        } else {
            Self::Rapid
        }
    }

    /// Rounding granularity in minutes.
    pub fn step_minutes(&self) -> i32 {
        match self {
            Self::Fine => 1,
            Self::Medium => 5,
            Self::Coarse => 10,
            Self::Rapid => 30,
        }
    }

    /// Unrounded minutes for an absolute pixel distance inside this gear.
    ///
    /// Each gear starts where the previous one ended, so the mapping is
    /// continuous across gear boundaries.
    fn raw_minutes(&self, pixels: f64) -> f64 {
        match self {
            Self::Fine => pixels / 2.5,
            Self::Medium => 16.0 + (pixels - 40.0) * 0.4,
            Self::Coarse => 48.0 + (pixels - 120.0) * 0.8,
            Self::Rapid => 152.0 + (pixels - 250.0) * 1.5,
        }
    }
}

/// Convert a signed pixel delta into a signed minute delta for a block that
/// currently starts at `original_minute_of_day`.
///
/// Pure: the same inputs always give the same output. The result is not
/// clamped to the day; use [`apply_delta`] for that.
pub fn quantize(delta_pixels: f64, original_minute_of_day: i32) -> i32 {
    if !delta_pixels.is_finite() {
        return 0;
    }

    let distance = delta_pixels.abs();
    let gear = Gear::for_distance(distance);
    let step = f64::from(gear.step_minutes());
    let magnitude = ((gear.raw_minutes(distance) / step).round() * step) as i32;
    let delta = if delta_pixels < 0.0 { -magnitude } else { magnitude };

    delta + magnetic_correction(original_minute_of_day + delta)
}

/// Nudge that lands a minute-of-day one minute off a 5-minute mark exactly on
/// the mark. Uses truncated remainder, so negative totals snap as well.
fn magnetic_correction(total: i32) -> i32 {
    match total % 5 {
        1 | -4 => -1,
        4 | -1 => 1,
        _ => 0,
    }
}

/// Add `delta` to `original_minute_of_day` and clamp into `[0, 1440)`.
pub fn apply_delta(original_minute_of_day: i32, delta: i32) -> i32 {
    clamp_to_day(original_minute_of_day.saturating_add(delta))
}

/// Quantize a drag and return the clamped new start time.
pub fn drag_to(delta_pixels: f64, original_minute_of_day: i32) -> i32 {
    let moved = apply_delta(
        original_minute_of_day,
        quantize(delta_pixels, original_minute_of_day),
    );
    debug_assert!((0..MINUTES_PER_DAY).contains(&moved));
    moved
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coarse_gear_example() {
        // 48 + (200-120)*0.8 = 112 -> 110; 480 + 110 = 590 is on a 5 mark
        assert_eq!(Gear::for_distance(200.0), Gear::Coarse);
        assert_eq!(quantize(200.0, 480), 110);
    }

    #[test]
    fn sign_follows_gesture() {
        assert_eq!(quantize(-200.0, 480), -110);
        assert_eq!(quantize(10.0, 481), 4);
        assert_eq!(quantize(-10.0, 484), -4);
    }

    #[test]
    fn gear_boundaries_are_continuous() {
        assert_eq!(Gear::for_distance(39.9), Gear::Fine);
        assert_eq!(Gear::for_distance(40.0), Gear::Medium);
        assert_eq!(Gear::for_distance(120.0), Gear::Coarse);
        assert_eq!(Gear::for_distance(250.0), Gear::Rapid);
        assert_eq!(quantize(40.0, 0), 15);
        assert_eq!(quantize(120.0, 0), 50);
        assert_eq!(quantize(250.0, 0), 150);
    }

    #[test]
    fn rapid_gear_rounds_to_half_hours() {
        // 152 + 50*1.5 = 227 -> 240
        assert_eq!(quantize(300.0, 600), 240);
    }

    #[test]
    fn magnetic_snap_pulls_onto_five_minute_marks() {
        // fine gear: 5px -> 2 min; 483 + 2 = 485, no correction
        assert_eq!(quantize(5.0, 483), 2);
        // 2.5px -> 1 min; 480 + 1 = 481 -> snap back to 480
        assert_eq!(quantize(2.5, 480), 0);
        // 7.5px -> 3 min; 481 + 3 = 484 -> snap up to 485
        assert_eq!(quantize(7.5, 481), 4);
    }

    #[test]
    fn magnetic_snap_handles_negative_totals() {
        // -4 px -> round(1.6) = 2 -> -2; 1 - 2 = -1 -> +1
        assert_eq!(quantize(-4.0, 1), -1);
        // -10 px -> -4; 0 - 4 = -4 -> -1
        assert_eq!(quantize(-10.0, 0), -5);
    }

    #[test]
    fn quantize_does_not_clamp_but_apply_delta_does() {
        let delta = quantize(-400.0, 30);
        assert!(30 + delta < 0);
        assert_eq!(apply_delta(30, delta), 0);
        assert_eq!(apply_delta(1430, 300), 1439);
        assert_eq!(drag_to(-400.0, 30), 0);
    }

    #[test]
    fn quantize_is_pure() {
        for px in [-320.5, -99.0, -1.0, 0.0, 3.3, 77.7, 260.0] {
            assert_eq!(quantize(px, 545), quantize(px, 545));
        }
    }

    #[test]
    fn non_finite_input_is_ignored() {
        assert_eq!(quantize(f64::NAN, 500), 0);
        assert_eq!(quantize(f64::INFINITY, 500), 0);
    }
}
