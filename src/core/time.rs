// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Translation between elapsed seconds and absolute bag timestamps.
//!
//! Users address a bag in seconds since its first record; records carry
//! absolute nanosecond timestamps. All comparisons happen in the absolute
//! domain after a single rounding step, so boundaries never drift.

use super::error::{Result, ToolError};

/// Nanoseconds per second.
pub const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Recorded time span of a container, in absolute nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeBounds {
    /// Timestamp of the earliest record
    pub start: u64,
    /// Timestamp of the latest record
    pub end: u64,
}

impl TimeBounds {
    /// Create bounds; `end` is clamped so it never precedes `start`.
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Span between first and last record, in nanoseconds.
    pub fn duration(&self) -> u64 {
        self.end - self.start
    }

    /// Span in seconds.
    pub fn duration_secs(&self) -> f64 {
        nanos_to_secs(self.duration())
    }
}

/// Closed absolute interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: u64,
    pub end: u64,
}

impl TimeWindow {
    /// Whether `timestamp` lies inside the window, both ends included.
    #[inline]
    pub fn contains(&self, timestamp: u64) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }

    /// Whether every later timestamp also falls outside the window.
    #[inline]
    pub fn is_past(&self, timestamp: u64) -> bool {
        timestamp > self.end
    }
}

fn nanos_to_secs(nanos: u64) -> f64 {
    nanos as f64 / NANOS_PER_SEC as f64
}

/// Round a non-negative second count to whole nanoseconds.
fn secs_to_nanos(secs: f64) -> f64 {
    (secs * NANOS_PER_SEC as f64).round()
}

/// Convert elapsed seconds into an absolute timestamp.
///
/// Negative offsets saturate at the container start; callers validate
/// first with [`validate_window`] or [`validate_boundaries`].
pub fn elapsed_to_absolute(bounds: &TimeBounds, elapsed_secs: f64) -> u64 {
    let offset = secs_to_nanos(elapsed_secs.max(0.0));
    bounds.start.saturating_add(offset as u64)
}

/// Convert an absolute timestamp into elapsed seconds.
pub fn absolute_to_elapsed(bounds: &TimeBounds, absolute: u64) -> f64 {
    (absolute as i128 - bounds.start as i128) as f64 / NANOS_PER_SEC as f64
}

/// Check one elapsed value against `[0, duration]`.
fn check_elapsed(bounds: &TimeBounds, value: f64, what: &str) -> Result<()> {
    let max = bounds.duration_secs();
    if value.is_nan() {
        return Err(ToolError::invalid_timestamp(
            value,
            format!("{what} is not a number"),
            0.0,
            max,
        ));
    }
    if value < 0.0 {
        return Err(ToolError::invalid_timestamp(
            value,
            format!("{what} comes before the start of the bag"),
            0.0,
            max,
        ));
    }
    if secs_to_nanos(value) > bounds.duration() as f64 {
        return Err(ToolError::invalid_timestamp(
            value,
            format!("{what} comes after the end of the bag"),
            0.0,
            max,
        ));
    }
    Ok(())
}

/// Validate optional elapsed bounds and produce the absolute clip window.
///
/// Absent bounds default to the container's own start and end.
pub fn validate_window(
    bounds: &TimeBounds,
    start: Option<f64>,
    end: Option<f64>,
) -> Result<TimeWindow> {
    if let Some(s) = start {
        check_elapsed(bounds, s, "start time")?;
    }
    if let Some(e) = end {
        check_elapsed(bounds, e, "end time")?;
    }
    if let (Some(s), Some(e)) = (start, end) {
        if e < s {
            return Err(ToolError::invalid_timestamp(
                e,
                format!("end time comes before start time ({s}s)"),
                s,
                bounds.duration_secs(),
            ));
        }
    }

    Ok(TimeWindow {
        start: start.map_or(bounds.start, |s| elapsed_to_absolute(bounds, s)),
        end: end.map_or(bounds.end, |e| elapsed_to_absolute(bounds, e)),
    })
}

/// Range-check every split boundary.
pub fn validate_boundaries(bounds: &TimeBounds, boundaries: &[f64]) -> Result<()> {
    boundaries
        .iter()
        .try_for_each(|&b| check_elapsed(bounds, b, "split time"))
}

/// Absolute boundaries partitioning a container into consecutive segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlan {
    boundaries: Vec<u64>,
}

impl SplitPlan {
    /// Build a plan from elapsed-second boundaries.
    ///
    /// The container start and end are always boundaries. Values are
    /// sorted and exact duplicates (after rounding to nanoseconds) dropped.
    pub fn new(bounds: &TimeBounds, boundaries: &[f64]) -> Result<Self> {
        validate_boundaries(bounds, boundaries)?;

        let mut absolute: Vec<u64> = boundaries
            .iter()
            .map(|&b| elapsed_to_absolute(bounds, b))
            .collect();
        absolute.push(bounds.start);
        absolute.push(bounds.end);
        absolute.sort_unstable();
        absolute.dedup();

        Ok(Self {
            boundaries: absolute,
        })
    }

    /// Sorted absolute boundaries.
    pub fn boundaries(&self) -> &[u64] {
        &self.boundaries
    }

    /// One closed window per segment.
    ///
    /// Neighbouring windows share their boundary timestamp, so a record
    /// sitting exactly on it belongs to both segments. A zero-length
    /// container yields a single degenerate window.
    pub fn windows(&self) -> Vec<TimeWindow> {
        if self.boundaries.len() == 1 {
            let at = self.boundaries[0];
            return vec![TimeWindow { start: at, end: at }];
        }
        self.boundaries
            .windows(2)
            .map(|pair| TimeWindow {
                start: pair[0],
                end: pair[1],
            })
            .collect()
    }

    /// Number of segments the plan produces.
    pub fn segment_count(&self) -> usize {
        self.boundaries.len().saturating_sub(1).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> TimeBounds {
        // 100 s container starting at t = 1_000 s
        TimeBounds::new(1_000 * NANOS_PER_SEC, 1_100 * NANOS_PER_SEC)
    }

    #[test]
    fn test_elapsed_round_trip() {
        let b = bounds();
        let abs = elapsed_to_absolute(&b, 12.25);
        assert_eq!(abs, 1_012_250_000_000);
        assert!((absolute_to_elapsed(&b, abs) - 12.25).abs() < 1e-9);
    }

    #[test]
    fn test_elapsed_rounding_avoids_truncation() {
        let b = TimeBounds::new(0, 10 * NANOS_PER_SEC);
        assert_eq!(elapsed_to_absolute(&b, 0.3), 300_000_000);
    }

    #[test]
    fn test_open_window_defaults_to_bounds() {
        let b = bounds();
        let w = validate_window(&b, None, None).unwrap();
        assert_eq!(w.start, b.start);
        assert_eq!(w.end, b.end);
    }

    #[test]
    fn test_window_accepts_full_duration() {
        let b = bounds();
        let w = validate_window(&b, Some(0.0), Some(100.0)).unwrap();
        assert_eq!(w, TimeWindow { start: b.start, end: b.end });
    }

    #[test]
    fn test_window_rejects_start_after_duration() {
        let err = validate_window(&bounds(), Some(100.5), None).unwrap_err();
        match err {
            ToolError::InvalidTimestamp { value, max, .. } => {
                assert_eq!(value, 100.5);
                assert_eq!(max, 100.0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_window_rejects_negative_and_nan() {
        assert!(validate_window(&bounds(), Some(-0.1), None).is_err());
        assert!(validate_window(&bounds(), None, Some(-3.0)).is_err());
        assert!(validate_window(&bounds(), Some(f64::NAN), None).is_err());
    }

    #[test]
    fn test_window_rejects_end_before_start() {
        let err = validate_window(&bounds(), Some(20.0), Some(10.0)).unwrap_err();
        assert!(matches!(err, ToolError::InvalidTimestamp { .. }));
    }

    #[test]
    fn test_window_allows_equal_bounds() {
        let w = validate_window(&bounds(), Some(5.0), Some(5.0)).unwrap();
        assert_eq!(w.start, w.end);
        assert!(w.contains(w.start));
    }

    #[test]
    fn test_window_is_closed() {
        let w = TimeWindow { start: 10, end: 20 };
        assert!(w.contains(10));
        assert!(w.contains(20));
        assert!(!w.contains(21));
        assert!(w.is_past(21));
        assert!(!w.is_past(20));
    }

    #[test]
    fn test_split_plan_injects_ends_and_sorts() {
        let b = bounds();
        let plan = SplitPlan::new(&b, &[60.0, 30.0]).unwrap();
        assert_eq!(
            plan.boundaries(),
            &[
                b.start,
                b.start + 30 * NANOS_PER_SEC,
                b.start + 60 * NANOS_PER_SEC,
                b.end
            ]
        );
        assert_eq!(plan.segment_count(), 3);
        let windows = plan.windows();
        assert_eq!(windows[0].end, windows[1].start);
    }

    #[test]
    fn test_split_plan_drops_duplicates() {
        let b = bounds();
        let plan = SplitPlan::new(&b, &[0.0, 50.0, 50.0, 100.0]).unwrap();
        assert_eq!(plan.boundaries().len(), 3);
        assert_eq!(plan.windows().len(), 2);
    }

    #[test]
    fn test_split_plan_without_boundaries_is_whole_bag() {
        let b = bounds();
        let plan = SplitPlan::new(&b, &[]).unwrap();
        assert_eq!(plan.windows(), vec![TimeWindow { start: b.start, end: b.end }]);
    }

    #[test]
    fn test_split_plan_zero_length_container() {
        let b = TimeBounds::new(42, 42);
        let plan = SplitPlan::new(&b, &[0.0]).unwrap();
        assert_eq!(plan.segment_count(), 1);
        assert_eq!(plan.windows(), vec![TimeWindow { start: 42, end: 42 }]);
    }

    #[test]
    fn test_split_plan_rejects_out_of_range() {
        assert!(SplitPlan::new(&bounds(), &[10.0, 150.0]).is_err());
        assert!(SplitPlan::new(&bounds(), &[-1.0]).is_err());
    }
}
