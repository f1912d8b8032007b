//! Time sampling for the virtual scene.
//!
//! Every animated field is sampled at each integer frame of one inclusive
//! range. There is no sub-frame sampling: query times are clamped into the
//! range and bracketed by themselves.

use serde::{Deserialize, Serialize};

/// Integer simulation frame.
pub type Frame = i64;

/// Inclusive range of sampled frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: Frame,
    pub end: Frame,
}

impl FrameRange {
    /// Create a range. `end` is raised to `start` if it lies before it.
    pub fn new(start: Frame, end: Frame) -> Self {
        Self { start, end: end.max(start) }
    }

    /// Single-frame range.
    pub fn single(frame: Frame) -> Self {
        Self { start: frame, end: frame }
    }

    /// Number of samples (frames) in the range, saturating at `usize::MAX`.
    #[inline]
    pub fn num_samples(&self) -> usize {
        self.end
            .checked_sub(self.start)
            .and_then(|span| span.checked_add(1))
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(usize::MAX)
    }

    /// Clamp a query time into the range.
    #[inline]
    pub fn clamp_time(&self, time: f64) -> f64 {
        if time.is_nan() {
            return self.start as f64;
        }
        time.clamp(self.start as f64, self.end as f64)
    }

    /// Frame whose sample answers a query at `time`.
    ///
    /// The time is clamped into the range and floored.
    #[inline]
    pub fn frame_for_time(&self, time: f64) -> Frame {
        (self.clamp_time(time).floor() as Frame).clamp(self.start, self.end)
    }

    /// Bracketing samples for a query time.
    ///
    /// Samples are never interpolated, so the clamped time is both the lower
    /// and upper bound.
    #[inline]
    pub fn bracket(&self, time: f64) -> (f64, f64) {
        let t = self.clamp_time(time);
        (t, t)
    }

    /// Times of all samples, in order.
    pub fn sample_times(&self) -> Vec<f64> {
        (self.start..=self.end).map(|f| f as f64).collect()
    }

    /// Smallest range covering both.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl Default for FrameRange {
    fn default() -> Self {
        Self::single(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_samples() {
        assert_eq!(FrameRange::new(1, 100).num_samples(), 100);
        assert_eq!(FrameRange::single(7).num_samples(), 1);
        assert_eq!(FrameRange::new(10, 5), FrameRange::single(10));
    }

    #[test]
    fn test_num_samples_saturates() {
        assert_eq!(FrameRange::new(i64::MIN, 0).num_samples(), usize::MAX);
        assert_eq!(FrameRange::new(i64::MIN, i64::MAX).num_samples(), usize::MAX);
        assert_eq!(FrameRange::new(i64::MAX - 1, i64::MAX).num_samples(), 2);
    }

    #[test]
    fn test_bracket_clamps() {
        let r = FrameRange::new(10, 20);
        assert_eq!(r.bracket(15.0), (15.0, 15.0));
        assert_eq!(r.bracket(3.0), (10.0, 10.0));
        assert_eq!(r.bracket(99.5), (20.0, 20.0));
        // no interpolation partner, even between integer frames
        assert_eq!(r.bracket(12.5), (12.5, 12.5));
    }

    #[test]
    fn test_frame_for_time() {
        let r = FrameRange::new(1, 5);
        assert_eq!(r.frame_for_time(2.0), 2);
        assert_eq!(r.frame_for_time(2.9), 2);
        assert_eq!(r.frame_for_time(-4.0), 1);
        assert_eq!(r.frame_for_time(42.0), 5);
        assert_eq!(r.frame_for_time(f64::NAN), 1);
    }

    #[test]
    fn test_sample_times() {
        let r = FrameRange::new(-1, 2);
        assert_eq!(r.sample_times(), vec![-1.0, 0.0, 1.0, 2.0]);
        assert_eq!(r.union(&FrameRange::new(0, 8)), FrameRange::new(-1, 8));
    }
}
