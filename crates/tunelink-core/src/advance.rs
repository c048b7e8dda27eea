//! Auto-advance decision.
//!
//! The next track is requested a few seconds before the current one ends so
//! the request round-trip overlaps the tail of the outgoing track.

use tunelink_types::Queue;

/// Default margin before track end at which the next track is requested.
pub const LOOKAHEAD_SECONDS: f64 = 3.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdvancePolicy {
    pub lookahead_seconds: f64,
}

impl Default for AdvancePolicy {
    fn default() -> Self {
        Self {
            lookahead_seconds: LOOKAHEAD_SECONDS,
        }
    }
}

impl AdvancePolicy {
    pub fn new(lookahead_seconds: f64) -> Self {
        Self { lookahead_seconds }
    }

    /// `true` when less than the lookahead remains. Equal does not trigger.
    pub fn should_advance(&self, duration_ms: u64, elapsed_seconds: f64) -> bool {
        let remaining = duration_ms as f64 / 1000.0 - elapsed_seconds;
        remaining < self.lookahead_seconds
    }
}

/// [`AdvancePolicy::should_advance`] with the default lookahead.
pub fn should_advance(duration_ms: u64, elapsed_seconds: f64) -> bool {
    AdvancePolicy::default().should_advance(duration_ms, elapsed_seconds)
}

/// Index after the current one, or `None` at the end of the queue (or when
/// the position is unknown).
pub fn next_index(queue: &Queue) -> Option<usize> {
    let next = queue.current_index? + 1;
    (next < queue.len()).then_some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::queue_of;

    #[test]
    fn boundary_does_not_trigger() {
        for secs in [3u64, 4, 10, 60, 240, 3600] {
            let duration_ms = secs * 1000;
            let at_threshold = secs as f64 - LOOKAHEAD_SECONDS;
            assert!(!should_advance(duration_ms, at_threshold), "{secs}s at threshold");
            assert!(should_advance(duration_ms, at_threshold + 0.001), "{secs}s past threshold");
        }
    }

    #[test]
    fn matches_remaining_time_formula() {
        let durations = [0u64, 1, 999, 2_500, 10_000, 187_333];
        let elapsed = [0.0, 0.5, 2.0, 6.9, 7.0, 7.5, 9.9, 120.25, 500.0];
        for d in durations {
            for e in elapsed {
                let expected = (d as f64 / 1000.0 - e) < 3.0;
                assert_eq!(should_advance(d, e), expected, "d={d} e={e}");
            }
        }
    }

    #[test]
    fn ten_second_track_examples() {
        assert!(should_advance(10_000, 7.5));
        assert!(!should_advance(10_000, 6.9));
        assert!(should_advance(10_000, 9.9));
    }

    #[test]
    fn short_tracks_advance_immediately() {
        assert!(should_advance(2_000, 0.0));
    }

    #[test]
    fn custom_lookahead() {
        let policy = AdvancePolicy::new(1.0);
        assert!(!policy.should_advance(10_000, 8.5));
        assert!(policy.should_advance(10_000, 9.5));
    }

    #[test]
    fn next_index_stops_at_end() {
        assert_eq!(next_index(&queue_of(&[1, 1], Some(0))), Some(1));
        assert_eq!(next_index(&queue_of(&[1, 1], Some(1))), None);
        assert_eq!(next_index(&queue_of(&[1], None)), None);
        assert_eq!(next_index(&queue_of(&[], None)), None);
    }
}
