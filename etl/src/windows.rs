//! Window planning: decomposes a global time range into fixed-size sub-intervals.

use chrono::Duration;
use etl_config::shared::WindowConfig;

use crate::types::{TimeRange, Window};

/// Plans contiguous extraction windows over a [`TimeRange`].
///
/// The planner is a pure function of its inputs: it performs no I/O and produces
/// windows lazily, one at a time, as the caller drives the iterator. The union of all
/// produced windows covers the range exactly, with no gap or overlap; the final
/// window is clipped to the range end. A range shorter than the window duration
/// yields exactly one clipped window.
#[derive(Debug, Clone, Copy)]
pub struct WindowPlanner {
    window_duration: Duration,
}

impl WindowPlanner {
    pub fn new(config: &WindowConfig) -> Self {
        Self {
            window_duration: Duration::hours(i64::from(config.hours)),
        }
    }

    /// Returns a lazy, restartable iterator over the windows covering `range`.
    pub fn windows(&self, range: TimeRange) -> WindowIter {
        WindowIter {
            cursor: range.start(),
            end: range.end(),
            window_duration: self.window_duration,
        }
    }
}

/// Iterator over the contiguous windows of one range.
#[derive(Debug, Clone)]
pub struct WindowIter {
    cursor: chrono::DateTime<chrono::Utc>,
    end: chrono::DateTime<chrono::Utc>,
    window_duration: Duration,
}

impl Iterator for WindowIter {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        if self.cursor >= self.end {
            return None;
        }

        let start = self.cursor;
        let end = (start + self.window_duration).min(self.end);
        self.cursor = end;

        Some(Window { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner(hours: u32) -> WindowPlanner {
        WindowPlanner::new(&WindowConfig { hours })
    }

    fn range(start: &str, end: &str) -> TimeRange {
        TimeRange::from_dates(start, end).unwrap()
    }

    #[test]
    fn windows_cover_range_exactly() {
        let range = range("2024-01-01", "2024-01-03");
        let windows: Vec<_> = planner(6).windows(range).collect();

        assert_eq!(windows.len(), 8);
        assert_eq!(windows.first().unwrap().start, range.start());
        assert_eq!(windows.last().unwrap().end, range.end());

        for pair in windows.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn final_window_is_clipped_to_range_end() {
        // 25 hours split into 6-hour windows: four full windows plus a 1-hour remainder.
        let start = range("2024-01-01", "2024-01-02").start();
        let end = start + Duration::hours(25);
        let range = TimeRange::new(start, end).unwrap();

        let windows: Vec<_> = planner(6).windows(range).collect();

        assert_eq!(windows.len(), 5);
        assert_eq!(windows[4].end - windows[4].start, Duration::hours(1));
        assert_eq!(windows[4].end, end);
    }

    #[test]
    fn short_range_yields_one_clipped_window() {
        let start = range("2024-01-01", "2024-01-02").start();
        let end = start + Duration::minutes(30);
        let range = TimeRange::new(start, end).unwrap();

        let windows: Vec<_> = planner(6).windows(range).collect();

        assert_eq!(windows, vec![Window { start, end }]);
    }

    #[test]
    fn iteration_is_restartable() {
        let planner = planner(6);
        let range = range("2024-01-01", "2024-01-02");

        let first: Vec<_> = planner.windows(range).collect();
        let second: Vec<_> = planner.windows(range).collect();

        assert_eq!(first, second);
    }

    #[test]
    fn windows_have_no_gaps_or_overlap_at_epoch_granularity() {
        let range = range("2024-01-01", "2024-01-02");
        let windows: Vec<_> = planner(7).windows(range).collect();

        let mut covered = 0;
        for window in &windows {
            covered += window.end_epoch() - window.start_epoch();
        }

        assert_eq!(
            covered,
            range.end().timestamp() - range.start().timestamp()
        );
    }
}
