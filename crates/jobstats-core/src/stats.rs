//! Aggregated execution statistics.

use serde::{Deserialize, Serialize};

use crate::day::DayKey;

/// Success/failure counts for one UTC day.
///
/// Counts only ever grow; there is no decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayStat {
    /// Day these counts belong to.
    pub date: DayKey,
    /// Executions that completed successfully on this day.
    pub success_count: u64,
    /// Executions that completed unsuccessfully on this day.
    pub failed_count: u64,
}

impl DayStat {
    /// All-zero record for a day with no recorded completions.
    pub fn zero(date: DayKey) -> Self {
        Self {
            date,
            success_count: 0,
            failed_count: 0,
        }
    }

    /// Copy of this record with one more success or failure.
    #[must_use]
    pub fn incremented(&self, success: bool) -> Self {
        let mut next = *self;
        if success {
            next.success_count += 1;
        } else {
            next.failed_count += 1;
        }
        next
    }

    /// Total number of completions attributed to this day.
    pub fn total_executions(&self) -> u64 {
        self.success_count + self.failed_count
    }

    /// Whether nothing has been recorded for this day.
    pub fn is_zero(&self) -> bool {
        self.total_executions() == 0
    }
}

/// Trailing window of day stats, oldest first, one entry per day.
///
/// Serializes as `{"stats": [...]}`, the shape the operator UI consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsWindow {
    pub stats: Vec<DayStat>,
}

impl StatsWindow {
    pub fn new(stats: Vec<DayStat>) -> Self {
        Self { stats }
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DayStat> {
        self.stats.iter()
    }

    /// Sum of successes across the window.
    pub fn total_success(&self) -> u64 {
        self.stats.iter().map(|s| s.success_count).sum()
    }

    /// Sum of failures across the window.
    pub fn total_failed(&self) -> u64 {
        self.stats.iter().map(|s| s.failed_count).sum()
    }

    /// Oldest day in the window.
    pub fn first_day(&self) -> Option<DayKey> {
        self.stats.first().map(|s| s.date)
    }

    /// Newest day in the window (the current day for service windows).
    pub fn last_day(&self) -> Option<DayKey> {
        self.stats.last().map(|s| s.date)
    }
}

impl<'a> IntoIterator for &'a StatsWindow {
    type Item = &'a DayStat;
    type IntoIter = std::slice::Iter<'a, DayStat>;

    fn into_iter(self) -> Self::IntoIter {
        self.stats.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> DayKey {
        DayKey::from_ymd(2026, 10, d).unwrap()
    }

    #[test]
    fn test_total_executions() {
        let stat = DayStat {
            date: day(19),
            success_count: 5,
            failed_count: 3,
        };
        assert_eq!(stat.total_executions(), 8);
    }

    #[test]
    fn test_zero_record() {
        let stat = DayStat::zero(day(19));
        assert!(stat.is_zero());
        assert_eq!(stat.total_executions(), 0);
    }

    #[test]
    fn test_incremented_touches_one_counter() {
        let stat = DayStat::zero(day(19)).incremented(true).incremented(false);
        assert_eq!(stat.success_count, 1);
        assert_eq!(stat.failed_count, 1);
        assert_eq!(stat.date, day(19));
    }

    #[test]
    fn test_window_wire_format() {
        let window = StatsWindow::new(vec![DayStat {
            date: day(19),
            success_count: 2,
            failed_count: 1,
        }]);
        let json = serde_json::to_value(&window).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "stats": [{
                    "date": "2026-10-19T00:00:00Z",
                    "success_count": 2,
                    "failed_count": 1,
                }]
            })
        );
    }

    #[test]
    fn test_window_totals() {
        let window = StatsWindow::new(vec![
            DayStat::zero(day(18)).incremented(true),
            DayStat::zero(day(19)).incremented(false).incremented(true),
        ]);
        assert_eq!(window.total_success(), 2);
        assert_eq!(window.total_failed(), 1);
        assert_eq!(window.first_day(), Some(day(18)));
        assert_eq!(window.last_day(), Some(day(19)));
    }
}
