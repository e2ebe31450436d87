//! Weekday calendar helpers.
//!
//! The HK exchange holiday calendar is not modeled; weekends are the only
//! non-trading days recognized here.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Minimum window that still yields a reference pair at positions 1 and 2.
pub const MIN_WINDOW_DAYS: usize = 3;

/// Return `count` weekdays ending at `as_of` (inclusive), most recent first.
pub fn recent_weekdays(as_of: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(count);
    let mut current = as_of;

    while days.len() < count {
        if is_weekday(current) {
            days.push(current);
        }
        current -= Duration::days(1);
    }

    days
}

fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Reference session pair for the completed-session comparison mode.
///
/// Position 0 of the weekday window is the current (possibly still open)
/// session and is skipped; the two sessions before it are compared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonWindow {
    /// Most recent completed session
    pub recent: NaiveDate,
    /// Session before `recent`
    pub previous: NaiveDate,
    /// Full weekday window, most recent first
    pub days: Vec<NaiveDate>,
}

impl ComparisonWindow {
    /// Build the window from the last `window_days` weekdays.
    ///
    /// Returns `None` when the window is too short to pick a pair.
    pub fn from_weekdays(as_of: NaiveDate, window_days: usize) -> Option<Self> {
        if window_days < MIN_WINDOW_DAYS {
            return None;
        }

        let days = recent_weekdays(as_of, window_days);
        Some(Self {
            recent: days[1],
            previous: days[2],
            days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_recent_weekdays_midweek() {
        // Wednesday 2024-06-05
        let days = recent_weekdays(date(2024, 6, 5), 5);
        assert_eq!(
            days,
            vec![
                date(2024, 6, 5),
                date(2024, 6, 4),
                date(2024, 6, 3),
                date(2024, 5, 31),
                date(2024, 5, 30),
            ]
        );
    }

    #[test]
    fn test_recent_weekdays_from_weekend() {
        // Sunday 2024-06-09 starts from Friday
        let days = recent_weekdays(date(2024, 6, 9), 2);
        assert_eq!(days, vec![date(2024, 6, 7), date(2024, 6, 6)]);
    }

    #[test]
    fn test_recent_weekdays_zero() {
        assert!(recent_weekdays(date(2024, 6, 5), 0).is_empty());
    }

    #[test]
    fn test_comparison_window_monday() {
        // Monday 2024-06-10: skip Monday, compare Friday against Thursday
        let window = ComparisonWindow::from_weekdays(date(2024, 6, 10), 5).unwrap();
        assert_eq!(window.recent, date(2024, 6, 7));
        assert_eq!(window.previous, date(2024, 6, 6));
        assert_eq!(window.days.len(), 5);
    }

    #[test]
    fn test_comparison_window_too_short() {
        assert!(ComparisonWindow::from_weekdays(date(2024, 6, 10), 2).is_none());
        assert!(ComparisonWindow::from_weekdays(date(2024, 6, 10), 3).is_some());
    }
}
