use crate::DomainError;
use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike};

const SECS_PER_DAY: u32 = 86_400;
const SECS_PER_WEEK: u32 = 7 * SECS_PER_DAY;

/// Recurring window during which a rule applies.
///
/// Offsets are seconds from the start of the period (Sunday 00:00 for
/// weekly windows, midnight for daily ones). `start > end` wraps around the
/// period boundary; `start == end` covers the whole period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleWindow {
    Weekly { start: u32, end: u32 },
    Daily { start: u32, end: u32 },
}

impl ScheduleWindow {
    /// Build a window from the four nullable rule columns.
    ///
    /// Weekdays are 0 (Sunday) to 6 (Saturday).
    /// - both weekdays and times: one span from `from_weekday from_time` to
    ///   `to_weekday to_time`, e.g. Friday 18:00 → Monday 06:00;
    /// - weekdays only: whole days `from_weekday..=to_weekday`;
    /// - times only: the same span every day;
    /// - nothing: no window.
    pub fn from_columns(
        from_weekday: Option<i16>,
        to_weekday: Option<i16>,
        from_time: Option<NaiveTime>,
        to_time: Option<NaiveTime>,
    ) -> Result<Option<Self>, DomainError> {
        let days = match (from_weekday, to_weekday) {
            (Some(f), Some(t)) => Some((weekday(f)?, weekday(t)?)),
            (None, None) => None,
            _ => {
                return Err(DomainError::InvalidSchedule(
                    "from_weekday and to_weekday must be set together".to_string(),
                ))
            }
        };

        let times = match (from_time, to_time) {
            (Some(f), Some(t)) => Some((seconds_of_day(f), seconds_of_day(t))),
            (None, None) => None,
            _ => {
                return Err(DomainError::InvalidSchedule(
                    "from_time and to_time must be set together".to_string(),
                ))
            }
        };

        Ok(match (days, times) {
            (Some((fd, td)), Some((ft, tt))) => Some(Self::Weekly {
                start: fd * SECS_PER_DAY + ft,
                end: td * SECS_PER_DAY + tt,
            }),
            (Some((fd, td)), None) => Some(Self::Weekly {
                start: fd * SECS_PER_DAY,
                end: ((td + 1) % 7) * SECS_PER_DAY,
            }),
            (None, Some((ft, tt))) => Some(Self::Daily { start: ft, end: tt }),
            (None, None) => None,
        })
    }

    /// Whether `at` (local wall-clock time) falls inside the window.
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        let time_of_day = at.num_seconds_from_midnight();
        match *self {
            Self::Weekly { start, end } => {
                let point = at.weekday().num_days_from_sunday() * SECS_PER_DAY + time_of_day;
                in_span(start, end, point % SECS_PER_WEEK)
            }
            Self::Daily { start, end } => in_span(start, end, time_of_day),
        }
    }
}

fn in_span(start: u32, end: u32, point: u32) -> bool {
    if start == end {
        true
    } else if start < end {
        start <= point && point < end
    } else {
        point >= start || point < end
    }
}

fn weekday(value: i16) -> Result<u32, DomainError> {
    if (0..=6).contains(&value) {
        Ok(value as u32)
    } else {
        Err(DomainError::InvalidSchedule(format!(
            "weekday {value} is outside 0..=6"
        )))
    }
}

fn seconds_of_day(time: NaiveTime) -> u32 {
    time.num_seconds_from_midnight()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    // 2024-06-02 is a Sunday.
    fn at(day_offset: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 2 + day_offset)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn hm(h: u32, m: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(h, m, 0)
    }

    #[test]
    fn test_weekend_window_wraps_over_sunday() {
        let window = ScheduleWindow::from_columns(Some(5), Some(1), hm(18, 0), hm(6, 0))
            .unwrap()
            .unwrap();

        assert!(window.contains(at(6, 12, 0)));
        assert!(window.contains(at(0, 3, 0)));
        assert!(window.contains(at(1, 5, 59)));
        assert!(!window.contains(at(1, 6, 0)));
        assert!(!window.contains(at(3, 12, 0)));
        assert!(!window.contains(at(5, 17, 59)));
        assert!(window.contains(at(5, 18, 0)));
    }

    #[test]
    fn test_nightly_window_wraps_over_midnight() {
        let window = ScheduleWindow::from_columns(None, None, hm(22, 0), hm(6, 0))
            .unwrap()
            .unwrap();

        assert!(window.contains(at(3, 23, 30)));
        assert!(window.contains(at(4, 1, 0)));
        assert!(!window.contains(at(4, 12, 0)));
    }

    #[test]
    fn test_equal_bounds_cover_everything() {
        let window = ScheduleWindow::from_columns(Some(2), Some(2), hm(8, 0), hm(8, 0))
            .unwrap()
            .unwrap();

        for day in 0..7 {
            assert!(window.contains(at(day, 0, 0)));
            assert!(window.contains(at(day, 15, 30)));
        }
    }

    #[test]
    fn test_weekdays_only_covers_whole_days() {
        // Monday..=Friday
        let window = ScheduleWindow::from_columns(Some(1), Some(5), None, None)
            .unwrap()
            .unwrap();

        assert!(window.contains(at(1, 0, 0)));
        assert!(window.contains(at(5, 23, 59)));
        assert!(!window.contains(at(6, 0, 0)));
        assert!(!window.contains(at(0, 12, 0)));
    }

    #[test]
    fn test_saturday_only_wraps_to_sunday_boundary() {
        let window = ScheduleWindow::from_columns(Some(6), Some(6), None, None)
            .unwrap()
            .unwrap();

        assert!(window.contains(at(6, 10, 0)));
        assert!(!window.contains(at(0, 10, 0)));
        assert!(!window.contains(at(5, 10, 0)));
    }

    #[test]
    fn test_no_columns_means_no_window() {
        assert_eq!(ScheduleWindow::from_columns(None, None, None, None), Ok(None));
    }

    #[test]
    fn test_half_set_columns_are_rejected() {
        assert!(ScheduleWindow::from_columns(Some(1), None, None, None).is_err());
        assert!(ScheduleWindow::from_columns(None, None, hm(1, 0), None).is_err());
        assert!(ScheduleWindow::from_columns(Some(7), Some(1), None, None).is_err());
    }
}
