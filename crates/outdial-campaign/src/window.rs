// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Restricted time-of-day windows.
//!
//! Windows are written as `HH:MM` in UTC. A window whose start is before its
//! stop covers `[start, stop]` within one day; any other window wraps past
//! midnight and covers `now >= start || now <= stop`. Both ends are inclusive.

use chrono::{DateTime, Timelike, Utc};
use outdial_core::OutdialError;
use outdial_core::types::CallRestriction;

const MINUTES_PER_DAY: u16 = 24 * 60;

/// A parsed restricted window in minutes of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestrictedWindow {
    start: u16,
    stop: u16,
}

impl RestrictedWindow {
    pub fn parse(start: &str, stop: &str) -> Result<Self, OutdialError> {
        Ok(Self {
            start: parse_minute_of_day(start)?,
            stop: parse_minute_of_day(stop)?,
        })
    }

    pub fn from_restriction(restriction: &CallRestriction) -> Result<Self, OutdialError> {
        Self::parse(&restriction.start_time, &restriction.stop_time)
    }

    /// Whether `minute` (0..1440) falls inside the window.
    pub fn contains(&self, minute: u16) -> bool {
        if self.start < self.stop {
            minute >= self.start && minute <= self.stop
        } else {
            minute >= self.start || minute <= self.stop
        }
    }

    pub fn wraps_midnight(&self) -> bool {
        self.start >= self.stop
    }
}

/// Minutes since midnight UTC.
pub fn minute_of_day(now: DateTime<Utc>) -> u16 {
    (now.hour() * 60 + now.minute()) as u16
}

/// The first restriction whose window contains `now`, if any.
pub fn blocking_restriction<'a>(
    restrictions: &'a [CallRestriction],
    now: DateTime<Utc>,
) -> Result<Option<&'a CallRestriction>, OutdialError> {
    let minute = minute_of_day(now);
    for restriction in restrictions {
        if RestrictedWindow::from_restriction(restriction)?.contains(minute) {
            return Ok(Some(restriction));
        }
    }
    Ok(None)
}

/// Validate every window of a campaign definition.
pub fn validate_restrictions(restrictions: &[CallRestriction]) -> Result<(), OutdialError> {
    for restriction in restrictions {
        RestrictedWindow::from_restriction(restriction)?;
    }
    Ok(())
}

fn parse_minute_of_day(value: &str) -> Result<u16, OutdialError> {
    let invalid = || OutdialError::Config(format!("invalid time of day '{value}', expected HH:MM"));
    let (hours, minutes) = value.trim().split_once(':').ok_or_else(invalid)?;
    let hours: u16 = hours.parse().map_err(|_| invalid())?;
    let minutes: u16 = minutes.parse().map_err(|_| invalid())?;
    if hours >= 24 || minutes >= 60 {
        return Err(invalid());
    }
    let minute = hours * 60 + minutes;
    debug_assert!(minute < MINUTES_PER_DAY);
    Ok(minute)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use proptest::prelude::*;

    use super::*;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, minute, 0).unwrap()
    }

    fn restriction(start: &str, stop: &str) -> CallRestriction {
        CallRestriction {
            id: None,
            start_time: start.into(),
            stop_time: stop.into(),
        }
    }

    #[test]
    fn overnight_window() {
        let w = RestrictedWindow::parse("14:00", "01:30").unwrap();
        assert!(w.wraps_midnight());
        assert!(w.contains(minute_of_day(at(23, 50))));
        assert!(w.contains(minute_of_day(at(1, 30))));
        assert!(!w.contains(minute_of_day(at(2, 0))));
        assert!(!w.contains(minute_of_day(at(13, 59))));
    }

    #[test]
    fn same_day_window() {
        let w = RestrictedWindow::parse("09:00", "17:00").unwrap();
        assert!(w.contains(minute_of_day(at(10, 0))));
        assert!(w.contains(minute_of_day(at(17, 0))));
        assert!(!w.contains(minute_of_day(at(18, 0))));
        assert!(!w.contains(minute_of_day(at(8, 59))));
    }

    #[test]
    fn equal_bounds_block_whole_day() {
        let w = RestrictedWindow::parse("12:00", "12:00").unwrap();
        assert!(w.contains(0));
        assert!(w.contains(1439));
    }

    #[test]
    fn blocking_restriction_picks_first_match() {
        let list = vec![restriction("09:00", "10:00"), restriction("14:00", "01:30")];
        let hit = blocking_restriction(&list, at(23, 50)).unwrap().unwrap();
        assert_eq!(hit.start_time, "14:00");
        assert!(blocking_restriction(&list, at(12, 0)).unwrap().is_none());
    }

    #[test]
    fn malformed_times_are_config_errors() {
        for bad in ["", "9", "24:00", "12:60", "ab:cd"] {
            assert!(
                matches!(RestrictedWindow::parse(bad, "10:00"), Err(OutdialError::Config(_))),
                "{bad} should be rejected"
            );
        }
        assert!(validate_restrictions(&[restriction("9:05", "10:00")]).is_ok());
    }

    proptest! {
        #[test]
        fn overnight_is_complement_of_gap(start in 1u16..1440, stop in 0u16..1440, minute in 0u16..1440) {
            prop_assume!(start > stop + 1);
            let window = RestrictedWindow { start, stop };
            let in_gap = minute > stop && minute < start;
            prop_assert_eq!(window.contains(minute), !in_gap);
        }
    }
}
