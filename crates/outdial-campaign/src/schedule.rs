// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recurring-schedule expressions.
//!
//! A campaign's recurrence is either an iCalendar rule, optionally preceded by
//! a `DTSTART` line:
//!
//! ```text
//! DTSTART:20260105T090000Z
//! RRULE:FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE,FR;UNTIL=20261231T000000Z
//! ```
//!
//! or a cron expression such as `0 9 * * MON-FRI`. Dialing is allowed on any
//! UTC date the expression yields an occurrence for.

use std::str::FromStr;

use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone, Utc, Weekday};
use croner::Cron;
use outdial_core::OutdialError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// The supported subset of an iCalendar `RRULE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub start: Option<NaiveDate>,
    pub frequency: Frequency,
    pub interval: u32,
    pub by_day: Vec<Weekday>,
    pub by_month_day: Vec<i32>,
    pub until: Option<NaiveDate>,
}

#[derive(Clone)]
pub enum Recurrence {
    Rule(RecurrenceRule),
    Cron(Box<Cron>),
}

impl Recurrence {
    pub fn parse(expression: &str) -> Result<Self, OutdialError> {
        let trimmed = expression.trim();
        if trimmed.is_empty() {
            return Err(OutdialError::Config("empty recurrence expression".into()));
        }
        let upper = trimmed.to_ascii_uppercase();
        if upper.contains("FREQ=") || upper.starts_with("DTSTART") || upper.starts_with("RRULE") {
            return RecurrenceRule::parse(trimmed).map(Recurrence::Rule);
        }
        Cron::from_str(trimmed)
            .map(|cron| Recurrence::Cron(Box::new(cron)))
            .map_err(|e| OutdialError::Config(format!("invalid recurrence '{trimmed}': {e}")))
    }

    /// Whether the schedule has an occurrence on the UTC date of `now`.
    pub fn includes_day(&self, now: DateTime<Utc>) -> bool {
        let date = now.date_naive();
        match self {
            Recurrence::Rule(rule) => rule.includes_date(date),
            Recurrence::Cron(cron) => {
                let Some(midnight) = date.and_hms_opt(0, 0, 0) else {
                    return false;
                };
                let midnight = Utc.from_utc_datetime(&midnight);
                cron.find_next_occurrence(&midnight, true)
                    .map(|next| next.date_naive() == date)
                    .unwrap_or(false)
            }
        }
    }
}

impl RecurrenceRule {
    pub fn parse(expression: &str) -> Result<Self, OutdialError> {
        let mut start = None;
        let mut rule_body = None;

        for line in expression.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let (name, value) = line.split_once(':').unwrap_or(("RRULE", line));
            // DTSTART may carry parameters, e.g. `DTSTART;TZID=UTC:2026...`.
            let name = name.split(';').next().unwrap_or(name).to_ascii_uppercase();
            match name.as_str() {
                "DTSTART" => start = Some(parse_ical_date(value)?),
                "RRULE" => rule_body = Some(value),
                other => {
                    return Err(OutdialError::Config(format!(
                        "unsupported recurrence property '{other}'"
                    )));
                }
            }
        }

        let body = rule_body
            .ok_or_else(|| OutdialError::Config("recurrence is missing an RRULE".into()))?;

        let mut frequency = None;
        let mut interval = 1;
        let mut by_day = Vec::new();
        let mut by_month_day = Vec::new();
        let mut until = None;

        for part in body.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                OutdialError::Config(format!("malformed RRULE part '{part}'"))
            })?;
            match key.to_ascii_uppercase().as_str() {
                "FREQ" => frequency = Some(parse_frequency(value)?),
                "INTERVAL" => {
                    interval = value
                        .parse::<u32>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| OutdialError::Config(format!("invalid INTERVAL '{value}'")))?;
                }
                "BYDAY" => {
                    by_day = value
                        .split(',')
                        .map(parse_weekday)
                        .collect::<Result<Vec<_>, _>>()?;
                }
                "BYMONTHDAY" => {
                    by_month_day = value
                        .split(',')
                        .map(|d| {
                            d.trim()
                                .parse::<i32>()
                                .ok()
                                .filter(|n| *n != 0 && (-31..=31).contains(n))
                                .ok_or_else(|| {
                                    OutdialError::Config(format!("invalid BYMONTHDAY '{d}'"))
                                })
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                }
                "UNTIL" => until = Some(parse_ical_date(value)?),
                "WKST" => {}
                other => {
                    return Err(OutdialError::Config(format!(
                        "unsupported RRULE part '{other}'"
                    )));
                }
            }
        }

        Ok(Self {
            start,
            frequency: frequency
                .ok_or_else(|| OutdialError::Config("RRULE is missing FREQ".into()))?,
            interval,
            by_day,
            by_month_day,
            until,
        })
    }

    pub fn includes_date(&self, date: NaiveDate) -> bool {
        if self.start.is_some_and(|start| date < start) {
            return false;
        }
        if self.until.is_some_and(|until| date > until) {
            return false;
        }
        if !self.by_day.is_empty() && !self.by_day.contains(&date.weekday()) {
            return false;
        }
        if !self.by_month_day.is_empty()
            && !self
                .by_month_day
                .iter()
                .any(|d| month_day_matches(*d, date))
        {
            return false;
        }
        self.matches_implicit_anchor(date) && self.matches_interval(date)
    }

    /// Without BY* parts the occurrence repeats the start date's weekday, day or month-day.
    fn matches_implicit_anchor(&self, date: NaiveDate) -> bool {
        let Some(start) = self.start else {
            return true;
        };
        let has_by = !self.by_day.is_empty() || !self.by_month_day.is_empty();
        if has_by {
            return true;
        }
        match self.frequency {
            Frequency::Daily => true,
            Frequency::Weekly => date.weekday() == start.weekday(),
            Frequency::Monthly => date.day() == start.day(),
            Frequency::Yearly => date.month() == start.month() && date.day() == start.day(),
        }
    }

    fn matches_interval(&self, date: NaiveDate) -> bool {
        if self.interval == 1 {
            return true;
        }
        let Some(start) = self.start else {
            return true;
        };
        let interval = i64::from(self.interval);
        let elapsed = match self.frequency {
            Frequency::Daily => (date - start).num_days(),
            Frequency::Weekly => {
                let week_of = |d: NaiveDate| {
                    d - chrono::Duration::days(i64::from(d.weekday().num_days_from_monday()))
                };
                (week_of(date) - week_of(start)).num_days() / 7
            }
            Frequency::Monthly => months_between(start, date),
            Frequency::Yearly => i64::from(date.year() - start.year()),
        };
        elapsed % interval == 0
    }
}

fn months_between(start: NaiveDate, date: NaiveDate) -> i64 {
    i64::from(date.year() - start.year()) * 12 + i64::from(date.month()) - i64::from(start.month())
}

fn month_day_matches(day: i32, date: NaiveDate) -> bool {
    if day > 0 {
        return date.day() as i32 == day;
    }
    let Some(first_of_next) = date
        .with_day(1)
        .and_then(|d| d.checked_add_months(Months::new(1)))
    else {
        return false;
    };
    let days_in_month = first_of_next.pred_opt().map(|d| d.day() as i32).unwrap_or(31);
    date.day() as i32 == days_in_month + day + 1
}

fn parse_frequency(value: &str) -> Result<Frequency, OutdialError> {
    match value.trim().to_ascii_uppercase().as_str() {
        "DAILY" => Ok(Frequency::Daily),
        "WEEKLY" => Ok(Frequency::Weekly),
        "MONTHLY" => Ok(Frequency::Monthly),
        "YEARLY" => Ok(Frequency::Yearly),
        other => Err(OutdialError::Config(format!("unsupported FREQ '{other}'"))),
    }
}

fn parse_weekday(value: &str) -> Result<Weekday, OutdialError> {
    // Ordinal prefixes such as `1MO` are not supported.
    match value.trim().to_ascii_uppercase().as_str() {
        "MO" => Ok(Weekday::Mon),
        "TU" => Ok(Weekday::Tue),
        "WE" => Ok(Weekday::Wed),
        "TH" => Ok(Weekday::Thu),
        "FR" => Ok(Weekday::Fri),
        "SA" => Ok(Weekday::Sat),
        "SU" => Ok(Weekday::Sun),
        other => Err(OutdialError::Config(format!("unsupported BYDAY '{other}'"))),
    }
}

/// `YYYYMMDD` optionally followed by `THHMMSS[Z]`.
fn parse_ical_date(value: &str) -> Result<NaiveDate, OutdialError> {
    let value = value.trim();
    let date_part = value.get(..8).unwrap_or(value);
    NaiveDate::parse_from_str(date_part, "%Y%m%d")
        .map_err(|e| OutdialError::Config(format!("invalid date '{value}': {e}")))
}
