// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Five-field cron expression parsing and matching.
//!
//! The grammar per field is `*`, an integer, a range `a-b`, an interval
//! `*/n`, or a comma list of those. Matching is minute-aligned containment:
//! an instant matches when every field set contains the corresponding
//! component of the local time.

use chrono::{DateTime, Datelike, Local, Timelike};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Errors from parsing a cron expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CronError {
    #[error("expected 5 fields, got {0}")]
    FieldCount(usize),
    #[error("{field}: invalid value '{value}'")]
    InvalidValue { field: &'static str, value: String },
    #[error("{field}: value {value} out of range {min}-{max}")]
    OutOfRange { field: &'static str, value: u32, min: u32, max: u32 },
    #[error("{field}: descending range {start}-{end}")]
    DescendingRange { field: &'static str, start: u32, end: u32 },
    #[error("{field}: interval step must be >= 1")]
    ZeroStep { field: &'static str },
    #[error("unknown schedule special '{0}'")]
    UnknownSpecial(String),
    #[error("empty schedule")]
    Empty,
}

struct FieldSpec {
    name: &'static str,
    min: u32,
    max: u32,
}

const MINUTE: FieldSpec = FieldSpec { name: "minute", min: 0, max: 59 };
const HOUR: FieldSpec = FieldSpec { name: "hour", min: 0, max: 23 };
const DAY_OF_MONTH: FieldSpec = FieldSpec { name: "day-of-month", min: 1, max: 31 };
const MONTH: FieldSpec = FieldSpec { name: "month", min: 1, max: 12 };
const DAY_OF_WEEK: FieldSpec = FieldSpec { name: "day-of-week", min: 0, max: 6 };

/// A parsed cron expression with each field expanded to its value set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpr {
    source: String,
    minutes: BTreeSet<u32>,
    hours: BTreeSet<u32>,
    days_of_month: BTreeSet<u32>,
    months: BTreeSet<u32>,
    days_of_week: BTreeSet<u32>,
}

impl CronExpr {
    /// Parse a classic 5-field expression: `minute hour dom month dow`.
    ///
    /// Day-of-week uses 0-6 with Sunday = 0.
    pub fn parse(source: &str) -> Result<Self, CronError> {
        let source = source.trim();
        if source.is_empty() {
            return Err(CronError::Empty);
        }
        let fields: Vec<&str> = source.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(CronError::FieldCount(fields.len()));
        }
        Ok(Self {
            source: source.to_string(),
            minutes: parse_field(fields[0], &MINUTE)?,
            hours: parse_field(fields[1], &HOUR)?,
            days_of_month: parse_field(fields[2], &DAY_OF_MONTH)?,
            months: parse_field(fields[3], &MONTH)?,
            days_of_week: parse_field(fields[4], &DAY_OF_WEEK)?,
        })
    }

    /// The expression as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the minute-aligned instant `t` matches every field.
    pub fn matches(&self, t: DateTime<Local>) -> bool {
        self.date_matches(t) && self.hours.contains(&t.hour()) && self.minutes.contains(&t.minute())
    }

    /// The largest minute-aligned instant on `t`'s calendar day that is
    /// `<= t` and matches, or `None` when no slot of today has passed.
    ///
    /// This is the catch-up query: a slot that elapsed while the daemon was
    /// down is still reported, and the caller compares it against the last
    /// honored timestamp to get at-most-once-per-slot behavior.
    pub fn latest_before(&self, t: DateTime<Local>) -> Option<DateTime<Local>> {
        if !self.date_matches(t) {
            return None;
        }
        for &h in self.hours.range(..=t.hour()).rev() {
            let minute_cap = if h == t.hour() { t.minute() } else { 59 };
            if let Some(&m) = self.minutes.range(..=minute_cap).next_back() {
                return t
                    .with_hour(h)
                    .and_then(|t| t.with_minute(m))
                    .and_then(|t| t.with_second(0))
                    .and_then(|t| t.with_nanosecond(0));
            }
        }
        None
    }

    /// The smallest minute-aligned instant strictly after `t` that matches,
    /// scanning at most a year ahead.
    pub fn next_after(&self, t: DateTime<Local>) -> Option<DateTime<Local>> {
        for offset in 0..=366i64 {
            let day = t.date_naive() + chrono::Duration::days(offset);
            if !self.date_matches_day(day) {
                continue;
            }
            let slot = if offset == 0 {
                self.first_slot_after(t.hour(), t.minute())
            } else {
                self.first_slot()
            };
            if let Some((hour, minute)) = slot {
                let naive = day.and_hms_opt(hour, minute, 0)?;
                if let Some(resolved) = naive.and_local_timezone(Local).earliest() {
                    return Some(resolved);
                }
            }
        }
        None
    }

    fn first_slot(&self) -> Option<(u32, u32)> {
        Some((*self.hours.first()?, *self.minutes.first()?))
    }

    fn first_slot_after(&self, hour: u32, minute: u32) -> Option<(u32, u32)> {
        if let Some(&m) = self.minutes.range(minute + 1..).next() {
            if self.hours.contains(&hour) {
                return Some((hour, m));
            }
        }
        let h = *self.hours.range(hour + 1..).next()?;
        Some((h, *self.minutes.first()?))
    }

    fn date_matches(&self, t: DateTime<Local>) -> bool {
        self.date_matches_day(t.date_naive())
    }

    fn date_matches_day(&self, day: chrono::NaiveDate) -> bool {
        self.days_of_month.contains(&day.day())
            && self.months.contains(&day.month())
            && self.days_of_week.contains(&day.weekday().num_days_from_sunday())
    }
}

impl fmt::Display for CronExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

fn parse_field(field: &str, spec: &FieldSpec) -> Result<BTreeSet<u32>, CronError> {
    let mut values = BTreeSet::new();
    for part in field.split(',') {
        parse_component(part, spec, &mut values)?;
    }
    Ok(values)
}

fn parse_component(
    part: &str,
    spec: &FieldSpec,
    values: &mut BTreeSet<u32>,
) -> Result<(), CronError> {
    if part == "*" {
        values.extend(spec.min..=spec.max);
        return Ok(());
    }
    if let Some(step) = part.strip_prefix("*/") {
        let n = parse_value(step, spec)?;
        if n == 0 {
            return Err(CronError::ZeroStep { field: spec.name });
        }
        values.extend((spec.min..=spec.max).step_by(n as usize));
        return Ok(());
    }
    if let Some((start, end)) = part.split_once('-') {
        let start = parse_bounded(start, spec)?;
        let end = parse_bounded(end, spec)?;
        if start > end {
            return Err(CronError::DescendingRange { field: spec.name, start, end });
        }
        values.extend(start..=end);
        return Ok(());
    }
    values.insert(parse_bounded(part, spec)?);
    Ok(())
}

fn parse_value(s: &str, spec: &FieldSpec) -> Result<u32, CronError> {
    s.parse().map_err(|_| CronError::InvalidValue { field: spec.name, value: s.to_string() })
}

fn parse_bounded(s: &str, spec: &FieldSpec) -> Result<u32, CronError> {
    let value = parse_value(s, spec)?;
    if value < spec.min || value > spec.max {
        return Err(CronError::OutOfRange {
            field: spec.name,
            value,
            min: spec.min,
            max: spec.max,
        });
    }
    Ok(value)
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
