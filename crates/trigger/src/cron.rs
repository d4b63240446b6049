// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic cron subset: parse 5/6-field expressions and compute the
//! next fire time after a given instant.
//!
//! Each field parses into a set of allowed integers; the search walks
//! forward minute-by-minute (seconds zeroed) until every field matches, up
//! to 366 days. All arithmetic is on [`NaiveDateTime`] — callers pick the
//! timezone and must use it consistently.

use chrono::{Datelike, Duration, NaiveDateTime, Timelike};
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;

/// Upper bound on the minute-by-minute scan: 366 days.
const MAX_SCAN_MINUTES: u32 = 366 * 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CronError {
    #[error("expected 5 or 6 fields, got {0}")]
    FieldCount(usize),
    #[error("invalid {field} field {spec:?}")]
    InvalidField { field: &'static str, spec: String },
    #[error("{field} value {value} out of range {min}..={max}")]
    OutOfRange { field: &'static str, value: u32, min: u32, max: u32 },
    #[error("step must be positive in {field} field {spec:?}")]
    ZeroStep { field: &'static str, spec: String },
}

/// Set of allowed values for one cron field, as a bitmask over 0..=63.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FieldSet(u64);

impl FieldSet {
    fn contains(self, value: u32) -> bool {
        value < 64 && self.0 & (1 << value) != 0
    }
}

/// A parsed cron schedule: `minute hour day-of-month month day-of-week`.
///
/// Day-of-week runs 0–6 with 0 = Sunday. A 6-field expression has a leading
/// seconds field, which is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    minute: FieldSet,
    hour: FieldSet,
    day_of_month: FieldSet,
    month: FieldSet,
    day_of_week: FieldSet,
}

impl FromStr for CronSchedule {
    type Err = CronError;

    fn from_str(expr: &str) -> Result<Self, CronError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        let fields = match fields.len() {
            5 => &fields[..],
            6 => &fields[1..],
            n => return Err(CronError::FieldCount(n)),
        };
        Ok(Self {
            minute: parse_field(fields[0], "minute", 0, 59)?,
            hour: parse_field(fields[1], "hour", 0, 23)?,
            day_of_month: parse_field(fields[2], "day-of-month", 1, 31)?,
            month: parse_field(fields[3], "month", 1, 12)?,
            day_of_week: parse_field(fields[4], "day-of-week", 0, 6)?,
        })
    }
}

impl CronSchedule {
    /// First instant strictly after `after` (seconds zeroed) matching every
    /// field, or `None` if none exists within 366 days.
    pub fn next_after(&self, after: NaiveDateTime) -> Option<NaiveDateTime> {
        let mut t = after.with_second(0)?.with_nanosecond(0)? + Duration::minutes(1);
        for _ in 0..MAX_SCAN_MINUTES {
            if self.matches(t) {
                return Some(t);
            }
            t += Duration::minutes(1);
        }
        None
    }

    fn matches(&self, t: NaiveDateTime) -> bool {
        self.minute.contains(t.minute())
            && self.hour.contains(t.hour())
            && self.day_of_month.contains(t.day())
            && self.month.contains(t.month())
            && self.day_of_week.contains(t.weekday().num_days_from_sunday())
    }
}

/// Parse one field into its allowed-value set.
///
/// Grammar per comma-separated part: `*`, `N`, `N-M`, `*/S`, `N-M/S`.
fn parse_field(
    spec: &str,
    field: &'static str,
    min: u32,
    max: u32,
) -> Result<FieldSet, CronError> {
    let invalid = || CronError::InvalidField { field, spec: spec.to_string() };
    let mut mask = 0u64;
    for part in spec.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step.parse().map_err(|_| invalid())?;
                if step == 0 {
                    return Err(CronError::ZeroStep { field, spec: spec.to_string() });
                }
                (range, step)
            }
            None => (part, 1),
        };
        let (lo, hi) = if range == "*" {
            (min, max)
        } else if let Some((a, b)) = range.split_once('-') {
            (parse_value(a, field, min, max)?, parse_value(b, field, min, max)?)
        } else {
            let n = parse_value(range, field, min, max)?;
            (n, n)
        };
        if lo > hi {
            return Err(invalid());
        }
        let mut v = lo;
        while v <= hi {
            mask |= 1 << v;
            v += step;
        }
    }
    Ok(FieldSet(mask))
}

fn parse_value(s: &str, field: &'static str, min: u32, max: u32) -> Result<u32, CronError> {
    let value: u32 = s
        .parse()
        .map_err(|_| CronError::InvalidField { field, spec: s.to_string() })?;
    if value < min || value > max {
        return Err(CronError::OutOfRange { field, value, min, max });
    }
    Ok(value)
}

/// Next fire time for a schedule expression, `None` when the expression is
/// invalid or no matching minute exists.
pub fn next_after(expr: &str, after: NaiveDateTime) -> Option<NaiveDateTime> {
    CronSchedule::from_str(expr).ok()?.next_after(after)
}

/// Per-field shape: `*` or a number, optional range, optional step, in a
/// comma list.
#[allow(clippy::expect_used)]
static FIELD_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\*|\d{1,2})(-\d{1,2})?(/[1-9]\d*)?(,(\*|\d{1,2})(-\d{1,2})?(/[1-9]\d*)?)*$")
        .expect("constant regex pattern is valid")
});

/// Cheap structural pre-check: field count plus a per-field shape regex.
///
/// The full parser remains the definitive filter; this only exists to
/// reject obviously malformed expressions without constructing value sets.
pub fn is_valid_expression(expr: &str) -> bool {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if !(fields.len() == 5 || fields.len() == 6) {
        return false;
    }
    fields.iter().all(|f| FIELD_SHAPE.is_match(f))
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
