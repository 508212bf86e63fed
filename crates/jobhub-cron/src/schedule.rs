//! Cron schedule parsing and occurrence search.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

use crate::error::CronError;

/// Occurrence search gives up after this horizon.
const SEARCH_HORIZON_DAYS: i64 = 4 * 366;

/// A parsed five-field cron schedule.
///
/// Fields are minute (0–59), hour (0–23), day-of-month (1–31), month (1–12),
/// and day-of-week (0–7, where 0 and 7 both mean Sunday and 7 is normalized
/// to 0). An instant matches when its minute, hour, and month are all in
/// their sets and the day rule holds: a `*` day field is unrestricted, and
/// when both day-of-month and day-of-week are restricted, either matching
/// suffices (the day-of-month OR day-of-week rule of deployed cron).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    minutes: Vec<u8>,
    hours: Vec<u8>,
    days_of_month: Vec<u8>,
    months: Vec<u8>,
    days_of_week: Vec<u8>,
    dom_wildcard: bool,
    dow_wildcard: bool,
}

impl CronSchedule {
    /// Parse a five-field cron expression.
    pub fn parse(expression: &str) -> Result<Self, CronError> {
        if expression.trim().is_empty() {
            return Err(CronError::invalid("expression is empty"));
        }

        let fields: Vec<&str> = expression.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(CronError::invalid(format!(
                "expected 5 fields, got {}",
                fields.len()
            )));
        }

        let mut days_of_week = parse_field(fields[4], 0, 7, "day-of-week")?;
        // Both 0 and 7 mean Sunday.
        for value in &mut days_of_week {
            if *value == 7 {
                *value = 0;
            }
        }
        days_of_week.sort_unstable();
        days_of_week.dedup();

        Ok(Self {
            minutes: parse_field(fields[0], 0, 59, "minute")?,
            hours: parse_field(fields[1], 0, 23, "hour")?,
            days_of_month: parse_field(fields[2], 1, 31, "day-of-month")?,
            months: parse_field(fields[3], 1, 12, "month")?,
            days_of_week,
            dom_wildcard: fields[2] == "*",
            dow_wildcard: fields[4] == "*",
        })
    }

    /// Check whether the given instant matches this schedule.
    ///
    /// Seconds and subsecond precision are ignored; scheduling granularity
    /// is whole minutes.
    pub fn matches(&self, at: DateTime<Utc>) -> bool {
        self.minutes.contains(&(at.minute() as u8))
            && self.hours.contains(&(at.hour() as u8))
            && self.months.contains(&(at.month() as u8))
            && self.day_matches(at)
    }

    /// Find the smallest whole-minute instant strictly after `after` that
    /// matches this schedule.
    ///
    /// The search is field-wise (skipping whole months, days, and hours that
    /// cannot match) and bounded: expressions with no occurrence within four
    /// years fail with [`CronError::NoOccurrence`].
    pub fn next_occurrence(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>, CronError> {
        let limit = after + Duration::days(SEARCH_HORIZON_DAYS);
        let mut at = truncate_to_minute(after) + Duration::minutes(1);

        while at <= limit {
            if !self.months.contains(&(at.month() as u8)) {
                at = start_of_next_month(at);
            } else if !self.day_matches(at) {
                at = start_of_next_day(at);
            } else if !self.hours.contains(&(at.hour() as u8)) {
                at = start_of_next_hour(at);
            } else if !self.minutes.contains(&(at.minute() as u8)) {
                at += Duration::minutes(1);
            } else {
                return Ok(at);
            }
        }

        Err(CronError::NoOccurrence)
    }

    fn day_matches(&self, at: DateTime<Utc>) -> bool {
        let dom = self.days_of_month.contains(&(at.day() as u8));
        let dow = self
            .days_of_week
            .contains(&(at.weekday().num_days_from_sunday() as u8));
        match (self.dom_wildcard, self.dow_wildcard) {
            (true, true) => true,
            (true, false) => dow,
            (false, true) => dom,
            (false, false) => dom || dow,
        }
    }
}

/// Parse one field into its sorted, deduplicated value set.
fn parse_field(field: &str, min: u8, max: u8, name: &str) -> Result<Vec<u8>, CronError> {
    let mut values = Vec::new();
    for part in field.split(',') {
        values.extend(parse_part(part, min, max, name)?);
    }
    values.sort_unstable();
    values.dedup();
    Ok(values)
}

/// Parse a single list element: `base` or `base/step`.
fn parse_part(part: &str, min: u8, max: u8, name: &str) -> Result<Vec<u8>, CronError> {
    let (base, step) = match part.split_once('/') {
        Some((base, step)) => {
            let step: usize = step.parse().map_err(|_| {
                CronError::invalid(format!("{name} field has unparsable step '{step}'"))
            })?;
            if step == 0 {
                return Err(CronError::invalid(format!(
                    "{name} field has non-positive step"
                )));
            }
            (base, step)
        }
        None => (part, 1),
    };

    let generated = parse_base(base, min, max, name)?;
    // Retain indices 0, step, 2*step, ... of the ordered base set.
    Ok(generated.into_iter().step_by(step).collect())
}

/// Parse a step base: `*`, `a-b`, or a single value.
fn parse_base(base: &str, min: u8, max: u8, name: &str) -> Result<Vec<u8>, CronError> {
    if base == "*" {
        return Ok((min..=max).collect());
    }

    if let Some((start, end)) = base.split_once('-') {
        let start = parse_value(start, min, max, name)?;
        let end = parse_value(end, min, max, name)?;
        if start > end {
            return Err(CronError::invalid(format!(
                "{name} field has inverted range {start}-{end}"
            )));
        }
        return Ok((start..=end).collect());
    }

    Ok(vec![parse_value(base, min, max, name)?])
}

/// Parse a bare numeric value, bounds-checked against the field's range.
fn parse_value(value: &str, min: u8, max: u8, name: &str) -> Result<u8, CronError> {
    let parsed: u8 = value
        .parse()
        .map_err(|_| CronError::invalid(format!("{name} field has unparsable value '{value}'")))?;
    if parsed < min || parsed > max {
        return Err(CronError::invalid(format!(
            "{name} value {parsed} out of range {min}-{max}"
        )));
    }
    Ok(parsed)
}

fn truncate_to_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    at - Duration::nanoseconds(at.nanosecond() as i64) - Duration::seconds(at.second() as i64)
}

/// `at` must already be truncated to a whole minute.
fn start_of_next_hour(at: DateTime<Utc>) -> DateTime<Utc> {
    at - Duration::minutes(at.minute() as i64) + Duration::hours(1)
}

fn start_of_next_day(at: DateTime<Utc>) -> DateTime<Utc> {
    let midnight = at - Duration::minutes(at.minute() as i64) - Duration::hours(at.hour() as i64);
    midnight + Duration::days(1)
}

fn start_of_next_month(at: DateTime<Utc>) -> DateTime<Utc> {
    let mut day = start_of_next_day(at);
    while day.day() != 1 {
        day += Duration::days(1);
    }
    day
}
