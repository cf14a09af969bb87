//! Lightweight cron expression interpreter.
//! Supports: "SEC MIN HOUR DOM MON DOW" (6-field, Quartz-flavoured)
//! Field syntax: *, ? (DOM/DOW only), N, N/M, */M, comma lists
//! Example: "0/5 * * * * ?" = every 5 seconds
//!
//! Stateless and deterministic — no cron crate dependency.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use recron_core::{RecronError, Result};

/// Stop searching after this many days without a match.
const SEARCH_HORIZON_DAYS: u32 = 1462;

/// Compute the earliest instant strictly after `after` matching `expression`.
pub fn next_fire_time(expression: &str, after: DateTime<Utc>) -> Result<DateTime<Utc>> {
    CronSchedule::parse(expression)?.next_after(after)
}

/// A parsed 6-field cron expression. Field value lists are sorted ascending.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    seconds: Vec<u32>,
    minutes: Vec<u32>,
    hours: Vec<u32>,
    days: Vec<u32>,
    months: Vec<u32>,
    /// 0 = Sunday .. 6 = Saturday.
    weekdays: Vec<u32>,
}

impl CronSchedule {
    /// Parse an expression, rejecting anything outside the supported grammar.
    pub fn parse(expression: &str) -> Result<Self> {
        let bad = |reason: &str| RecronError::invalid_expression(expression, reason);

        let parts: Vec<&str> = expression.split_whitespace().collect();
        if parts.len() != 6 {
            return Err(bad("expected 6 fields (SEC MIN HOUR DOM MON DOW)"));
        }

        Ok(Self {
            expression: expression.to_string(),
            seconds: parse_field(parts[0], 0, 59, false).ok_or_else(|| bad("bad seconds field"))?,
            minutes: parse_field(parts[1], 0, 59, false).ok_or_else(|| bad("bad minutes field"))?,
            hours: parse_field(parts[2], 0, 23, false).ok_or_else(|| bad("bad hours field"))?,
            days: parse_field(parts[3], 1, 31, true)
                .ok_or_else(|| bad("bad day-of-month field"))?,
            months: parse_field(parts[4], 1, 12, false).ok_or_else(|| bad("bad month field"))?,
            weekdays: parse_field(parts[5], 0, 6, true)
                .ok_or_else(|| bad("bad day-of-week field (0=SUN..6=SAT)"))?,
        })
    }

    /// Find the next matching instant strictly after `after`.
    /// Errors when no occurrence exists within the search horizon.
    pub fn next_after(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>> {
        // Earliest whole second strictly after `after`.
        let start = after + Duration::seconds(1);
        let mut candidate = start.with_nanosecond(0).unwrap_or(start);

        for _ in 0..SEARCH_HORIZON_DAYS {
            if self.date_matches(candidate.date_naive())
                && let Some(t) = self.next_in_day(candidate)
            {
                return Ok(t);
            }
            let next_day = candidate
                .date_naive()
                .succ_opt()
                .ok_or_else(|| RecronError::timer_arm("date overflow while searching"))?;
            candidate = Utc.from_utc_datetime(&next_day.and_time(NaiveTime::MIN));
        }

        Err(RecronError::invalid_expression(
            &self.expression,
            "no future occurrence within the search horizon",
        ))
    }

    fn date_matches(&self, date: NaiveDate) -> bool {
        self.months.contains(&date.month())
            && self.days.contains(&date.day())
            && self
                .weekdays
                .contains(&date.weekday().num_days_from_sunday())
    }

    /// Smallest matching time-of-day at or after `candidate`, same date.
    fn next_in_day(&self, candidate: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let (ch, cm, cs) = (candidate.hour(), candidate.minute(), candidate.second());
        for &h in &self.hours {
            if h < ch {
                continue;
            }
            for &m in &self.minutes {
                if h == ch && m < cm {
                    continue;
                }
                for &s in &self.seconds {
                    if h == ch && m == cm && s < cs {
                        continue;
                    }
                    return candidate
                        .date_naive()
                        .and_hms_opt(h, m, s)
                        .map(|dt| Utc.from_utc_datetime(&dt));
                }
            }
        }
        None
    }
}

/// Parse a cron field into a sorted list of matching values.
fn parse_field(field: &str, min: u32, max: u32, allow_unspecified: bool) -> Option<Vec<u32>> {
    if field == "*" || (allow_unspecified && field == "?") {
        return Some((min..=max).collect());
    }

    // N/M or */M — start at N (or min), every M
    if let Some((start, step)) = field.split_once('/') {
        let step: u32 = step.parse().ok()?;
        if step == 0 {
            return None;
        }
        let start: u32 = if start == "*" { min } else { start.parse().ok()? };
        if start < min || start > max {
            return None;
        }
        return Some((start..=max).step_by(step as usize).collect());
    }

    // Comma-separated: "0,15,30,45"
    if field.contains(',') {
        let mut vals = Vec::new();
        for part in field.split(',') {
            let n: u32 = part.trim().parse().ok()?;
            if n < min || n > max {
                return None;
            }
            vals.push(n);
        }
        vals.sort_unstable();
        vals.dedup();
        return Some(vals);
    }

    // Single number
    let n: u32 = field.parse().ok()?;
    if n >= min && n <= max { Some(vec![n]) } else { None }
}
