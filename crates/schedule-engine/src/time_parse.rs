//! Time expression parsing for task creation
//!
//! Accepts "N minutes", "N hours", "today HH:MM", "tomorrow [HH:MM]",
//! "HH:MM" and "YYYY-MM-DD HH:MM". Anything else resolves to ten minutes
//! from now; parsing never fails.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::OnceLock;

const FALLBACK_MINUTES: i64 = 10;
const DEFAULT_HOURS: i64 = 1;
const TOMORROW_DEFAULT: (u32, u32) = (9, 0);

fn integer_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| compile(r"\d+")).as_ref()
}

fn clock_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| compile(r"(\d{1,2}):?(\d{2})?")).as_ref()
}

/// An invalid pattern is logged and disables its branch of the parser
fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!("Invalid time pattern {}: {}", pattern, e);
            None
        }
    }
}

/// Resolve `expr` relative to `now` (local wall-clock time)
#[must_use]
pub fn parse_time_expression(expr: &str, now: NaiveDateTime) -> NaiveDateTime {
    let expr = expr.trim().to_lowercase();
    let fallback = || now + Duration::minutes(FALLBACK_MINUTES);

    if expr.contains("minute") {
        let minutes = first_integer(&expr).unwrap_or(FALLBACK_MINUTES);
        return offset(now, Duration::try_minutes(minutes)).unwrap_or_else(fallback);
    }
    if expr.contains("hour") {
        let hours = first_integer(&expr).unwrap_or(DEFAULT_HOURS);
        return offset(now, Duration::try_hours(hours)).unwrap_or_else(fallback);
    }

    if expr.contains("tomorrow") {
        let (hour, minute) = clock(&expr).unwrap_or(TOMORROW_DEFAULT);
        let Some(date) = now.date().succ_opt() else {
            return fallback();
        };
        return at(date, hour, minute).unwrap_or_else(fallback);
    }

    if expr.contains("today") {
        if let Some(resolved) = clock(&expr).and_then(|(h, m)| at(now.date(), h, m)) {
            return resolved;
        }
    }

    if let Ok(absolute) = NaiveDateTime::parse_from_str(&expr, "%Y-%m-%d %H:%M") {
        return absolute;
    }

    if let Ok(time) = NaiveTime::parse_from_str(&expr, "%H:%M") {
        let today = now.date().and_time(time);
        // A time that has already passed today means the next occurrence
        return if today <= now {
            today + Duration::days(1)
        } else {
            today
        };
    }

    tracing::debug!("Unrecognised time expression {:?}, using fallback", expr);
    fallback()
}

fn first_integer(s: &str) -> Option<i64> {
    integer_re()?
        .find(s)
        .and_then(|m| m.as_str().parse::<i64>().ok())
}

fn clock(s: &str) -> Option<(u32, u32)> {
    let caps = clock_re()?.captures(s)?;
    let hour = caps.get(1)?.as_str().parse().ok()?;
    let minute = caps
        .get(2)
        .map_or(Some(0), |m| m.as_str().parse().ok())?;
    Some((hour, minute))
}

fn at(date: NaiveDate, hour: u32, minute: u32) -> Option<NaiveDateTime> {
    date.and_hms_opt(hour, minute, 0)
}

fn offset(now: NaiveDateTime, delta: Option<Duration>) -> Option<NaiveDateTime> {
    delta.and_then(|d| now.checked_add_signed(d))
}
