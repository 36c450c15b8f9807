// src/ingest/dates.rs
//! Posted-date parsing for the formats career sites actually emit.
//! Anything unrecognised is "unknown" (`None`), which the filter never penalizes.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_RELATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+)\+?\s*(minutes?|hours?|days?|weeks?)\s*ago").expect("relative date regex")
});

static RE_JSON_LD_POSTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""datePosted"\s*:\s*"([^"]+)""#).expect("json-ld regex"));

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y", "%b %d, %Y", "%d %B %Y"];

/// Parsed dates further ahead than this are treated as unknown.
const MAX_FUTURE_DAYS: i64 = 30;

/// Parse a raw posted-date string relative to `now`.
pub fn parse_posted_date(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(caps) = RE_RELATIVE.captures(raw) {
        let value: i64 = caps.get(1)?.as_str().parse().ok()?;
        let unit = caps.get(2)?.as_str().to_ascii_lowercase();
        let delta = if unit.starts_with("minute") {
            TimeDelta::try_minutes(value)
        } else if unit.starts_with("hour") {
            TimeDelta::try_hours(value)
        } else if unit.starts_with("day") {
            TimeDelta::try_days(value)
        } else {
            TimeDelta::try_weeks(value)
        };
        // out of chrono's range: unknown, not a panic
        return delta.and_then(|d| now.checked_sub_signed(d));
    }

    let lower = raw.to_ascii_lowercase();
    let bare = lower.strip_prefix("posted").map(str::trim).unwrap_or(&lower);
    match bare {
        "today" | "just now" | "just posted" => return Some(now),
        "yesterday" => return now.checked_sub_signed(Duration::days(1)),
        _ => {}
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
        }
    }

    None
}

/// Drop implausible dates: more than 30 days ahead of `now`, or older than
/// `max_age_days` when given.
pub fn sane_posted(
    dt: DateTime<Utc>,
    now: DateTime<Utc>,
    max_age_days: Option<i64>,
) -> Option<DateTime<Utc>> {
    let too_new = TimeDelta::try_days(MAX_FUTURE_DAYS)
        .and_then(|d| now.checked_add_signed(d))
        .is_some_and(|limit| dt > limit);
    let too_old = max_age_days
        .and_then(TimeDelta::try_days)
        .and_then(|d| now.checked_sub_signed(d))
        .is_some_and(|limit| dt < limit);
    if too_new || too_old {
        tracing::debug!(target: "ingest", posted = %dt, "implausible posted date dropped");
        return None;
    }
    Some(dt)
}

/// Find a JSON-LD `"datePosted":"..."` value embedded in free text.
pub fn extract_json_ld_posted(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let caps = RE_JSON_LD_POSTED.captures(text)?;
    parse_posted_date(caps.get(1)?.as_str(), now)
}
