//! Badge date handling.
//!
//! Users type dates loosely: `today`, `3 days ago`, or a full RFC 3339 timestamp.
//! Those are resolved to RFC 3339 at insert time. Anything else is stored exactly as
//! typed and later reports as zero days old.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use regex::Regex;

use crate::storage::BadgeRecord;

static DAYS_AGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+days?\s+ago$").expect("valid regex"));

/// Resolve a user-supplied date token against `now`.
pub fn resolve_date(raw: &str, now: DateTime<Utc>) -> String {
    let trimmed = raw.trim();
    let lowered = trimmed.to_ascii_lowercase();
    if lowered == "today" {
        return now.to_rfc3339_opts(SecondsFormat::Secs, true);
    }
    if let Some(days) = DAYS_AGO
        .captures(&lowered)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
    {
        if let Some(then) = Duration::try_days(days).and_then(|d| now.checked_sub_signed(d)) {
            return then.to_rfc3339_opts(SecondsFormat::Secs, true);
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return parsed
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Secs, true);
    }
    trimmed.to_string()
}

/// Whole days elapsed since `stored`. Unparsable or future dates count as 0.
pub fn days_since(stored: &str, now: DateTime<Utc>) -> i64 {
    match DateTime::parse_from_rfc3339(stored) {
        Ok(then) => (now - then.with_timezone(&Utc)).num_days().max(0),
        Err(_) => 0,
    }
}

/// `name (N days)` entries joined for the badge listing reply.
pub fn format_badge_list(badges: &[BadgeRecord], now: DateTime<Utc>) -> String {
    badges
        .iter()
        .map(|b| format!("{} ({} days)", b.name, days_since(&b.date, now)))
        .collect::<Vec<_>>()
        .join(", ")
}
