//! Wall-clock date-time helpers.
//!
//! Event times travel through the pipeline as naive `YYYY-MM-DDTHH:MM:SS`
//! strings. The configured timezone is attached only when a request is
//! submitted to a provider, so nothing here ever produces an offset.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use std::sync::LazyLock;

/// Zone used when the configured identifier is not a valid IANA name.
pub const DEFAULT_TIMEZONE: &str = "Asia/Kolkata";

/// Format of every naive date-time string produced by this crate.
pub const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

static COLON_OFFSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[+-]\d{2}:\d{2}$").expect("Invalid offset regex"));
static COMPACT_OFFSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[+-]\d{4}$").expect("Invalid offset regex"));

/// Remove a trailing `Z`, `±HH:MM` or `±HHMM` suffix.
///
/// Matching is anchored at the end of the string; the body is never touched.
/// Stripping repeats until nothing changes, so the result is a fixed point.
pub fn strip_offset(value: &str) -> String {
    let mut current = value.trim().to_string();
    loop {
        let next = strip_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_once(value: &str) -> String {
    let without_z = value.strip_suffix('Z').unwrap_or(value);
    let without_colon = COLON_OFFSET.replace(without_z, "");
    COMPACT_OFFSET.replace(&without_colon, "").into_owned()
}

/// Parse a configured zone, falling back to [`DEFAULT_TIMEZONE`].
pub fn resolve_timezone(name: &str) -> Tz {
    match name.trim().parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            log::warn!(
                "Invalid timezone '{}', falling back to {}",
                name,
                DEFAULT_TIMEZONE
            );
            DEFAULT_TIMEZONE.parse().unwrap_or(Tz::UTC)
        }
    }
}

/// Today's date in the given zone.
pub fn local_date(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Tomorrow at `hour:00:00` in the given zone, as a naive string.
pub fn tomorrow_at(now: DateTime<Utc>, tz: Tz, hour: u32) -> String {
    let tomorrow = local_date(now, tz) + Duration::days(1);
    tomorrow
        .and_hms_opt(hour.min(23), 0, 0)
        .unwrap_or_else(|| tomorrow.and_time(chrono::NaiveTime::MIN))
        .format(NAIVE_FORMAT)
        .to_string()
}

/// Parse a naive date-time, accepting optional fractional seconds.
pub fn parse_naive(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, NAIVE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

pub fn format_naive(value: NaiveDateTime) -> String {
    value.format(NAIVE_FORMAT).to_string()
}

/// `value + minutes`, or `None` when `value` is not a naive date-time.
pub fn add_minutes(value: &str, minutes: i64) -> Option<String> {
    parse_naive(value).map(|dt| format_naive(dt + Duration::minutes(minutes)))
}

/// Start of a local day as a UTC RFC 3339 timestamp.
pub fn day_start_utc(date: NaiveDate, tz: Tz) -> String {
    let midnight = date.and_time(chrono::NaiveTime::MIN);
    let local = tz
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight));
    local.to_rfc3339()
}
