//! Relative time parsing for age thresholds.
//!
//! Accepts a bare number of seconds (`90`), a clock form (`1:30` is minutes
//! and seconds, `2:00:00` is hours, minutes and seconds), or a sequence of
//! number/unit pairs such as `3d`, `24h`, `30 days`, `1h30m` or
//! `1 week, 2 days and 3 hours`. Units are weeks, days, hours, minutes and
//! seconds with their usual abbreviations; numbers may be fractional.

use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Error for a duration string no grammar accepts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationParseError {
    #[error("empty duration")]
    Empty,

    #[error("invalid duration '{0}'")]
    Invalid(String),

    #[error("unknown time unit '{unit}' in '{input}'")]
    UnknownUnit { input: String, unit: String },

    #[error("duration '{0}' is out of range")]
    OutOfRange(String),
}

fn clock_grammar() -> &'static Regex {
    static CLOCK: OnceLock<Regex> = OnceLock::new();
    CLOCK.get_or_init(|| {
        Regex::new(r"^(?:(\d+):)?(\d+):(\d{2}(?:\.\d+)?)$").expect("valid clock grammar")
    })
}

fn term_grammar() -> &'static Regex {
    static TERM: OnceLock<Regex> = OnceLock::new();
    TERM.get_or_init(|| {
        Regex::new(r"^\s*(?:,|and\s)?\s*(\d+(?:\.\d+)?)\s*([a-z]+)\s*").expect("valid term grammar")
    })
}

fn unit_seconds(unit: &str) -> Option<f64> {
    let seconds = match unit {
        "w" | "wk" | "wks" | "week" | "weeks" => 7.0 * 24.0 * 3600.0,
        "d" | "dy" | "dys" | "day" | "days" => 24.0 * 3600.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3600.0,
        "m" | "min" | "mins" | "minute" | "minutes" => 60.0,
        "s" | "sec" | "secs" | "second" | "seconds" => 1.0,
        _ => return None,
    };
    Some(seconds)
}

fn to_delta(seconds: f64, input: &str) -> Result<TimeDelta, DurationParseError> {
    let millis = (seconds * 1000.0).round();
    if !millis.is_finite() || millis > i64::MAX as f64 {
        return Err(DurationParseError::OutOfRange(input.to_string()));
    }
    TimeDelta::try_milliseconds(millis as i64)
        .ok_or_else(|| DurationParseError::OutOfRange(input.to_string()))
}

fn number(text: &str, input: &str) -> Result<f64, DurationParseError> {
    text.parse::<f64>()
        .map_err(|_| DurationParseError::Invalid(input.to_string()))
}

/// Parse a relative duration.
pub fn parse_duration(input: &str) -> Result<TimeDelta, DurationParseError> {
    let normalized = input.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(DurationParseError::Empty);
    }

    if let Ok(seconds) = normalized.parse::<f64>() {
        if seconds.is_sign_negative() || !seconds.is_finite() {
            return Err(DurationParseError::Invalid(input.to_string()));
        }
        return to_delta(seconds, input);
    }

    if let Some(caps) = clock_grammar().captures(&normalized) {
        let hours = match caps.get(1) {
            Some(h) => number(h.as_str(), input)?,
            None => 0.0,
        };
        let minutes = number(&caps[2], input)?;
        let seconds = number(&caps[3], input)?;
        return to_delta(hours * 3600.0 + minutes * 60.0 + seconds, input);
    }

    let mut rest = normalized.as_str();
    let mut total = 0.0;
    while !rest.trim().is_empty() {
        let caps = term_grammar()
            .captures(rest)
            .ok_or_else(|| DurationParseError::Invalid(input.to_string()))?;

        let value = number(&caps[1], input)?;
        let unit = &caps[2];
        let scale = unit_seconds(unit).ok_or_else(|| DurationParseError::UnknownUnit {
            input: input.to_string(),
            unit: unit.to_string(),
        })?;

        total += value * scale;
        rest = &rest[caps[0].len()..];
    }

    to_delta(total, input)
}

/// The instant `duration` before `now`.
pub fn cutoff_from(
    duration: TimeDelta,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, DurationParseError> {
    now.checked_sub_signed(duration)
        .ok_or_else(|| DurationParseError::OutOfRange(duration.to_string()))
}

/// Cutoff for an optional duration string, measured back from the current time.
pub fn timedelta_type(value: Option<&str>) -> Result<Option<DateTime<Utc>>, DurationParseError> {
    value
        .map(|v| cutoff_from(parse_duration(v)?, Utc::now()))
        .transpose()
}
