//! Parsing of user-supplied scheduling directives
//!
//! The remote service owns slot selection; this module only turns what a
//! user typed into a wire-level `ScheduleDirective`.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use crate::error::{Result, TypecastError};
use crate::types::ScheduleDirective;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Parse a schedule string into a directive
///
/// Supports:
/// - Symbolic values: "now", "next-free-slot"
/// - RFC 3339 timestamps: "2030-11-20T15:00:00Z"
/// - Naive timestamps, taken as UTC: "2030-11-20 15:00"
/// - Relative durations: "2h", "+30m", "in 1 day"
/// - Natural language: "tomorrow 3pm", "next monday 10am"
///
/// Everything except the symbolic values resolves to an explicit timestamp.
///
/// # Errors
///
/// Returns `TypecastError::Validation` if the input is empty, cannot be
/// parsed, or names a time that has already passed.
pub fn parse_directive(input: &str) -> Result<ScheduleDirective> {
    parse_directive_at(input, Utc::now())
}

/// Same as [`parse_directive`] with an explicit reference time
pub fn parse_directive_at(input: &str, now: DateTime<Utc>) -> Result<ScheduleDirective> {
    let input = input.trim();
    if input.is_empty() {
        return Err(TypecastError::validation_field(
            "Schedule date cannot be empty",
            "schedule_date",
        ));
    }

    match input.to_lowercase().as_str() {
        "now" => return Ok(ScheduleDirective::Now),
        "next-free-slot" | "next free slot" | "next_free_slot" => {
            return Ok(ScheduleDirective::NextFreeSlot)
        }
        _ => {}
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return in_future(dt.with_timezone(&Utc), now, input);
    }

    if let Some(dt) = parse_naive(input) {
        return in_future(dt, now, input);
    }

    if let Ok(duration) = parse_duration(input) {
        let at = now.checked_add_signed(duration).ok_or_else(|| {
            TypecastError::validation_field("Schedule date out of range", "schedule_date")
        })?;
        return Ok(ScheduleDirective::At(at));
    }

    if let Ok(dt) = chrono_english::parse_date_string(input, now, chrono_english::Dialect::Us) {
        return in_future(dt, now, input);
    }

    Err(TypecastError::validation_field(
        format!(
            "Could not parse schedule date '{}'. Use \"now\", \"next-free-slot\", an ISO-8601 timestamp, or a duration like \"2h\"",
            input
        ),
        "schedule_date",
    ))
}

fn parse_naive(input: &str) -> Option<DateTime<Utc>> {
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .map(|naive| naive.and_utc())
}

/// Parse a duration string such as "2h", "+30m" or "in 1 day"
fn parse_duration(input: &str) -> Result<Duration> {
    let stripped = input
        .strip_prefix('+')
        .or_else(|| input.strip_prefix("in "))
        .unwrap_or(input)
        .trim();

    let std_duration = humantime::parse_duration(stripped).map_err(|e| {
        TypecastError::validation(format!("Could not parse duration '{}': {}", input, e))
    })?;

    let seconds = i64::try_from(std_duration.as_secs())
        .map_err(|_| TypecastError::validation("Duration out of range"))?;

    if seconds == 0 {
        return Err(TypecastError::validation("Duration must be greater than zero"));
    }

    Duration::try_seconds(seconds).ok_or_else(|| TypecastError::validation("Duration out of range"))
}

fn in_future(at: DateTime<Utc>, now: DateTime<Utc>, input: &str) -> Result<ScheduleDirective> {
    if at <= now {
        return Err(TypecastError::validation_field(
            format!("Schedule date '{}' is in the past", input),
            "schedule_date",
        ));
    }
    Ok(ScheduleDirective::At(at))
}
