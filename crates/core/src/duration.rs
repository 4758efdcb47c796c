//! Parsing of expiry strings such as `15m`, `7d` or `1.5h`.
//!
//! A month is 2,629,800 seconds and a year 31,557,600 seconds (365.25 days).
//! Malformed input is a configuration error and is meant to stop startup.

use chrono::{TimeDelta, Utc};

use crate::error::CoreError;

const SECOND_MS: f64 = 1_000.0;

/// Longest accepted lifetime: 100 years.
pub const MAX_DURATION_MS: i64 = 100 * 31_557_600_000;

fn unit_millis(unit: &str) -> Option<f64> {
    let ms = match unit {
        "ms" => 1.0,
        "s" => SECOND_MS,
        "m" => 60.0 * SECOND_MS,
        "h" => 3_600.0 * SECOND_MS,
        "d" => 86_400.0 * SECOND_MS,
        "M" | "mo" | "month" | "months" => 2_629_800.0 * SECOND_MS,
        "y" | "year" | "years" => 31_557_600.0 * SECOND_MS,
        _ => return None,
    };
    Some(ms)
}

/// Parse a duration string into whole milliseconds.
///
/// The result is at least 1 ms, at most [`MAX_DURATION_MS`], and can be
/// added to the current time without overflow.
pub fn parse_duration_ms(input: &str) -> Result<i64, CoreError> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| c.is_ascii_alphabetic())
        .ok_or_else(|| CoreError::Validation(format!("Missing unit in duration '{input}'")))?;
    let (number, unit) = trimmed.split_at(split);

    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| CoreError::Validation(format!("Invalid time value in duration '{input}'")))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(CoreError::Validation(format!(
            "Duration must be positive, got '{input}'"
        )));
    }

    let factor = unit_millis(unit)
        .ok_or_else(|| CoreError::Validation(format!("Invalid unit '{unit}' in duration '{input}'")))?;

    let ms = (value * factor).round();
    if ms < 1.0 {
        return Err(CoreError::Validation(format!(
            "Duration '{input}' is shorter than 1ms"
        )));
    }
    if ms > MAX_DURATION_MS as f64 {
        return Err(CoreError::Validation(format!(
            "Duration '{input}' is longer than 100 years"
        )));
    }

    let ms = ms as i64;
    TimeDelta::try_milliseconds(ms)
        .and_then(|delta| Utc::now().checked_add_signed(delta))
        .ok_or_else(|| CoreError::Validation(format!("Duration '{input}' is out of range")))?;
    Ok(ms)
}
