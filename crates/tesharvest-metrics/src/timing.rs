use chrono::NaiveDateTime;

use crate::error::ExtractError;

/// Fractional-second digits kept when parsing. Anything finer is truncated.
const SUBSECOND_DIGITS: usize = 6;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Parse a TES log timestamp such as `2024-01-01T00:00:05.500000Z`.
///
/// The trailing zone marker (`Z` or a `±HH:MM` offset) is dropped and the
/// value is read as a naive wall-clock time. Fractional seconds beyond
/// microseconds are truncated, not rounded.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, ExtractError> {
  let trimmed = strip_zone(value.trim());
  let truncated = truncate_subseconds(trimmed);

  NaiveDateTime::parse_from_str(truncated, TIMESTAMP_FORMAT).map_err(|e| {
    ExtractError::InvalidTimestamp {
      value: value.to_string(),
      message: e.to_string(),
    }
  })
}

/// Seconds elapsed between two TES log timestamps. May be negative.
pub fn exec_time_seconds(start_time: &str, end_time: &str) -> Result<f64, ExtractError> {
  let start = parse_timestamp(start_time)?;
  let end = parse_timestamp(end_time)?;
  let delta = end.signed_duration_since(start);

  // Microsecond precision keeps the subtraction exact for any realistic run.
  let micros = delta
    .num_microseconds()
    .ok_or_else(|| ExtractError::InvalidTimestamp {
      value: format!("{} .. {}", start_time, end_time),
      message: "duration out of range".to_string(),
    })?;

  Ok(micros as f64 / 1_000_000.0)
}

fn strip_zone(value: &str) -> &str {
  if let Some(stripped) = value.strip_suffix(['Z', 'z']) {
    return stripped;
  }

  // Only look for an offset sign in the time part, dates contain '-' too.
  match value.find('T') {
    Some(t) => match value[t..].rfind(['+', '-']) {
      Some(sign) => &value[..t + sign],
      None => value,
    },
    None => value,
  }
}

fn truncate_subseconds(value: &str) -> &str {
  let Some(dot) = value.rfind('.') else {
    return value;
  };

  // Only an all-digit fraction is cut; anything else is left for the parser to reject.
  let fraction = &value[dot + 1..];
  if !fraction.bytes().all(|b| b.is_ascii_digit()) {
    return value;
  }
  &value[..dot + 1 + fraction.len().min(SUBSECOND_DIGITS)]
}
