//! Period, padding and time-zone arithmetic shared by the schedulers and
//! transforms. All values are milliseconds; absolute instants are epoch ms.

use chrono::FixedOffset;

use super::error::{LineupError, LineupResult};

pub const SECOND_MS: i64 = 1_000;
pub const MINUTE_MS: i64 = 60 * SECOND_MS;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
pub const DAY_MS: i64 = 24 * HOUR_MS;

/// Offset east of UTC, validated through chrono.
pub fn fixed_offset(minutes: i32) -> LineupResult<FixedOffset> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or(LineupError::InvalidTimeZone(minutes))
}

pub fn offset_ms(minutes: i32) -> i64 {
    i64::from(minutes) * MINUTE_MS
}

/// Absolute instant at which the local period containing `instant_ms` begins.
pub fn period_start(instant_ms: i64, period_ms: i64, tz_offset_minutes: i32) -> i64 {
    let offset = offset_ms(tz_offset_minutes);
    (instant_ms + offset).div_euclid(period_ms) * period_ms - offset
}

/// First instant at or after `now_ms` that sits `time_of_day_ms` into a local period.
pub fn next_occurrence(
    now_ms: i64,
    period_ms: i64,
    time_of_day_ms: i64,
    tz_offset_minutes: i32,
) -> i64 {
    let candidate = period_start(now_ms, period_ms, tz_offset_minutes) + time_of_day_ms;
    if candidate < now_ms {
        candidate + period_ms
    } else {
        candidate
    }
}

/// Rounds `value` up to the next multiple of `pad_ms`; pads of 0 or 1 are no-ops.
pub fn round_up(value: i64, pad_ms: i64) -> i64 {
    if pad_ms <= 1 {
        return value;
    }
    let remainder = value.rem_euclid(pad_ms);
    if remainder == 0 {
        value
    } else {
        value + pad_ms - remainder
    }
}

/// Flex needed after an entry ending at `end_ms` to land on a pad boundary.
pub fn pad_filler(end_ms: i64, pad_ms: i64) -> i64 {
    round_up(end_ms, pad_ms) - end_ms
}

/// Largest multiple of `pad_ms` not above `value`.
pub fn round_down(value: i64, pad_ms: i64) -> i64 {
    if pad_ms <= 1 {
        return value;
    }
    value - value.rem_euclid(pad_ms)
}

/// Parses `HH:MM` or `HH:MM:SS` into an offset within a day.
pub fn parse_time_of_day(value: &str) -> Option<i64> {
    let parts: Vec<&str> = value.trim().split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }
    let hours: i64 = parts[0].parse().ok()?;
    let minutes: i64 = parts[1].parse().ok()?;
    let seconds: i64 = match parts.get(2) {
        Some(raw) => raw.parse().ok()?,
        None => 0,
    };
    if !(0..=24).contains(&hours) || !(0..60).contains(&minutes) || !(0..60).contains(&seconds) {
        return None;
    }
    let total = hours * HOUR_MS + minutes * MINUTE_MS + seconds * SECOND_MS;
    (total <= DAY_MS).then_some(total)
}

/// Renders a millisecond length as `HH:MM:SS`, hours unbounded.
pub fn format_duration(duration_ms: i64) -> String {
    let total_seconds = duration_ms.max(0) / SECOND_MS;
    format!(
        "{:02}:{:02}:{:02}",
        total_seconds / 3_600,
        (total_seconds / 60) % 60,
        total_seconds % 60
    )
}
