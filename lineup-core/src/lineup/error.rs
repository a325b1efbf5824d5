use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum LineupError {
    #[error("program {program_id} has non-positive duration {duration_ms}ms")]
    InvalidProgramDuration { program_id: String, duration_ms: i64 },
    #[error("max_days must be greater than zero (got {0})")]
    InvalidMaxDays(i64),
    #[error("period_ms must be greater than zero (got {0})")]
    InvalidPeriod(i64),
    #[error("pad_ms must be >= 0 (got {0})")]
    NegativePadding(i64),
    #[error("lateness_ms must be >= 0 (got {0})")]
    NegativeLateness(i64),
    #[error("slot {slot} has negative cooldown {cooldown_ms}ms")]
    NegativeCooldown { slot: usize, cooldown_ms: i64 },
    #[error("slot {slot} has invalid weight {weight}")]
    InvalidWeight { slot: usize, weight: f64 },
    #[error("two slots share time of day {0}ms")]
    DuplicateSlotTime(i64),
    #[error("slot time {time_of_day_ms}ms falls outside period of {period_ms}ms")]
    SlotOutsidePeriod { time_of_day_ms: i64, period_ms: i64 },
    #[error("time zone offset of {0} minutes is out of range")]
    InvalidTimeZone(i32),
    #[error("slot {0} requests a fixed count of zero programs")]
    EmptyFixedCount(usize),
    #[error("slot {slot} has non-positive block duration {duration_ms}ms")]
    InvalidBlockDuration { slot: usize, duration_ms: i64 },
}

pub type LineupResult<T> = std::result::Result<T, LineupError>;
