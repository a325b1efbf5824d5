pub mod config;
pub mod error;
pub mod lineup;

pub use config::{
    load_lineup, load_lineup_config, load_lineup_document, load_programs, load_schedule_spec,
    BalanceSection, EngineSection, LineupConfig, LineupDocument, LoggingSection,
};
pub use error::{ConfigError, Result};
pub use lineup::{
    balance, consolidate, derive_seed, pad_start_times, remove_duplicates, replicate,
    restrict_hours, schedule, schedule_random_slots, schedule_time_slots, BalanceBy, LineupEntry,
    LineupError, LineupResult, Program, ProgramKind, RandomSlotSchedule, ReplicateMode,
    RestrictedLineup, ScheduleResult, ScheduleSpec, SchedulerConfig, TimeSlotSchedule,
};
