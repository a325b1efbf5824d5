pub mod error;
pub mod models;
pub mod pool;
pub mod random_slots;
pub mod scheduler;
pub mod selection;
pub mod time_slots;
pub mod timing;
pub mod transforms;

pub use error::{LineupError, LineupResult};
pub use models::{
    total_duration_ms, Direction, DurationSpec, FlexPreference, LineupEntry, PadStyle, Program,
    ProgramKind, RandomDistribution, RandomSlot, RandomSlotOrder, RandomSlotSchedule,
    ScheduleResult, ScheduleSpec, SlotOrder, SlotSelector, TimeSlot, TimeSlotSchedule,
};
pub use random_slots::{schedule_random_slots, RandomSlotScheduler};
pub use scheduler::{schedule, SchedulerConfig};
pub use selection::derive_seed;
pub use time_slots::{schedule_time_slots, TimeSlotScheduler};
pub use transforms::{
    balance, consolidate, pad_start_times, remove_duplicates, replicate, restrict_hours,
    BalanceBy, HourRestriction, ReplicateMode, RestrictedLineup,
};
