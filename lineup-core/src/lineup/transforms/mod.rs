//! Transforms over generated lineups. Each takes entries and returns new
//! entries; none of them mutate their input.

mod balance;
mod cleanup;
mod consolidate;
mod replicate;
mod restrict;

pub use balance::{balance, BalanceBy};
pub use cleanup::{pad_start_times, remove_duplicates};
pub use consolidate::consolidate;
pub use replicate::{replicate, ReplicateMode};
pub use restrict::{restrict_hours, HourRestriction, RestrictedLineup};
