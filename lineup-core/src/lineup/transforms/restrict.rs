use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::lineup::models::LineupEntry;
use crate::lineup::timing::{self, DAY_MS};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RestrictedLineup {
    pub new_start_time: Option<i64>,
    pub new_entries: Vec<LineupEntry>,
}

/// A daily airing window `[start_offset_ms, end_offset_ms)` measured from local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourRestriction {
    pub start_offset_ms: i64,
    pub end_offset_ms: i64,
    pub period_ms: i64,
    pub time_zone_offset_minutes: i32,
}

impl HourRestriction {
    pub fn new(start_offset_ms: i64, end_offset_ms: i64) -> Self {
        Self {
            start_offset_ms,
            end_offset_ms,
            period_ms: DAY_MS,
            time_zone_offset_minutes: 0,
        }
    }

    pub fn with_time_zone(mut self, offset_minutes: i32) -> Self {
        self.time_zone_offset_minutes = offset_minutes;
        self
    }

    pub fn is_valid(&self) -> bool {
        self.period_ms > 0
            && (0..=self.period_ms).contains(&self.start_offset_ms)
            && self.start_offset_ms < self.end_offset_ms
            && self.end_offset_ms <= self.start_offset_ms + self.period_ms
            && timing::fixed_offset(self.time_zone_offset_minutes).is_ok()
    }

    pub fn window_ms(&self) -> i64 {
        self.end_offset_ms - self.start_offset_ms
    }

    /// Keeps only what fits in the window and inserts flex to jump each
    /// overflow to the next period's window start. An invalid window leaves
    /// the entries untouched.
    pub fn apply(&self, entries: &[LineupEntry], now: DateTime<Utc>) -> RestrictedLineup {
        if !self.is_valid() {
            debug!(
                target: "lineup.transforms",
                start_offset_ms = self.start_offset_ms,
                end_offset_ms = self.end_offset_ms,
                "invalid hour window, restriction skipped"
            );
            return RestrictedLineup {
                new_start_time: None,
                new_entries: entries.to_vec(),
            };
        }

        let max_duration = self.window_ms();
        let kept: Vec<&LineupEntry> = entries
            .iter()
            .filter(|entry| !entry.is_flex() && entry.duration_ms() <= max_duration)
            .collect();
        if kept.is_empty() {
            return RestrictedLineup {
                new_start_time: None,
                new_entries: Vec::new(),
            };
        }

        let mut new_entries = Vec::with_capacity(kept.len() * 2);
        let mut offset = 0;
        for entry in kept {
            let duration = entry.duration_ms();
            if offset + duration > max_duration {
                let time_left = max_duration - offset;
                new_entries.push(LineupEntry::flex(
                    time_left + self.period_ms - max_duration,
                ));
                offset = 0;
            }
            new_entries.push(entry.clone());
            offset += duration;
        }

        let new_start_time = timing::period_start(
            now.timestamp_millis(),
            self.period_ms,
            self.time_zone_offset_minutes,
        ) + self.start_offset_ms;
        debug!(
            target: "lineup.transforms",
            entries_in = entries.len(),
            entries_out = new_entries.len(),
            "hours restricted"
        );
        RestrictedLineup {
            new_start_time: Some(new_start_time),
            new_entries,
        }
    }
}

/// Restricts a lineup to a daily UTC window.
pub fn restrict_hours(
    entries: &[LineupEntry],
    start_offset_ms: i64,
    end_offset_ms: i64,
    now: DateTime<Utc>,
) -> RestrictedLineup {
    HourRestriction::new(start_offset_ms, end_offset_ms).apply(entries, now)
}
