use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::warn;

use super::models::{FlexPreference, LineupEntry, Program, ScheduleResult, ScheduleSpec};
use super::random_slots::RandomSlotScheduler;
use super::time_slots::TimeSlotScheduler;
use super::timing;
use super::LineupResult;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Upper bound on loop iterations per call, independent of `max_days`.
    pub iteration_cap: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            iteration_cap: 100_000,
        }
    }
}

/// Runs whichever scheduler matches the schedule type.
pub fn schedule<R>(
    programs: &[Program],
    spec: &ScheduleSpec,
    now: DateTime<Utc>,
    config: &SchedulerConfig,
    rng: &mut R,
) -> LineupResult<ScheduleResult>
where
    R: Rng + ?Sized,
{
    match spec {
        ScheduleSpec::TimeSlots(spec) => {
            TimeSlotScheduler::new(config.clone()).schedule(programs, spec, now, rng)
        }
        ScheduleSpec::RandomSlots(spec) => {
            RandomSlotScheduler::new(config.clone()).schedule(programs, spec, now, rng)
        }
    }
}

#[derive(Debug)]
pub(crate) struct IterationBudget {
    remaining: usize,
    target: &'static str,
    reported: bool,
}

impl IterationBudget {
    pub(crate) fn new(cap: usize, target: &'static str) -> Self {
        Self {
            remaining: cap,
            target,
            reported: false,
        }
    }

    /// Consumes one iteration; false once the cap is reached.
    pub(crate) fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            if !self.reported {
                warn!(target: "lineup.scheduler", component = self.target, "iteration cap reached, returning partial lineup");
                self.reported = true;
            }
            return false;
        }
        self.remaining -= 1;
        true
    }

    pub(crate) fn exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// A program chosen for a block together with the flex that pads its end.
#[derive(Debug, Clone)]
pub(crate) struct PlannedProgram {
    pub program: Program,
    pub filler_ms: i64,
}

/// Accumulates entries while tracking elapsed time from `start_time`.
#[derive(Debug)]
pub(crate) struct LineupBuilder {
    start_time: i64,
    elapsed: i64,
    entries: Vec<LineupEntry>,
}

impl LineupBuilder {
    pub(crate) fn new(start_time: i64) -> Self {
        Self {
            start_time,
            elapsed: 0,
            entries: Vec::new(),
        }
    }

    pub(crate) fn elapsed(&self) -> i64 {
        self.elapsed
    }

    /// Absolute instant where the next entry starts.
    pub(crate) fn cursor(&self) -> i64 {
        self.start_time + self.elapsed
    }

    pub(crate) fn push_program(&mut self, program: &Program) {
        self.elapsed += program.duration_ms;
        self.entries.push(LineupEntry::program(program));
    }

    /// Appends filler, extending a trailing flex entry instead of starting a new one.
    pub(crate) fn push_flex(&mut self, duration_ms: i64) {
        if duration_ms <= 0 {
            return;
        }
        self.elapsed += duration_ms;
        if let Some(LineupEntry::Flex { duration_ms: last }) = self.entries.last_mut() {
            *last += duration_ms;
        } else {
            self.entries.push(LineupEntry::flex(duration_ms));
        }
    }

    pub(crate) fn push_redirect(&mut self, channel_id: &str, duration_ms: i64) {
        if duration_ms <= 0 {
            return;
        }
        self.elapsed += duration_ms;
        self.entries
            .push(LineupEntry::redirect(channel_id, duration_ms));
    }

    /// Flex up to the next multiple of `pad_ms` on the absolute clock.
    pub(crate) fn pad(&mut self, pad_ms: i64) {
        let filler = timing::pad_filler(self.cursor(), pad_ms);
        self.push_flex(filler);
    }

    /// Emits planned programs and spreads `gap_ms` of flex according to the
    /// preference. Programs that would start at or after `stop_at` elapsed
    /// are dropped together with the flex that follows them.
    pub(crate) fn emit_block(
        &mut self,
        planned: &[PlannedProgram],
        gap_ms: i64,
        preference: FlexPreference,
        pad_ms: i64,
        stop_at: i64,
    ) {
        let shares = flex_shares(gap_ms, planned.len(), preference, pad_ms);
        for (item, share) in planned.iter().zip(shares.iter()) {
            if self.elapsed >= stop_at {
                return;
            }
            self.push_program(&item.program);
            self.push_flex(item.filler_ms);
            self.push_flex(*share);
        }
        if planned.is_empty() && self.elapsed < stop_at {
            self.push_flex(gap_ms);
        }
    }

    /// Shortens trailing flex that runs past `horizon_ms` elapsed.
    pub(crate) fn trim_trailing_flex(&mut self, horizon_ms: i64) {
        let excess = self.elapsed - horizon_ms;
        if excess <= 0 {
            return;
        }
        if let Some(LineupEntry::Flex { duration_ms }) = self.entries.last_mut() {
            let cut = excess.min(*duration_ms);
            *duration_ms -= cut;
            self.elapsed -= cut;
            if *duration_ms == 0 {
                self.entries.pop();
            }
        }
    }

    pub(crate) fn finish(self) -> ScheduleResult {
        ScheduleResult {
            start_time: self.start_time,
            entries: self.entries,
        }
    }
}

/// Splits a gap into one flex share per planned program. `End` puts the whole
/// gap after the last program; `Distribute` gives equal pad-aligned shares
/// with the remainder on the last.
pub(crate) fn flex_shares(
    gap_ms: i64,
    count: usize,
    preference: FlexPreference,
    pad_ms: i64,
) -> Vec<i64> {
    if count == 0 {
        return Vec::new();
    }
    let mut shares = vec![0; count];
    let gap_ms = gap_ms.max(0);
    match preference {
        FlexPreference::End => shares[count - 1] = gap_ms,
        FlexPreference::Distribute => {
            let base = timing::round_down(gap_ms / count as i64, pad_ms);
            for share in shares.iter_mut() {
                *share = base;
            }
            shares[count - 1] = gap_ms - base * (count as i64 - 1);
        }
    }
    shares
}
