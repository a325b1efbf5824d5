use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, info};

use super::models::{validate_programs, Program, ScheduleResult, SlotSelector, TimeSlot, TimeSlotSchedule};
use super::pool::{DrawOrder, ProgramPools};
use super::scheduler::{IterationBudget, LineupBuilder, PlannedProgram, SchedulerConfig};
use super::timing;
use super::LineupResult;

/// Packs programs into fixed time-of-day slots repeating every period.
#[derive(Debug, Clone, Default)]
pub struct TimeSlotScheduler {
    config: SchedulerConfig,
}

/// Absolute bounds of one slot occurrence.
#[derive(Debug, Clone, Copy)]
struct SlotWindow {
    start: i64,
    end: i64,
}

impl SlotWindow {
    fn length(&self) -> i64 {
        self.end - self.start
    }
}

impl TimeSlotScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn schedule<R>(
        &self,
        programs: &[Program],
        spec: &TimeSlotSchedule,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> LineupResult<ScheduleResult>
    where
        R: Rng + ?Sized,
    {
        validate_programs(programs)?;
        spec.validate()?;

        let now_ms = now.timestamp_millis();
        let slots = spec.sorted_slots();
        let Some(first) = slots.first() else {
            info!(target: "lineup.time_slots", "schedule has no slots, returning empty lineup");
            return Ok(ScheduleResult::empty(now_ms));
        };

        let start_time = timing::next_occurrence(
            now_ms,
            spec.period_ms,
            first.time_of_day_ms,
            spec.time_zone_offset_minutes,
        );
        let base = start_time - first.time_of_day_ms;
        let horizon = spec.max_days.saturating_mul(spec.period_ms);

        let mut pools = ProgramPools::new(programs);
        let mut builder = LineupBuilder::new(start_time);
        let mut budget = IterationBudget::new(self.config.iteration_cap, "time_slots");

        'periods: for day in 0..spec.max_days {
            let period_base = base + day * spec.period_ms;
            for (index, slot) in slots.iter().enumerate() {
                if builder.elapsed() >= horizon || budget.exhausted() {
                    break 'periods;
                }
                let end = match slots.get(index + 1) {
                    Some(next) => period_base + next.time_of_day_ms,
                    None => period_base + spec.period_ms + first.time_of_day_ms,
                };
                let window = SlotWindow {
                    start: period_base + slot.time_of_day_ms,
                    end,
                };
                debug_assert_eq!(builder.cursor(), window.start);
                self.fill_slot(slot, window, spec, &mut pools, &mut builder, &mut budget, rng);
            }
        }

        let result = builder.finish();
        info!(
            target: "lineup.time_slots",
            start_time = result.start_time,
            entries = result.entries.len(),
            total_ms = result.total_duration_ms(),
            slots = slots.len(),
            "time slot lineup generated"
        );
        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    fn fill_slot<R>(
        &self,
        slot: &TimeSlot,
        window: SlotWindow,
        spec: &TimeSlotSchedule,
        pools: &mut ProgramPools<'_>,
        builder: &mut LineupBuilder,
        budget: &mut IterationBudget,
        rng: &mut R,
    ) where
        R: Rng + ?Sized,
    {
        if let SlotSelector::Redirect { channel_id } = &slot.selector {
            builder.push_redirect(channel_id, window.length());
            return;
        }
        let Some(stream) = pools.stream(&slot.selector, DrawOrder::from(slot.order)) else {
            debug!(
                target: "lineup.time_slots",
                selector = %slot.selector,
                window_ms = window.length(),
                "slot has no candidates, filling with flex"
            );
            builder.push_flex(window.length());
            return;
        };

        let pad = spec.pad_ms;
        let capacity = timing::round_down(window.end, pad) - window.start;
        let mut planned = Vec::new();
        let mut used = 0;
        let mut skipped = 0;
        while budget.tick() {
            let cursor = window.start + used;
            let limit = timing::round_down(window.end, pad) - cursor;
            if limit <= 0 {
                break;
            }
            let Some(head) = stream.peek(rng).cloned() else {
                break;
            };
            let program = if head.duration_ms <= limit {
                stream.advance();
                head
            } else if head.duration_ms > capacity {
                // Longer than the whole window: move past it so the slot
                // does not stall on it every occurrence.
                stream.advance();
                skipped += 1;
                if skipped >= stream.len() {
                    break;
                }
                continue;
            } else if window.end - cursor > spec.lateness_ms {
                // Still too much slot left to accept; look for a shorter candidate.
                match stream.take_fitting(rng, limit) {
                    Some(program) => program,
                    None => break,
                }
            } else {
                break;
            };
            let filler_ms = timing::pad_filler(cursor + program.duration_ms, pad);
            used += program.duration_ms + filler_ms;
            planned.push(PlannedProgram { program, filler_ms });
        }

        let gap = window.length() - used;
        builder.emit_block(&planned, gap, spec.flex_preference, pad, i64::MAX);
        debug!(
            target: "lineup.time_slots",
            selector = %slot.selector,
            programs = planned.len(),
            skipped,
            flex_ms = gap,
            "slot filled"
        );
    }
}

/// Schedules with the default iteration cap.
pub fn schedule_time_slots<R>(
    programs: &[Program],
    spec: &TimeSlotSchedule,
    now: DateTime<Utc>,
    rng: &mut R,
) -> LineupResult<ScheduleResult>
where
    R: Rng + ?Sized,
{
    TimeSlotScheduler::default().schedule(programs, spec, now, rng)
}
