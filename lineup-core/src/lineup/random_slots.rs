use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

use super::models::{
    validate_programs, DurationSpec, PadStyle, Program, RandomDistribution, RandomSlot,
    RandomSlotSchedule, ScheduleResult, SlotSelector,
};
use super::pool::{DrawOrder, ProgramPools, ProgramStream};
use super::scheduler::{IterationBudget, LineupBuilder, PlannedProgram, SchedulerConfig};
use super::selection::{normalize_weights, weighted_index};
use super::timing;
use super::LineupResult;

/// Fills the horizon by repeatedly drawing a slot among those out of cooldown.
#[derive(Debug, Clone, Default)]
pub struct RandomSlotScheduler {
    config: SchedulerConfig,
}

/// Per-call state shared by the slot fillers.
struct RandomRun<'a, 'p> {
    spec: &'a RandomSlotSchedule,
    pools: ProgramPools<'p>,
    builder: LineupBuilder,
    budget: IterationBudget,
    horizon: i64,
}

impl RandomSlotScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn schedule<R>(
        &self,
        programs: &[Program],
        spec: &RandomSlotSchedule,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> LineupResult<ScheduleResult>
    where
        R: Rng + ?Sized,
    {
        validate_programs(programs)?;
        spec.validate()?;

        let start_time = timing::round_up(now.timestamp_millis(), spec.pad_ms);
        if spec.slots.is_empty() {
            info!(target: "lineup.random_slots", "schedule has no slots, returning empty lineup");
            return Ok(ScheduleResult::empty(start_time));
        }

        let mut run = RandomRun {
            spec,
            pools: ProgramPools::new(programs),
            builder: LineupBuilder::new(start_time),
            budget: IterationBudget::new(self.config.iteration_cap, "random_slots"),
            horizon: spec.horizon_ms(),
        };

        let selectable: Vec<bool> = spec
            .slots
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                let usable = run.is_selectable(slot);
                if !usable {
                    warn!(
                        target: "lineup.random_slots",
                        slot = index,
                        selector = %slot.selector,
                        "slot can never produce content and is skipped"
                    );
                }
                usable
            })
            .collect();
        let base_weights: Vec<f64> = spec
            .slots
            .iter()
            .zip(&selectable)
            .map(|(slot, usable)| match (usable, spec.random_distribution) {
                (false, _) => 0.0,
                (true, RandomDistribution::Uniform) => 1.0,
                (true, RandomDistribution::Weighted) => slot.weight,
            })
            .collect();
        debug!(
            target: "lineup.random_slots",
            distribution = ?spec.random_distribution,
            probabilities = ?normalize_weights(&base_weights),
            "slot weights resolved"
        );

        let mut last_selected_at: HashMap<usize, i64> = HashMap::new();
        while run.builder.elapsed() < run.horizon {
            if !run.budget.tick() {
                break;
            }
            let elapsed = run.builder.elapsed();
            let weights: Vec<f64> = spec
                .slots
                .iter()
                .enumerate()
                .map(|(index, slot)| {
                    let cooled = last_selected_at
                        .get(&index)
                        .map_or(true, |last| elapsed - last >= slot.cooldown_ms);
                    if cooled {
                        base_weights[index]
                    } else {
                        0.0
                    }
                })
                .collect();

            match weighted_index(&weights, rng) {
                Some(index) => {
                    run.fill_slot(index, &spec.slots[index], rng);
                    last_selected_at.insert(index, run.builder.elapsed());
                }
                None => {
                    // Everything selectable is cooling down: wait with flex.
                    let wake_at = spec
                        .slots
                        .iter()
                        .enumerate()
                        .filter(|(index, _)| base_weights[*index] > 0.0)
                        .filter_map(|(index, slot)| {
                            last_selected_at.get(&index).map(|last| last + slot.cooldown_ms)
                        })
                        .min();
                    match wake_at {
                        Some(wake_at) if wake_at > elapsed => {
                            run.builder
                                .push_flex((wake_at - elapsed).min(run.horizon - elapsed));
                        }
                        _ => {
                            warn!(
                                target: "lineup.random_slots",
                                elapsed_ms = elapsed,
                                "no selectable slot left, ending lineup early"
                            );
                            break;
                        }
                    }
                }
            }
        }

        run.builder.trim_trailing_flex(run.horizon);
        let result = run.builder.finish();
        info!(
            target: "lineup.random_slots",
            start_time = result.start_time,
            entries = result.entries.len(),
            total_ms = result.total_duration_ms(),
            "random slot lineup generated"
        );
        Ok(result)
    }
}

impl RandomRun<'_, '_> {
    fn is_selectable(&mut self, slot: &RandomSlot) -> bool {
        if slot.selector.uses_programs() {
            !self.pools.candidates(&slot.selector).is_empty()
        } else {
            !matches!(slot.duration_spec, DurationSpec::FixedCount { .. })
        }
    }

    fn remaining(&self) -> i64 {
        self.horizon - self.builder.elapsed()
    }

    fn episode_pad(&self) -> i64 {
        match self.spec.pad_style {
            PadStyle::Episode => self.spec.pad_ms,
            PadStyle::Slot => 0,
        }
    }

    fn fill_slot<R>(&mut self, index: usize, slot: &RandomSlot, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        let before = self.builder.elapsed();
        match &slot.selector {
            SlotSelector::Flex => {
                let length = self.block_length(&slot.duration_spec);
                self.builder.push_flex(length.min(self.remaining()));
            }
            SlotSelector::Redirect { channel_id } => {
                let length = self.block_length(&slot.duration_spec);
                self.builder
                    .push_redirect(channel_id, length.min(self.remaining()));
            }
            selector => {
                let order = DrawOrder::for_random_slot(slot.order, slot.direction);
                let episode_pad = self.episode_pad();
                let Some(stream) = self.pools.stream(selector, order) else {
                    return;
                };
                match slot.duration_spec {
                    DurationSpec::FixedCount { count } => {
                        for _ in 0..count {
                            if self.builder.elapsed() >= self.horizon || !self.budget.tick() {
                                break;
                            }
                            let Some(program) = stream.next(rng) else {
                                break;
                            };
                            self.builder.push_program(&program);
                            if self.builder.elapsed() < self.horizon {
                                self.builder.pad(episode_pad);
                            }
                        }
                    }
                    DurationSpec::Dynamic { target_ms } => {
                        let target = target_ms.unwrap_or(self.horizon - before);
                        while self.builder.elapsed() - before < target
                            && self.builder.elapsed() < self.horizon
                            && self.budget.tick()
                        {
                            let Some(program) = stream.next(rng) else {
                                break;
                            };
                            self.builder.push_program(&program);
                            if self.builder.elapsed() < self.horizon {
                                self.builder.pad(episode_pad);
                            }
                        }
                    }
                    DurationSpec::FixedDuration { duration_ms } => {
                        let block_end = self.builder.cursor() + duration_ms;
                        let planned = plan_block(
                            stream,
                            self.builder.cursor(),
                            block_end,
                            episode_pad,
                            &mut self.budget,
                            rng,
                        );
                        let used: i64 = planned
                            .iter()
                            .map(|item| item.program.duration_ms + item.filler_ms)
                            .sum();
                        self.builder.emit_block(
                            &planned,
                            duration_ms - used,
                            self.spec.flex_preference,
                            episode_pad,
                            self.horizon,
                        );
                    }
                }
            }
        }
        if self.spec.pad_style == PadStyle::Slot && self.builder.elapsed() < self.horizon {
            self.builder.pad(self.spec.pad_ms);
        }
        debug!(
            target: "lineup.random_slots",
            slot = index,
            selector = %slot.selector,
            added_ms = self.builder.elapsed() - before,
            "slot selected"
        );
    }

    /// Length given to flex and redirect slots.
    fn block_length(&self, duration_spec: &DurationSpec) -> i64 {
        match duration_spec {
            DurationSpec::FixedDuration { duration_ms } => *duration_ms,
            DurationSpec::Dynamic {
                target_ms: Some(target_ms),
            } => *target_ms,
            _ => self.remaining(),
        }
    }
}

/// Picks programs fitting in `[start, end)`, searching past an overflowing
/// head of a shuffled stream before giving up. Heads longer than the whole
/// block are skipped, at most once per program in the stream.
fn plan_block<R>(
    stream: &mut ProgramStream,
    start: i64,
    end: i64,
    pad_ms: i64,
    budget: &mut IterationBudget,
    rng: &mut R,
) -> Vec<PlannedProgram>
where
    R: Rng + ?Sized,
{
    let capacity = timing::round_down(end, pad_ms) - start;
    let mut planned = Vec::new();
    let mut cursor = start;
    let mut skipped = 0;
    while budget.tick() {
        let limit = timing::round_down(end, pad_ms) - cursor;
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
            // Can never fit a block of this length; step past it.
            stream.advance();
            skipped += 1;
            if skipped >= stream.len() {
                break;
            }
            continue;
        } else {
            match stream.take_fitting(rng, limit) {
                Some(program) => program,
                None => break,
            }
        };
        let filler_ms = timing::pad_filler(cursor + program.duration_ms, pad_ms);
        cursor += program.duration_ms + filler_ms;
        planned.push(PlannedProgram { program, filler_ms });
    }
    planned
}

/// Schedules with the default iteration cap.
pub fn schedule_random_slots<R>(
    programs: &[Program],
    spec: &RandomSlotSchedule,
    now: DateTime<Utc>,
    rng: &mut R,
) -> LineupResult<ScheduleResult>
where
    R: Rng + ?Sized,
{
    RandomSlotScheduler::default().schedule(programs, spec, now, rng)
}
