use chrono::{DateTime, TimeZone, Utc};
use lineup_core::lineup::timing::{DAY_MS, HOUR_MS, MINUTE_MS};
use lineup_core::lineup::{
    DurationSpec, FlexPreference, RandomDistribution, RandomSlot, RandomSlotOrder, SlotOrder,
    SlotSelector, TimeSlot,
};
use lineup_core::{
    schedule, schedule_random_slots, schedule_time_slots, LineupEntry, Program, ProgramKind,
    RandomSlotSchedule, ScheduleResult, ScheduleSpec, SchedulerConfig, TimeSlotSchedule,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

const MOVIE_DURATIONS: [i64; 5] = [5_776_799, 5_526_279, 6_308_448, 7_436_480, 5_053_010];

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 14, 7, 31).unwrap()
}

fn movies() -> Vec<Program> {
    MOVIE_DURATIONS
        .iter()
        .enumerate()
        .map(|(index, duration)| Program::new(format!("movie-{index}"), ProgramKind::Movie, *duration))
        .collect()
}

fn mixed_pool() -> Vec<Program> {
    let mut pool = movies();
    for episode in 1..=6 {
        pool.push(
            Program::new(format!("hn-{episode}"), ProgramKind::Episode, 22 * MINUTE_MS)
                .with_group("harbor-nights")
                .with_episode(1, episode),
        );
    }
    pool
}

fn movie_selector() -> SlotSelector {
    SlotSelector::Kind {
        prefix: "movie.".into(),
    }
}

fn show_selector() -> SlotSelector {
    SlotSelector::Show {
        show_id: "harbor-nights".into(),
    }
}

fn assert_prefix_sums(result: &ScheduleResult) {
    let starts = result.entry_start_times();
    let mut elapsed = 0;
    for (start, entry) in starts.iter().zip(&result.entries) {
        assert_eq!(*start, result.start_time + elapsed);
        assert!(entry.duration_ms() > 0, "zero-length entry {entry:?}");
        elapsed += entry.duration_ms();
    }
    assert_eq!(result.end_time(), result.start_time + elapsed);
}

#[test]
fn five_movie_lineup_covers_two_days() {
    let spec = TimeSlotSchedule {
        period_ms: DAY_MS,
        lateness_ms: 0,
        max_days: 2,
        flex_preference: FlexPreference::Distribute,
        pad_ms: 1,
        time_zone_offset_minutes: 0,
        slots: vec![
            TimeSlot {
                time_of_day_ms: 3_600_000,
                selector: movie_selector(),
                order: SlotOrder::Shuffle,
            },
            TimeSlot {
                time_of_day_ms: 7_200_000,
                selector: movie_selector(),
                order: SlotOrder::Shuffle,
            },
        ],
    };
    let pool = movies();
    for seed in 0..5 {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let result = schedule_time_slots(&pool, &spec, now(), &mut rng).unwrap();
        assert_prefix_sums(&result);
        assert!(result.total_duration_ms() >= 2 * DAY_MS);
        assert_eq!(result.start_time % DAY_MS, 3_600_000);
        for entry in &result.entries {
            match entry {
                LineupEntry::Program {
                    program_id,
                    duration_ms,
                    ..
                } => {
                    assert!(pool.iter().any(|program| &program.id == program_id));
                    // The one-hour slot fits no movie, so everything airs in the 23h slot.
                    assert!(*duration_ms <= 23 * HOUR_MS);
                }
                LineupEntry::Flex { .. } => {}
                other => panic!("unexpected entry {other:?}"),
            }
        }
        // The first slot occurrence is all flex.
        assert_eq!(result.entries[0], LineupEntry::flex(HOUR_MS));
    }
}

#[test]
fn time_slot_programs_match_their_slot() {
    let spec = TimeSlotSchedule {
        period_ms: DAY_MS,
        lateness_ms: 10 * MINUTE_MS,
        max_days: 3,
        flex_preference: FlexPreference::End,
        pad_ms: 5 * MINUTE_MS,
        time_zone_offset_minutes: -300,
        slots: vec![
            TimeSlot {
                time_of_day_ms: 18 * HOUR_MS,
                selector: show_selector(),
                order: SlotOrder::Ordered,
            },
            TimeSlot {
                time_of_day_ms: 20 * HOUR_MS,
                selector: movie_selector(),
                order: SlotOrder::Shuffle,
            },
        ],
    };
    let pool = mixed_pool();
    let mut rng = ChaCha20Rng::seed_from_u64(11);
    let result = schedule_time_slots(&pool, &spec, now(), &mut rng).unwrap();
    assert_prefix_sums(&result);
    assert_eq!(result.total_duration_ms(), 3 * DAY_MS);

    // Local offsets from the first slot: show window [0, 2h), movie window [2h, 24h).
    for (start, entry) in result.entry_start_times().iter().zip(&result.entries) {
        let Some(program_id) = entry.program_id() else {
            continue;
        };
        let offset = (start - result.start_time).rem_euclid(DAY_MS);
        let program = pool.iter().find(|p| p.id == program_id).unwrap();
        if offset < 2 * HOUR_MS {
            assert!(show_selector().matches(program), "{program_id} at {offset}");
        } else {
            assert!(movie_selector().matches(program), "{program_id} at {offset}");
        }
    }
}

#[test]
fn random_slots_stay_within_horizon_bound() {
    let pool = mixed_pool();
    let longest = pool.iter().map(|p| p.duration_ms).max().unwrap();
    let mut episodes = RandomSlot::new(show_selector());
    episodes.order = RandomSlotOrder::OrderedShuffle;
    episodes.duration_spec = DurationSpec::Dynamic {
        target_ms: Some(HOUR_MS),
    };
    let mut movies = RandomSlot::new(movie_selector());
    movies.weight = 3.0;
    movies.cooldown_ms = 4 * HOUR_MS;
    let mut filler = RandomSlot::new(SlotSelector::Flex);
    filler.duration_spec = DurationSpec::FixedDuration {
        duration_ms: 15 * MINUTE_MS,
    };
    let spec = RandomSlotSchedule {
        max_days: 2,
        pad_ms: 5 * MINUTE_MS,
        pad_style: Default::default(),
        flex_preference: FlexPreference::Distribute,
        random_distribution: RandomDistribution::Weighted,
        slots: vec![episodes, movies, filler],
    };
    for seed in 0..6 {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let result = schedule_random_slots(&pool, &spec, now(), &mut rng).unwrap();
        assert_prefix_sums(&result);
        let total = result.total_duration_ms();
        assert!(total >= 2 * DAY_MS, "seed {seed}: {total}");
        assert!(total < 2 * DAY_MS + longest, "seed {seed}: {total}");
        assert_eq!(result.start_time % (5 * MINUTE_MS), 0);
    }
}

#[test]
fn dispatcher_is_deterministic_per_seed() {
    let spec = ScheduleSpec::RandomSlots(RandomSlotSchedule {
        max_days: 1,
        pad_ms: 0,
        pad_style: Default::default(),
        flex_preference: FlexPreference::End,
        random_distribution: RandomDistribution::Uniform,
        slots: vec![RandomSlot::new(movie_selector())],
    });
    let pool = movies();
    let config = SchedulerConfig::default();
    let first = schedule(&pool, &spec, now(), &config, &mut ChaCha20Rng::seed_from_u64(3)).unwrap();
    let second =
        schedule(&pool, &spec, now(), &config, &mut ChaCha20Rng::seed_from_u64(3)).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(first.start_time, now().timestamp_millis());
}

#[test]
fn iteration_cap_returns_partial_lineup() {
    let spec = ScheduleSpec::RandomSlots(RandomSlotSchedule {
        max_days: 30,
        pad_ms: 0,
        pad_style: Default::default(),
        flex_preference: FlexPreference::End,
        random_distribution: RandomDistribution::Uniform,
        slots: vec![RandomSlot::new(movie_selector())],
    });
    let config = SchedulerConfig { iteration_cap: 10 };
    let mut rng = ChaCha20Rng::seed_from_u64(5);
    let result = schedule(&movies(), &spec, now(), &config, &mut rng).unwrap();
    assert!(!result.entries.is_empty());
    assert!(result.total_duration_ms() < 30 * DAY_MS);
    assert_prefix_sums(&result);
}
