use std::collections::HashMap;

use rand::Rng;

use super::models::{Direction, Program, RandomSlotOrder, SlotOrder, SlotSelector};
use super::selection::{GroupedShuffle, ShuffleBag};

/// Subsequence of `pool` satisfying `selector`, in pool order. An empty result
/// means the slot cannot be filled and callers fall back to flex.
pub fn resolve(pool: &[Program], selector: &SlotSelector) -> Vec<Program> {
    if !selector.uses_programs() {
        return Vec::new();
    }
    pool.iter()
        .filter(|program| selector.matches(program))
        .cloned()
        .collect()
}

/// How a slot walks through its candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawOrder {
    Shuffle,
    Ordered,
    OrderedShuffle(Direction),
}

impl From<SlotOrder> for DrawOrder {
    fn from(order: SlotOrder) -> Self {
        match order {
            SlotOrder::Shuffle => DrawOrder::Shuffle,
            SlotOrder::Ordered => DrawOrder::Ordered,
        }
    }
}

impl DrawOrder {
    pub fn for_random_slot(order: RandomSlotOrder, direction: Direction) -> Self {
        match order {
            RandomSlotOrder::Shuffle => DrawOrder::Shuffle,
            RandomSlotOrder::OrderedShuffle => DrawOrder::OrderedShuffle(direction),
        }
    }
}

/// Draw state over one resolved pool.
#[derive(Debug, Clone)]
pub enum ProgramStream {
    Shuffled(ShuffleBag<Program>),
    Ordered { programs: Vec<Program>, cursor: usize },
    Grouped(GroupedShuffle<Program>),
}

impl ProgramStream {
    pub fn new(programs: Vec<Program>, order: DrawOrder) -> Self {
        match order {
            DrawOrder::Shuffle => ProgramStream::Shuffled(ShuffleBag::new(programs)),
            DrawOrder::Ordered => ProgramStream::Ordered {
                programs,
                cursor: 0,
            },
            DrawOrder::OrderedShuffle(direction) => {
                ProgramStream::Grouped(GroupedShuffle::new(group_in_sequence(programs, direction)))
            }
        }
    }

    /// Distinct programs the stream cycles through.
    pub fn len(&self) -> usize {
        match self {
            ProgramStream::Shuffled(bag) => bag.len(),
            ProgramStream::Ordered { programs, .. } => programs.len(),
            ProgramStream::Grouped(grouped) => grouped.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn peek<R>(&mut self, rng: &mut R) -> Option<&Program>
    where
        R: Rng + ?Sized,
    {
        match self {
            ProgramStream::Shuffled(bag) => bag.peek(rng),
            ProgramStream::Ordered { programs, cursor } => programs.get(*cursor),
            ProgramStream::Grouped(grouped) => grouped.peek(rng),
        }
    }

    pub fn advance(&mut self) {
        match self {
            ProgramStream::Shuffled(bag) => bag.advance(),
            ProgramStream::Ordered { programs, cursor } => {
                if !programs.is_empty() {
                    *cursor = (*cursor + 1) % programs.len();
                }
            }
            ProgramStream::Grouped(grouped) => grouped.advance(),
        }
    }

    pub fn next<R>(&mut self, rng: &mut R) -> Option<Program>
    where
        R: Rng + ?Sized,
    {
        let program = self.peek(rng).cloned();
        self.advance();
        program
    }

    /// Looks past the head of a shuffled stream for a program no longer than
    /// `max_ms`. Sequenced streams never skip ahead.
    pub fn take_fitting<R>(&mut self, rng: &mut R, max_ms: i64) -> Option<Program>
    where
        R: Rng + ?Sized,
    {
        match self {
            ProgramStream::Shuffled(bag) => bag
                .take_first(rng, |program| program.duration_ms <= max_ms)
                .cloned(),
            _ => None,
        }
    }
}

/// Groups programs by group key (first-seen order) and sorts each group by
/// season/episode, ascending or descending.
fn group_in_sequence(programs: Vec<Program>, direction: Direction) -> Vec<Vec<Program>> {
    let mut index_by_group: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<Program>> = Vec::new();
    for program in programs {
        let key = program.group().to_string();
        let slot = *index_by_group.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(program);
    }
    for group in groups.iter_mut() {
        // Stable sort keeps pool order for programs without numbering.
        group.sort_by_key(|program| {
            (
                program.season_number.unwrap_or(0),
                program.episode_number.unwrap_or(0),
            )
        });
        if direction == Direction::Desc {
            group.reverse();
        }
    }
    groups
}

/// Resolved pools and their draw state for one scheduling call. Slots sharing
/// a selector and order share a stream, so a show keeps its place across
/// slot occurrences.
#[derive(Debug)]
pub struct ProgramPools<'a> {
    programs: &'a [Program],
    resolved: HashMap<SlotSelector, Vec<Program>>,
    streams: HashMap<(SlotSelector, DrawOrder), ProgramStream>,
}

impl<'a> ProgramPools<'a> {
    pub fn new(programs: &'a [Program]) -> Self {
        Self {
            programs,
            resolved: HashMap::new(),
            streams: HashMap::new(),
        }
    }

    pub fn candidates(&mut self, selector: &SlotSelector) -> &[Program] {
        let programs = self.programs;
        self.resolved
            .entry(selector.clone())
            .or_insert_with(|| resolve(programs, selector))
    }

    /// Stream for the selector, or `None` when nothing matches.
    pub fn stream(
        &mut self,
        selector: &SlotSelector,
        order: DrawOrder,
    ) -> Option<&mut ProgramStream> {
        let key = (selector.clone(), order);
        if !self.streams.contains_key(&key) {
            let candidates = self.candidates(selector).to_vec();
            if candidates.is_empty() {
                return None;
            }
            self.streams
                .insert(key.clone(), ProgramStream::new(candidates, order));
        }
        self.streams.get_mut(&key)
    }

    /// Longest program the selector can produce.
    pub fn longest(&mut self, selector: &SlotSelector) -> Option<i64> {
        self.candidates(selector)
            .iter()
            .map(|program| program.duration_ms)
            .max()
    }
}
