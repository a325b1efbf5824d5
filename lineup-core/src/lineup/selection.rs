use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Generates a reproducible seed from the channel, the current seed window and
/// a global seed, so a preview and a later commit inside the same window draw
/// identical lineups.
pub fn derive_seed(
    channel_id: &str,
    now: DateTime<Utc>,
    window: Duration,
    global_seed: u64,
) -> u64 {
    let window_seconds = window.num_seconds().max(60);
    let epoch_index = now.timestamp().div_euclid(window_seconds);

    let mut hasher = Sha256::new();
    hasher.update(channel_id.as_bytes());
    hasher.update(epoch_index.to_be_bytes());
    hasher.update(global_seed.to_be_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// Draws an index with probability proportional to its weight using a binary
/// search over cumulative weights. Returns `None` when no weight is positive.
pub fn weighted_index<R>(weights: &[f64], rng: &mut R) -> Option<usize>
where
    R: Rng + ?Sized,
{
    let mut total = 0.0;
    let cumulative: Vec<f64> = weights
        .iter()
        .map(|weight| {
            if weight.is_finite() && *weight > 0.0 {
                total += weight;
            }
            total
        })
        .collect();
    if total <= 0.0 {
        return None;
    }
    let target = rng.gen::<f64>() * total;
    let index = cumulative.partition_point(|value| *value <= target);
    if index < weights.len() {
        Some(index)
    } else {
        // Rounding landed on the total; take the last positive weight.
        weights.iter().rposition(|weight| *weight > 0.0)
    }
}

/// Returns the weights scaled to probabilities, useful for logging.
pub fn normalize_weights(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().filter(|weight| **weight > 0.0).sum();
    if total <= 0.0 {
        return vec![0.0; weights.len()];
    }
    weights
        .iter()
        .map(|weight| weight.max(0.0) / total)
        .collect()
}

/// A held permutation consumed index by index and reshuffled only once empty.
///
/// A fresh permutation never starts with the item drawn last, so a bag of two
/// or more items cannot repeat back-to-back across a reshuffle.
#[derive(Debug, Clone)]
pub struct ShuffleBag<T> {
    items: Vec<T>,
    order: Vec<usize>,
    cursor: usize,
    last: Option<usize>,
}

impl<T> ShuffleBag<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            order: Vec::new(),
            cursor: 0,
            last: None,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items left in the current permutation.
    pub fn remaining(&self) -> usize {
        self.order.len().saturating_sub(self.cursor)
    }

    fn refill<R>(&mut self, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        if self.remaining() > 0 || self.items.is_empty() {
            return;
        }
        self.order = (0..self.items.len()).collect();
        self.order.shuffle(rng);
        if self.order.len() > 1 && self.last == Some(self.order[0]) {
            let swap_with = rng.gen_range(1..self.order.len());
            self.order.swap(0, swap_with);
        }
        self.cursor = 0;
    }

    pub fn peek<R>(&mut self, rng: &mut R) -> Option<&T>
    where
        R: Rng + ?Sized,
    {
        self.refill(rng);
        self.current()
    }

    /// The item `peek` would return, without reshuffling.
    pub fn current(&self) -> Option<&T> {
        self.order
            .get(self.cursor)
            .and_then(|index| self.items.get(*index))
    }

    pub fn advance(&mut self) {
        if let Some(index) = self.order.get(self.cursor) {
            self.last = Some(*index);
            self.cursor += 1;
        }
    }

    /// Moves the first not-yet-drawn item satisfying `accept` to the front of
    /// the permutation and draws it. Items skipped over stay in the bag.
    pub fn take_first<R, F>(&mut self, rng: &mut R, mut accept: F) -> Option<&T>
    where
        R: Rng + ?Sized,
        F: FnMut(&T) -> bool,
    {
        self.refill(rng);
        let offset = self.order[self.cursor..]
            .iter()
            .position(|index| accept(&self.items[*index]))?;
        self.order.swap(self.cursor, self.cursor + offset);
        let index = self.order[self.cursor];
        self.advance();
        self.items.get(index)
    }
}

impl<T: Clone> ShuffleBag<T> {
    pub fn draw<R>(&mut self, rng: &mut R) -> Option<T>
    where
        R: Rng + ?Sized,
    {
        let item = self.peek(rng).cloned();
        self.advance();
        item
    }
}

/// Shuffles at the group level while keeping each group's own sequence.
#[derive(Debug, Clone)]
pub struct GroupedShuffle<T> {
    groups: Vec<Vec<T>>,
    cursors: Vec<usize>,
    bag: ShuffleBag<usize>,
}

impl<T> GroupedShuffle<T> {
    /// Empty groups are dropped.
    pub fn new(groups: Vec<Vec<T>>) -> Self {
        let groups: Vec<Vec<T>> = groups.into_iter().filter(|group| !group.is_empty()).collect();
        let cursors = vec![0; groups.len()];
        let bag = ShuffleBag::new((0..groups.len()).collect());
        Self {
            groups,
            cursors,
            bag,
        }
    }

    /// Items across all groups.
    pub fn len(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn peek<R>(&mut self, rng: &mut R) -> Option<&T>
    where
        R: Rng + ?Sized,
    {
        let group = *self.bag.peek(rng)?;
        self.groups[group].get(self.cursors[group])
    }

    pub fn advance(&mut self) {
        if let Some(&group) = self.bag.current() {
            self.cursors[group] = (self.cursors[group] + 1) % self.groups[group].len();
            self.bag.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use std::collections::HashSet;

    #[test]
    fn seed_changes_with_window_and_channel() {
        let now = Utc::now();
        let window = Duration::minutes(15);
        let seed_a = derive_seed("ch-1", now, window, 99);
        assert_eq!(seed_a, derive_seed("ch-1", now, window, 99));
        assert_ne!(seed_a, derive_seed("ch-1", now + window, window, 99));
        assert_ne!(seed_a, derive_seed("ch-2", now, window, 99));
    }

    #[test]
    fn shuffle_bag_exhausts_before_repeating() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let mut bag = ShuffleBag::new(vec![1, 2, 3, 4, 5]);
        let mut previous = None;
        for _round in 0..4 {
            let mut seen = HashSet::new();
            for _ in 0..5 {
                let item = bag.draw(&mut rng).unwrap();
                assert_ne!(Some(item), previous);
                previous = Some(item);
                seen.insert(item);
            }
            assert_eq!(seen.len(), 5);
        }
    }

    #[test]
    fn take_first_keeps_skipped_items() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let mut bag = ShuffleBag::new(vec![10, 20, 30]);
        let taken = *bag.take_first(&mut rng, |value| *value == 20).unwrap();
        assert_eq!(taken, 20);
        assert_eq!(bag.remaining(), 2);
        let mut rest = vec![bag.draw(&mut rng).unwrap(), bag.draw(&mut rng).unwrap()];
        rest.sort();
        assert_eq!(rest, vec![10, 30]);
        assert!(bag.take_first(&mut rng, |value| *value > 100).is_none());
    }

    #[test]
    fn weighted_index_skips_zero_weights() {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let weights = [0.0, 3.0, 0.0, 1.0];
        let mut counts = [0usize; 4];
        for _ in 0..2_000 {
            counts[weighted_index(&weights, &mut rng).unwrap()] += 1;
        }
        assert_eq!(counts[0], 0);
        assert_eq!(counts[2], 0);
        assert!(counts[1] > counts[3] * 2);
        assert!(weighted_index(&[0.0, 0.0], &mut rng).is_none());
    }

    #[test]
    fn normalize_weights_behaviour() {
        assert_eq!(normalize_weights(&[1.0, 3.0]), vec![0.25, 0.75]);
        assert_eq!(normalize_weights(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn grouped_shuffle_preserves_group_sequence() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let mut grouped = GroupedShuffle::new(vec![vec!["a1", "a2", "a3"], vec!["b1", "b2"], vec![]]);
        let mut drawn_a = Vec::new();
        let mut drawn_b = Vec::new();
        for _ in 0..10 {
            let item = *grouped.peek(&mut rng).unwrap();
            grouped.advance();
            if item.starts_with('a') {
                drawn_a.push(item);
            } else {
                drawn_b.push(item);
            }
        }
        let expected_a = ["a1", "a2", "a3", "a1", "a2", "a3"];
        assert_eq!(drawn_a, expected_a[..drawn_a.len()].to_vec());
        let expected_b = ["b1", "b2", "b1", "b2", "b1", "b2"];
        assert_eq!(drawn_b, expected_b[..drawn_b.len()].to_vec());
        assert_eq!(drawn_a.len(), 5);
        assert_eq!(drawn_b.len(), 5);
    }
}
