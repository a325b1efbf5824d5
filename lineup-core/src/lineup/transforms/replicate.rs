use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::lineup::models::LineupEntry;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReplicateMode {
    #[default]
    Fixed,
    Random,
}

/// Concatenates `count` copies of `entries`. `Random` shuffles the whole
/// concatenation as one sequence rather than each copy on its own.
pub fn replicate<R>(
    entries: &[LineupEntry],
    count: usize,
    mode: ReplicateMode,
    rng: &mut R,
) -> Vec<LineupEntry>
where
    R: Rng + ?Sized,
{
    let mut replicated = Vec::with_capacity(entries.len() * count);
    for _ in 0..count {
        replicated.extend_from_slice(entries);
    }
    if mode == ReplicateMode::Random {
        replicated.shuffle(rng);
    }
    replicated
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn entries() -> Vec<LineupEntry> {
        vec![
            LineupEntry::Program {
                program_id: "a".into(),
                duration_ms: 10,
                group_key: None,
            },
            LineupEntry::flex(5),
            LineupEntry::redirect("ch", 7),
        ]
    }

    #[test]
    fn fixed_mode_repeats_sequence() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let source = entries();
        let replicated = replicate(&source, 3, ReplicateMode::Fixed, &mut rng);
        assert_eq!(replicated.len(), 9);
        for chunk in replicated.chunks(source.len()) {
            assert_eq!(chunk, source.as_slice());
        }
        assert!(replicate(&source, 0, ReplicateMode::Fixed, &mut rng).is_empty());
    }

    #[test]
    fn random_mode_keeps_multiset() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let source = entries();
        let mut replicated = replicate(&source, 4, ReplicateMode::Random, &mut rng);
        let mut expected = replicate(&source, 4, ReplicateMode::Fixed, &mut rng);
        let key = |entry: &LineupEntry| format!("{}:{}", entry.label(), entry.duration_ms());
        replicated.sort_by_key(key);
        expected.sort_by_key(key);
        assert_eq!(replicated, expected);
    }
}
