use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::lineup::models::LineupEntry;

/// What balance measures per group.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BalanceBy {
    #[default]
    Duration,
    ProgramCount,
}

impl BalanceBy {
    fn measure(self, entry: &LineupEntry) -> i64 {
        match self {
            BalanceBy::Duration => entry.duration_ms(),
            BalanceBy::ProgramCount => 1,
        }
    }
}

#[derive(Debug)]
struct GroupTally {
    distinct: Vec<LineupEntry>,
    occurrences: usize,
    total: i64,
}

/// Inserts copies of under-represented groups until each group is within
/// `tolerance` of the largest. Tolerance is in the unit being measured:
/// milliseconds for `Duration`, programs for `ProgramCount`.
pub fn balance(entries: &[LineupEntry], by: BalanceBy, tolerance: i64) -> Vec<LineupEntry> {
    let tolerance = tolerance.max(0);
    let mut order: Vec<String> = Vec::new();
    let mut tallies: HashMap<String, GroupTally> = HashMap::new();
    for entry in entries {
        let Some(group) = entry.group() else {
            continue;
        };
        let tally = tallies.entry(group.to_string()).or_insert_with(|| {
            order.push(group.to_string());
            GroupTally {
                distinct: Vec::new(),
                occurrences: 0,
                total: 0,
            }
        });
        if !tally.distinct.contains(entry) {
            tally.distinct.push(entry.clone());
        }
        tally.occurrences += 1;
        tally.total += by.measure(entry);
    }
    if tallies.len() < 2 {
        return entries.to_vec();
    }

    let target = tallies.values().map(|tally| tally.total).max().unwrap_or(0) - tolerance;
    let mut extras: HashMap<&str, Vec<LineupEntry>> = HashMap::new();
    for key in &order {
        let Some(tally) = tallies.get(key) else {
            continue;
        };
        let mut total = tally.total;
        let mut copies = Vec::new();
        for entry in tally.distinct.iter().cycle() {
            if total >= target {
                break;
            }
            total += by.measure(entry);
            copies.push(entry.clone());
        }
        if !copies.is_empty() {
            extras.insert(key.as_str(), copies);
        }
    }
    if extras.is_empty() {
        return entries.to_vec();
    }

    let added: usize = extras.values().map(Vec::len).sum();
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut balanced = Vec::with_capacity(entries.len() + added);
    for entry in entries {
        balanced.push(entry.clone());
        let Some(group) = entry.group() else {
            continue;
        };
        let (Some(copies), Some(tally)) = (extras.get(group), tallies.get(group)) else {
            continue;
        };
        let index = seen.entry(group).or_insert(0);
        // Spread copies evenly over the group's existing occurrences.
        let from = *index * copies.len() / tally.occurrences;
        let to = (*index + 1) * copies.len() / tally.occurrences;
        balanced.extend_from_slice(&copies[from..to]);
        *index += 1;
    }
    debug!(
        target: "lineup.transforms",
        by = ?by,
        tolerance,
        added,
        "lineup balanced"
    );
    balanced
}
