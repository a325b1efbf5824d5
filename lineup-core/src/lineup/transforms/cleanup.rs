use std::collections::HashSet;

use crate::lineup::models::LineupEntry;
use crate::lineup::timing;

/// Drops existing flex and re-inserts just enough so every entry starts on a
/// multiple of `pad_ms`, measured on the absolute clock from `start_time`.
pub fn pad_start_times(entries: &[LineupEntry], start_time: i64, pad_ms: i64) -> Vec<LineupEntry> {
    let mut padded = Vec::with_capacity(entries.len() * 2);
    let mut cursor = start_time;
    let lead = timing::pad_filler(cursor, pad_ms);
    if lead > 0 {
        padded.push(LineupEntry::flex(lead));
        cursor += lead;
    }
    for entry in entries.iter().filter(|entry| !entry.is_flex()) {
        padded.push(entry.clone());
        cursor += entry.duration_ms();
        let filler = timing::pad_filler(cursor, pad_ms);
        if filler > 0 {
            padded.push(LineupEntry::flex(filler));
            cursor += filler;
        }
    }
    padded
}

/// Keeps the first airing of each program; flex and redirects are untouched.
pub fn remove_duplicates(entries: &[LineupEntry]) -> Vec<LineupEntry> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter(|entry| match entry.program_id() {
            Some(program_id) => seen.insert(program_id.to_string()),
            None => true,
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(id: &str, duration_ms: i64) -> LineupEntry {
        LineupEntry::Program {
            program_id: id.into(),
            duration_ms,
            group_key: None,
        }
    }

    #[test]
    fn pads_every_start() {
        let entries = vec![program("a", 70), LineupEntry::flex(3), program("b", 100)];
        let padded = pad_start_times(&entries, 10, 50);
        assert_eq!(
            padded,
            vec![
                LineupEntry::flex(40),
                program("a", 70),
                LineupEntry::flex(30),
                program("b", 100),
            ]
        );
    }

    #[test]
    fn removes_repeat_airings() {
        let entries = vec![
            program("a", 1),
            LineupEntry::flex(2),
            program("a", 1),
            program("b", 1),
            LineupEntry::flex(2),
        ];
        assert_eq!(
            remove_duplicates(&entries),
            vec![
                program("a", 1),
                LineupEntry::flex(2),
                program("b", 1),
                LineupEntry::flex(2),
            ]
        );
    }
}
