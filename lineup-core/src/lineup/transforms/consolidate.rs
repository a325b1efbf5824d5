use crate::lineup::models::LineupEntry;

/// Merges each run of adjacent flex entries, and each run of adjacent
/// redirects to the same channel, into one entry. Programs are never merged.
pub fn consolidate(entries: &[LineupEntry]) -> Vec<LineupEntry> {
    let mut merged: Vec<LineupEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        match (merged.last_mut(), entry) {
            (
                Some(LineupEntry::Flex { duration_ms: last }),
                LineupEntry::Flex { duration_ms },
            ) => *last += duration_ms,
            (
                Some(LineupEntry::Redirect {
                    target_channel_id: last_target,
                    duration_ms: last,
                }),
                LineupEntry::Redirect {
                    target_channel_id,
                    duration_ms,
                },
            ) if last_target == target_channel_id => *last += duration_ms,
            _ => merged.push(entry.clone()),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineup::models::total_duration_ms;

    fn program(id: &str) -> LineupEntry {
        LineupEntry::Program {
            program_id: id.into(),
            duration_ms: 100,
            group_key: None,
        }
    }

    #[test]
    fn merges_runs_and_is_idempotent() {
        let entries = vec![
            LineupEntry::flex(10),
            LineupEntry::flex(20),
            program("a"),
            program("a"),
            LineupEntry::redirect("x", 5),
            LineupEntry::redirect("x", 6),
            LineupEntry::redirect("y", 7),
            LineupEntry::flex(1),
        ];
        let once = consolidate(&entries);
        assert_eq!(
            once,
            vec![
                LineupEntry::flex(30),
                program("a"),
                program("a"),
                LineupEntry::redirect("x", 11),
                LineupEntry::redirect("y", 7),
                LineupEntry::flex(1),
            ]
        );
        assert_eq!(consolidate(&once), once);
        assert_eq!(total_duration_ms(&once), total_duration_ms(&entries));
    }
}
