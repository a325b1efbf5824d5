use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::{LineupError, LineupResult};
use super::timing::{self, DAY_MS};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProgramKind {
    Movie,
    Episode,
    Track,
    CustomShow,
    MusicVideo,
    OtherVideo,
}

impl ProgramKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramKind::Movie => "movie",
            ProgramKind::Episode => "episode",
            ProgramKind::Track => "track",
            ProgramKind::CustomShow => "custom_show",
            ProgramKind::MusicVideo => "music_video",
            ProgramKind::OtherVideo => "other_video",
        }
    }
}

impl fmt::Display for ProgramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProgramKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(ProgramKind::Movie),
            "episode" => Ok(ProgramKind::Episode),
            "track" => Ok(ProgramKind::Track),
            "custom_show" => Ok(ProgramKind::CustomShow),
            "music_video" => Ok(ProgramKind::MusicVideo),
            "other_video" => Ok(ProgramKind::OtherVideo),
            other => Err(format!("unknown program kind: {other}")),
        }
    }
}

/// An item eligible for playback. Never mutated by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Program {
    pub id: String,
    pub duration_ms: i64,
    pub kind: ProgramKind,
    #[serde(default)]
    pub group_key: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub season_number: Option<u32>,
    #[serde(default)]
    pub episode_number: Option<u32>,
}

impl Program {
    pub fn new(id: impl Into<String>, kind: ProgramKind, duration_ms: i64) -> Self {
        Self {
            id: id.into(),
            duration_ms,
            kind,
            group_key: None,
            title: None,
            season_number: None,
            episode_number: None,
        }
    }

    pub fn with_group(mut self, group_key: impl Into<String>) -> Self {
        self.group_key = Some(group_key.into());
        self
    }

    pub fn with_episode(mut self, season: u32, episode: u32) -> Self {
        self.season_number = Some(season);
        self.episode_number = Some(episode);
        self
    }

    /// Group used for sequencing; programs without one form a group of their own.
    pub fn group(&self) -> &str {
        self.group_key.as_deref().unwrap_or(&self.id)
    }

    /// `kind.group` string matched by [`SlotSelector::Kind`] prefixes.
    pub fn slot_key(&self) -> String {
        format!("{}.{}", self.kind.as_str(), self.group())
    }
}

/// Rejects programs with a non-positive duration.
pub fn validate_programs(programs: &[Program]) -> LineupResult<()> {
    match programs.iter().find(|program| program.duration_ms <= 0) {
        Some(program) => Err(LineupError::InvalidProgramDuration {
            program_id: program.id.clone(),
            duration_ms: program.duration_ms,
        }),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LineupEntry {
    Program {
        program_id: String,
        duration_ms: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        group_key: Option<String>,
    },
    Flex {
        duration_ms: i64,
    },
    Redirect {
        target_channel_id: String,
        duration_ms: i64,
    },
}

impl LineupEntry {
    pub fn program(program: &Program) -> Self {
        LineupEntry::Program {
            program_id: program.id.clone(),
            duration_ms: program.duration_ms,
            group_key: program.group_key.clone(),
        }
    }

    pub fn flex(duration_ms: i64) -> Self {
        LineupEntry::Flex { duration_ms }
    }

    pub fn redirect(target_channel_id: impl Into<String>, duration_ms: i64) -> Self {
        LineupEntry::Redirect {
            target_channel_id: target_channel_id.into(),
            duration_ms,
        }
    }

    pub fn duration_ms(&self) -> i64 {
        match self {
            LineupEntry::Program { duration_ms, .. }
            | LineupEntry::Flex { duration_ms }
            | LineupEntry::Redirect { duration_ms, .. } => *duration_ms,
        }
    }

    pub fn is_flex(&self) -> bool {
        matches!(self, LineupEntry::Flex { .. })
    }

    pub fn program_id(&self) -> Option<&str> {
        match self {
            LineupEntry::Program { program_id, .. } => Some(program_id),
            _ => None,
        }
    }

    /// Balance/duplicate key: the group key, falling back to the program id.
    pub fn group(&self) -> Option<&str> {
        match self {
            LineupEntry::Program {
                program_id,
                group_key,
                ..
            } => Some(group_key.as_deref().unwrap_or(program_id)),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LineupEntry::Program { .. } => "program",
            LineupEntry::Flex { .. } => "flex",
            LineupEntry::Redirect { .. } => "redirect",
        }
    }
}

/// Total duration of a run of entries.
pub fn total_duration_ms(entries: &[LineupEntry]) -> i64 {
    entries.iter().map(LineupEntry::duration_ms).sum()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlotSelector {
    Kind { prefix: String },
    Show { show_id: String },
    CustomShow { custom_show_id: String },
    Flex,
    Redirect { channel_id: String },
}

impl SlotSelector {
    pub fn matches(&self, program: &Program) -> bool {
        match self {
            SlotSelector::Kind { prefix } => program.slot_key().starts_with(prefix.as_str()),
            SlotSelector::Show { show_id } => {
                program.kind == ProgramKind::Episode
                    && program.group_key.as_deref() == Some(show_id.as_str())
            }
            SlotSelector::CustomShow { custom_show_id } => {
                program.kind == ProgramKind::CustomShow
                    && program.group_key.as_deref() == Some(custom_show_id.as_str())
            }
            SlotSelector::Flex | SlotSelector::Redirect { .. } => false,
        }
    }

    /// Whether the selector draws from the program pool at all.
    pub fn uses_programs(&self) -> bool {
        !matches!(self, SlotSelector::Flex | SlotSelector::Redirect { .. })
    }
}

impl fmt::Display for SlotSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotSelector::Kind { prefix } => write!(f, "kind:{prefix}"),
            SlotSelector::Show { show_id } => write!(f, "show:{show_id}"),
            SlotSelector::CustomShow { custom_show_id } => {
                write!(f, "custom_show:{custom_show_id}")
            }
            SlotSelector::Flex => f.write_str("flex"),
            SlotSelector::Redirect { channel_id } => write!(f, "redirect:{channel_id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SlotOrder {
    #[default]
    Shuffle,
    Ordered,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum RandomSlotOrder {
    #[default]
    Shuffle,
    OrderedShuffle,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FlexPreference {
    #[default]
    Distribute,
    End,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PadStyle {
    #[default]
    Episode,
    Slot,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RandomDistribution {
    #[default]
    Uniform,
    Weighted,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeSlot {
    pub time_of_day_ms: i64,
    pub selector: SlotSelector,
    #[serde(default)]
    pub order: SlotOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DurationSpec {
    FixedCount { count: usize },
    Dynamic {
        #[serde(default)]
        target_ms: Option<i64>,
    },
    FixedDuration { duration_ms: i64 },
}

impl Default for DurationSpec {
    fn default() -> Self {
        DurationSpec::FixedCount { count: 1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RandomSlot {
    pub selector: SlotSelector,
    #[serde(default = "RandomSlot::default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub cooldown_ms: i64,
    #[serde(default)]
    pub duration_spec: DurationSpec,
    #[serde(default)]
    pub order: RandomSlotOrder,
    #[serde(default)]
    pub direction: Direction,
}

impl RandomSlot {
    const fn default_weight() -> f64 {
        1.0
    }

    pub fn new(selector: SlotSelector) -> Self {
        Self {
            selector,
            weight: Self::default_weight(),
            cooldown_ms: 0,
            duration_spec: DurationSpec::default(),
            order: RandomSlotOrder::default(),
            direction: Direction::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeSlotSchedule {
    #[serde(default = "default_period_ms")]
    pub period_ms: i64,
    #[serde(default)]
    pub lateness_ms: i64,
    pub max_days: i64,
    #[serde(default)]
    pub flex_preference: FlexPreference,
    #[serde(default)]
    pub pad_ms: i64,
    #[serde(default)]
    pub time_zone_offset_minutes: i32,
    #[serde(default)]
    pub slots: Vec<TimeSlot>,
}

fn default_period_ms() -> i64 {
    DAY_MS
}

impl TimeSlotSchedule {
    /// Checks the contract violations that must surface before scheduling starts.
    pub fn validate(&self) -> LineupResult<()> {
        if self.period_ms <= 0 {
            return Err(LineupError::InvalidPeriod(self.period_ms));
        }
        if self.max_days <= 0 {
            return Err(LineupError::InvalidMaxDays(self.max_days));
        }
        if self.pad_ms < 0 {
            return Err(LineupError::NegativePadding(self.pad_ms));
        }
        if self.lateness_ms < 0 {
            return Err(LineupError::NegativeLateness(self.lateness_ms));
        }
        timing::fixed_offset(self.time_zone_offset_minutes)?;
        let mut seen = HashSet::new();
        for slot in &self.slots {
            if slot.time_of_day_ms < 0 || slot.time_of_day_ms >= self.period_ms {
                return Err(LineupError::SlotOutsidePeriod {
                    time_of_day_ms: slot.time_of_day_ms,
                    period_ms: self.period_ms,
                });
            }
            if !seen.insert(slot.time_of_day_ms) {
                return Err(LineupError::DuplicateSlotTime(slot.time_of_day_ms));
            }
        }
        Ok(())
    }

    /// Slots ordered by time of day.
    pub fn sorted_slots(&self) -> Vec<TimeSlot> {
        let mut slots = self.slots.clone();
        slots.sort_by_key(|slot| slot.time_of_day_ms);
        slots
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RandomSlotSchedule {
    pub max_days: i64,
    #[serde(default)]
    pub pad_ms: i64,
    #[serde(default)]
    pub pad_style: PadStyle,
    #[serde(default)]
    pub flex_preference: FlexPreference,
    #[serde(default)]
    pub random_distribution: RandomDistribution,
    #[serde(default)]
    pub slots: Vec<RandomSlot>,
}

impl RandomSlotSchedule {
    pub fn validate(&self) -> LineupResult<()> {
        if self.max_days <= 0 {
            return Err(LineupError::InvalidMaxDays(self.max_days));
        }
        if self.pad_ms < 0 {
            return Err(LineupError::NegativePadding(self.pad_ms));
        }
        for (index, slot) in self.slots.iter().enumerate() {
            if slot.cooldown_ms < 0 {
                return Err(LineupError::NegativeCooldown {
                    slot: index,
                    cooldown_ms: slot.cooldown_ms,
                });
            }
            if !slot.weight.is_finite() || slot.weight < 0.0 {
                return Err(LineupError::InvalidWeight {
                    slot: index,
                    weight: slot.weight,
                });
            }
            match slot.duration_spec {
                DurationSpec::FixedCount { count: 0 } => {
                    return Err(LineupError::EmptyFixedCount(index));
                }
                DurationSpec::FixedDuration { duration_ms } if duration_ms <= 0 => {
                    return Err(LineupError::InvalidBlockDuration {
                        slot: index,
                        duration_ms,
                    });
                }
                DurationSpec::Dynamic {
                    target_ms: Some(target_ms),
                } if target_ms <= 0 => {
                    return Err(LineupError::InvalidBlockDuration {
                        slot: index,
                        duration_ms: target_ms,
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn horizon_ms(&self) -> i64 {
        self.max_days.saturating_mul(DAY_MS)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduleSpec {
    TimeSlots(TimeSlotSchedule),
    RandomSlots(RandomSlotSchedule),
}

impl ScheduleSpec {
    pub fn validate(&self) -> LineupResult<()> {
        match self {
            ScheduleSpec::TimeSlots(spec) => spec.validate(),
            ScheduleSpec::RandomSlots(spec) => spec.validate(),
        }
    }

    pub fn max_days(&self) -> i64 {
        match self {
            ScheduleSpec::TimeSlots(spec) => spec.max_days,
            ScheduleSpec::RandomSlots(spec) => spec.max_days,
        }
    }

    pub fn horizon_ms(&self) -> i64 {
        match self {
            ScheduleSpec::TimeSlots(spec) => spec.max_days.saturating_mul(spec.period_ms),
            ScheduleSpec::RandomSlots(spec) => spec.horizon_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleResult {
    pub start_time: i64,
    pub entries: Vec<LineupEntry>,
}

impl ScheduleResult {
    pub fn empty(start_time: i64) -> Self {
        Self {
            start_time,
            entries: Vec::new(),
        }
    }

    pub fn total_duration_ms(&self) -> i64 {
        total_duration_ms(&self.entries)
    }

    pub fn end_time(&self) -> i64 {
        self.start_time + self.total_duration_ms()
    }

    pub fn start_time_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.start_time).single()
    }

    /// Absolute start instant of every entry, in lineup order.
    pub fn entry_start_times(&self) -> Vec<i64> {
        let mut cursor = self.start_time;
        self.entries
            .iter()
            .map(|entry| {
                let start = cursor;
                cursor += entry.duration_ms();
                start
            })
            .collect()
    }

    /// SHA-256 over the start time and entries; equal for identical replays.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.start_time.to_be_bytes());
        for entry in &self.entries {
            hasher.update(entry.label().as_bytes());
            hasher.update(entry.duration_ms().to_be_bytes());
            match entry {
                LineupEntry::Program { program_id, .. } => hasher.update(program_id.as_bytes()),
                LineupEntry::Redirect {
                    target_channel_id, ..
                } => hasher.update(target_channel_id.as_bytes()),
                LineupEntry::Flex { .. } => {}
            }
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_key_uses_group_or_id() {
        let movie = Program::new("m1", ProgramKind::Movie, 1_000);
        assert_eq!(movie.slot_key(), "movie.m1");
        let episode = Program::new("e1", ProgramKind::Episode, 1_000).with_group("show-7");
        assert_eq!(episode.slot_key(), "episode.show-7");
    }

    #[test]
    fn selectors_match_by_prefix_and_group() {
        let episode = Program::new("e1", ProgramKind::Episode, 1_000).with_group("show-7");
        let custom = Program::new("c1", ProgramKind::CustomShow, 1_000).with_group("cs-1");
        let kind = SlotSelector::Kind {
            prefix: "episode.".into(),
        };
        assert!(kind.matches(&episode));
        assert!(!kind.matches(&custom));

        let show = SlotSelector::Show {
            show_id: "show-7".into(),
        };
        assert!(show.matches(&episode));
        let custom_show = SlotSelector::CustomShow {
            custom_show_id: "show-7".into(),
        };
        assert!(!custom_show.matches(&episode));
        assert!(!SlotSelector::Flex.matches(&episode));
    }

    #[test]
    fn time_slot_validation_rejects_duplicates() {
        let slot = TimeSlot {
            time_of_day_ms: 3_600_000,
            selector: SlotSelector::Flex,
            order: SlotOrder::Ordered,
        };
        let spec = TimeSlotSchedule {
            period_ms: DAY_MS,
            lateness_ms: 0,
            max_days: 1,
            flex_preference: FlexPreference::End,
            pad_ms: 0,
            time_zone_offset_minutes: 0,
            slots: vec![slot.clone(), slot],
        };
        assert_eq!(
            spec.validate(),
            Err(LineupError::DuplicateSlotTime(3_600_000))
        );
    }

    #[test]
    fn random_slot_validation_rejects_negative_weight() {
        let mut slot = RandomSlot::new(SlotSelector::Flex);
        slot.weight = -1.0;
        let spec = RandomSlotSchedule {
            max_days: 1,
            pad_ms: 0,
            pad_style: PadStyle::Episode,
            flex_preference: FlexPreference::End,
            random_distribution: RandomDistribution::Weighted,
            slots: vec![slot],
        };
        assert!(matches!(
            spec.validate(),
            Err(LineupError::InvalidWeight { slot: 0, .. })
        ));
    }

    #[test]
    fn entry_start_times_accumulate() {
        let result = ScheduleResult {
            start_time: 1_000,
            entries: vec![
                LineupEntry::flex(500),
                LineupEntry::redirect("ch-2", 250),
                LineupEntry::flex(10),
            ],
        };
        assert_eq!(result.entry_start_times(), vec![1_000, 1_500, 1_750]);
        assert_eq!(result.end_time(), 1_760);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = ScheduleResult {
            start_time: 0,
            entries: vec![LineupEntry::flex(10)],
        };
        let mut b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.entries.push(LineupEntry::flex(1));
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn entries_serialize_with_type_tag() {
        let entry = LineupEntry::redirect("ch-9", 60_000);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "redirect");
        assert_eq!(json["target_channel_id"], "ch-9");
    }
}
