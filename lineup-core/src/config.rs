use std::path::Path;

use chrono::Duration;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ConfigError, Result};
use crate::lineup::{BalanceBy, LineupEntry, Program, ScheduleSpec, SchedulerConfig};

/// Engine-wide settings loaded from `lineup.toml`. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LineupConfig {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub balance: BalanceSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl LineupConfig {
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            iteration_cap: self.engine.iteration_cap,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    #[serde(default = "EngineSection::default_iteration_cap")]
    pub iteration_cap: usize,
    #[serde(default)]
    pub global_seed: u64,
    #[serde(default = "EngineSection::default_seed_window_minutes")]
    pub seed_window_minutes: i64,
}

impl EngineSection {
    fn default_iteration_cap() -> usize {
        SchedulerConfig::default().iteration_cap
    }

    fn default_seed_window_minutes() -> i64 {
        60
    }

    pub fn seed_window(&self) -> Duration {
        Duration::minutes(self.seed_window_minutes.max(1))
    }
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            iteration_cap: Self::default_iteration_cap(),
            global_seed: 0,
            seed_window_minutes: Self::default_seed_window_minutes(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BalanceSection {
    #[serde(default)]
    pub duration_tolerance_ms: i64,
    #[serde(default)]
    pub program_count_tolerance: i64,
}

impl BalanceSection {
    pub fn tolerance_for(&self, by: BalanceBy) -> i64 {
        match by {
            BalanceBy::Duration => self.duration_tolerance_ms,
            BalanceBy::ProgramCount => self.program_count_tolerance,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "LoggingSection::default_filter")]
    pub filter: String,
}

impl LoggingSection {
    fn default_filter() -> String {
        "info".to_string()
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: Self::default_filter(),
        }
    }
}

pub fn load_lineup_config<P: AsRef<Path>>(path: P) -> Result<LineupConfig> {
    load_toml(path)
}

/// Loads a schedule spec, picking the format from the file extension.
pub fn load_schedule_spec<P: AsRef<Path>>(path: P) -> Result<ScheduleSpec> {
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => load_toml(path),
        Some("yaml") | Some("yml") => load_yaml(path),
        Some("json") => load_json(path),
        _ => Err(ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

pub fn load_programs<P: AsRef<Path>>(path: P) -> Result<Vec<Program>> {
    load_json(path)
}

/// A lineup read back from disk. `start_time` is absent for bare entry
/// arrays and for transform output that has no anchor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LineupDocument {
    #[serde(default)]
    pub start_time: Option<i64>,
    pub entries: Vec<LineupEntry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LineupFile {
    Document(LineupDocument),
    Entries(Vec<LineupEntry>),
}

/// Loads a lineup from a bare JSON entry array or from any `lineupctl` JSON
/// output carrying an `entries` field, so transforms can be chained.
pub fn load_lineup_document<P: AsRef<Path>>(path: P) -> Result<LineupDocument> {
    let file: LineupFile = load_json(path)?;
    Ok(match file {
        LineupFile::Document(document) => document,
        LineupFile::Entries(entries) => LineupDocument {
            start_time: None,
            entries,
        },
    })
}

pub fn load_lineup<P: AsRef<Path>>(path: P) -> Result<Vec<LineupEntry>> {
    Ok(load_lineup_document(path)?.entries)
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: path.to_path_buf(),
    })
}

fn load_toml<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = read_file(path)?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}

fn load_yaml<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = read_file(path)?;
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
        source,
        path: path.to_path_buf(),
    })
}

fn load_json<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = read_file(path)?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Json {
        source,
        path: path.to_path_buf(),
    })
}
