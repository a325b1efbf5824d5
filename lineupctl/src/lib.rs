use std::path::PathBuf;

use chrono::{DateTime, TimeZone, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use lineup_core::lineup::models::validate_programs;
use lineup_core::lineup::{timing, HourRestriction};
use lineup_core::{
    balance, consolidate, derive_seed, load_lineup, load_lineup_config, load_lineup_document,
    load_programs, load_schedule_spec, replicate, schedule, BalanceBy, LineupConfig, LineupEntry,
    LineupError, ReplicateMode, ScheduleResult, ScheduleSpec,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] lineup_core::ConfigError),
    #[error("schedule error: {0}")]
    Lineup(#[from] LineupError),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid timestamp {0:?} (expected RFC 3339)")]
    InvalidTimestamp(String),
    #[error("invalid time of day {0:?} (expected HH:MM)")]
    InvalidTimeOfDay(String),
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Channel lineup scheduling tool", long_about = None)]
pub struct Cli {
    /// Path to lineup.toml; built-in defaults apply when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Fixed RNG seed; otherwise derived from channel, time window and global seed
    #[arg(long)]
    pub seed: Option<u64>,
    /// Reference instant in RFC 3339; defaults to the current time
    #[arg(long)]
    pub now: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a lineup from a program pool and a schedule spec
    Schedule(ScheduleArgs),
    /// Check a program pool and schedule spec without generating anything
    Validate(ValidateArgs),
    /// Keep only what fits a daily airing window
    RestrictHours(RestrictHoursArgs),
    /// Repeat a lineup several times
    Replicate(ReplicateArgs),
    /// Merge adjacent flex and same-target redirect entries
    Consolidate(LineupArgs),
    /// Add copies of under-represented groups
    Balance(BalanceArgs),
}

#[derive(Args, Debug)]
pub struct ScheduleArgs {
    /// JSON file with the program pool
    #[arg(long)]
    pub programs: PathBuf,
    /// Schedule spec (.toml, .yaml or .json)
    #[arg(long)]
    pub spec: PathBuf,
    /// Channel id used for seed derivation
    #[arg(long, default_value = "default")]
    pub channel: String,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[arg(long)]
    pub programs: PathBuf,
    #[arg(long)]
    pub spec: PathBuf,
}

#[derive(Args, Debug)]
pub struct LineupArgs {
    /// JSON lineup: an entry array or the JSON output of any other command
    #[arg(long)]
    pub lineup: PathBuf,
}

#[derive(Args, Debug)]
pub struct RestrictHoursArgs {
    #[arg(long)]
    pub lineup: PathBuf,
    /// Window start, HH:MM
    #[arg(long)]
    pub start: String,
    /// Window end, HH:MM; may be earlier than start to cross midnight
    #[arg(long)]
    pub end: String,
    /// Minutes east of UTC for the window's local midnight
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub time_zone_offset_minutes: i32,
}

#[derive(Args, Debug)]
pub struct ReplicateArgs {
    #[arg(long)]
    pub lineup: PathBuf,
    #[arg(long)]
    pub count: usize,
    #[arg(long, value_enum, default_value_t = ReplicateModeArg::Fixed)]
    pub mode: ReplicateModeArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReplicateModeArg {
    Fixed,
    Random,
}

impl From<ReplicateModeArg> for ReplicateMode {
    fn from(mode: ReplicateModeArg) -> Self {
        match mode {
            ReplicateModeArg::Fixed => ReplicateMode::Fixed,
            ReplicateModeArg::Random => ReplicateMode::Random,
        }
    }
}

#[derive(Args, Debug)]
pub struct BalanceArgs {
    #[arg(long)]
    pub lineup: PathBuf,
    #[arg(long, value_enum, default_value_t = BalanceByArg::Duration)]
    pub by: BalanceByArg,
    /// Allowed shortfall against the largest group, in ms or programs;
    /// defaults to the `[balance]` section of the config
    #[arg(long)]
    pub tolerance: Option<i64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BalanceByArg {
    Duration,
    ProgramCount,
}

impl From<BalanceByArg> for BalanceBy {
    fn from(by: BalanceByArg) -> Self {
        match by {
            BalanceByArg::Duration => BalanceBy::Duration,
            BalanceByArg::ProgramCount => BalanceBy::ProgramCount,
        }
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let context = AppContext::new(&cli)?;

    match &cli.command {
        Commands::Schedule(args) => {
            let report = context.schedule(args)?;
            render(&report, cli.format)?;
        }
        Commands::Validate(args) => {
            let report = context.validate(args)?;
            render(&report, cli.format)?;
        }
        Commands::RestrictHours(args) => {
            let report = context.restrict_hours(args)?;
            render(&report, cli.format)?;
        }
        Commands::Replicate(args) => {
            let report = context.replicate(args)?;
            render(&report, cli.format)?;
        }
        Commands::Consolidate(args) => {
            let report = context.consolidate(args)?;
            render(&report, cli.format)?;
        }
        Commands::Balance(args) => {
            let report = context.balance(args)?;
            render(&report, cli.format)?;
        }
    }

    Ok(())
}

/// Log filter for the subscriber: the config's `[logging]` filter when a
/// readable config was given, `info` otherwise.
pub fn log_filter(cli: &Cli) -> String {
    cli.config
        .as_ref()
        .and_then(|path| load_lineup_config(path).ok())
        .map(|config| config.logging.filter)
        .unwrap_or_else(|| LineupConfig::default().logging.filter)
}

fn render<T>(value: &T, format: OutputFormat) -> Result<()>
where
    T: Serialize + DisplayFallback,
{
    match format {
        OutputFormat::Text => {
            println!("{}", value.display());
            Ok(())
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{}", json);
            Ok(())
        }
    }
}

trait DisplayFallback {
    fn display(&self) -> String;
}

#[derive(Debug)]
struct AppContext {
    config: LineupConfig,
    now: DateTime<Utc>,
    seed: Option<u64>,
}

impl AppContext {
    fn new(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => load_lineup_config(path)?,
            None => LineupConfig::default(),
        };
        let now = match &cli.now {
            Some(value) => DateTime::parse_from_rfc3339(value)
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|_| AppError::InvalidTimestamp(value.clone()))?,
            None => Utc::now(),
        };
        Ok(Self {
            config,
            now,
            seed: cli.seed,
        })
    }

    fn rng_for(&self, channel_id: &str) -> ChaCha20Rng {
        let seed = self.seed.unwrap_or_else(|| {
            derive_seed(
                channel_id,
                self.now,
                self.config.engine.seed_window(),
                self.config.engine.global_seed,
            )
        });
        ChaCha20Rng::seed_from_u64(seed)
    }

    fn schedule(&self, args: &ScheduleArgs) -> Result<ScheduleReport> {
        let programs = load_programs(&args.programs)?;
        let spec = load_schedule_spec(&args.spec)?;
        let mut rng = self.rng_for(&args.channel);
        let result = schedule(
            &programs,
            &spec,
            self.now,
            &self.config.scheduler_config(),
            &mut rng,
        )?;
        info!(
            target: "lineup.scheduler",
            channel = %args.channel,
            fingerprint = %result.fingerprint(),
            "schedule generated"
        );
        Ok(ScheduleReport::new(&args.channel, result))
    }

    fn validate(&self, args: &ValidateArgs) -> Result<ValidationReport> {
        let programs = load_programs(&args.programs)?;
        let spec = load_schedule_spec(&args.spec)?;
        validate_programs(&programs)?;
        spec.validate()?;
        let (schedule_type, slots) = match &spec {
            ScheduleSpec::TimeSlots(spec) => ("time_slots", spec.slots.len()),
            ScheduleSpec::RandomSlots(spec) => ("random_slots", spec.slots.len()),
        };
        Ok(ValidationReport {
            schedule_type,
            programs: programs.len(),
            slots,
            max_days: spec.max_days(),
            horizon_ms: spec.horizon_ms(),
        })
    }

    fn restrict_hours(&self, args: &RestrictHoursArgs) -> Result<LineupReport> {
        let entries = load_lineup(&args.lineup)?;
        let start = parse_clock(&args.start)?;
        let mut end = parse_clock(&args.end)?;
        if end <= start {
            end += timing::DAY_MS;
        }
        let restricted = HourRestriction::new(start, end)
            .with_time_zone(args.time_zone_offset_minutes)
            .apply(&entries, self.now);
        Ok(LineupReport::new(
            restricted.new_start_time,
            restricted.new_entries,
        ))
    }

    fn replicate(&self, args: &ReplicateArgs) -> Result<LineupReport> {
        let document = load_lineup_document(&args.lineup)?;
        let mut rng = self.rng_for("replicate");
        let replicated = replicate(&document.entries, args.count, args.mode.into(), &mut rng);
        Ok(LineupReport::new(document.start_time, replicated))
    }

    fn consolidate(&self, args: &LineupArgs) -> Result<LineupReport> {
        let document = load_lineup_document(&args.lineup)?;
        Ok(LineupReport::new(
            document.start_time,
            consolidate(&document.entries),
        ))
    }

    fn balance(&self, args: &BalanceArgs) -> Result<LineupReport> {
        let document = load_lineup_document(&args.lineup)?;
        let by = BalanceBy::from(args.by);
        let tolerance = args
            .tolerance
            .unwrap_or_else(|| self.config.balance.tolerance_for(by));
        Ok(LineupReport::new(
            document.start_time,
            balance(&document.entries, by, tolerance),
        ))
    }
}

fn parse_clock(value: &str) -> Result<i64> {
    timing::parse_time_of_day(value).ok_or_else(|| AppError::InvalidTimeOfDay(value.to_string()))
}

fn format_instant(epoch_ms: i64) -> String {
    Utc.timestamp_millis_opt(epoch_ms)
        .single()
        .map(|instant| instant.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| epoch_ms.to_string())
}

fn describe_entry(entry: &LineupEntry) -> String {
    let duration = timing::format_duration(entry.duration_ms());
    match entry {
        LineupEntry::Program { program_id, .. } => format!("{duration} program {program_id}"),
        LineupEntry::Flex { .. } => format!("{duration} flex"),
        LineupEntry::Redirect {
            target_channel_id, ..
        } => format!("{duration} redirect -> {target_channel_id}"),
    }
}

#[derive(Debug, Serialize)]
struct ScheduleReport {
    channel: String,
    start_time: i64,
    end_time: i64,
    total_duration_ms: i64,
    fingerprint: String,
    entries: Vec<LineupEntry>,
}

impl ScheduleReport {
    fn new(channel: &str, result: ScheduleResult) -> Self {
        Self {
            channel: channel.to_string(),
            start_time: result.start_time,
            end_time: result.end_time(),
            total_duration_ms: result.total_duration_ms(),
            fingerprint: result.fingerprint(),
            entries: result.entries,
        }
    }
}

impl DisplayFallback for ScheduleReport {
    fn display(&self) -> String {
        let mut lines = vec![format!(
            "Channel {}: {} -> {} ({} entries, {})",
            self.channel,
            format_instant(self.start_time),
            format_instant(self.end_time),
            self.entries.len(),
            timing::format_duration(self.total_duration_ms)
        )];
        let mut cursor = self.start_time;
        for entry in &self.entries {
            lines.push(format!("  {} {}", format_instant(cursor), describe_entry(entry)));
            cursor += entry.duration_ms();
        }
        lines.push(format!("fingerprint: {}", self.fingerprint));
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
struct ValidationReport {
    schedule_type: &'static str,
    programs: usize,
    slots: usize,
    max_days: i64,
    horizon_ms: i64,
}

impl DisplayFallback for ValidationReport {
    fn display(&self) -> String {
        format!(
            "OK: {} schedule with {} slots over {} days ({}), {} programs",
            self.schedule_type,
            self.slots,
            self.max_days,
            timing::format_duration(self.horizon_ms),
            self.programs
        )
    }
}

#[derive(Debug, Serialize)]
struct LineupReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    start_time: Option<i64>,
    total_duration_ms: i64,
    entries: Vec<LineupEntry>,
}

impl LineupReport {
    fn new(start_time: Option<i64>, entries: Vec<LineupEntry>) -> Self {
        Self {
            start_time,
            total_duration_ms: lineup_core::lineup::total_duration_ms(&entries),
            entries,
        }
    }
}

impl DisplayFallback for LineupReport {
    fn display(&self) -> String {
        if self.entries.is_empty() {
            return "Empty lineup".to_string();
        }
        let mut lines = Vec::new();
        if let Some(start_time) = self.start_time {
            lines.push(format!("Starts {}", format_instant(start_time)));
        }
        for (index, entry) in self.entries.iter().enumerate() {
            lines.push(format!("#{index} {}", describe_entry(entry)));
        }
        lines.push(format!(
            "total: {}",
            timing::format_duration(self.total_duration_ms)
        ));
        lines.join("\n")
    }
}
