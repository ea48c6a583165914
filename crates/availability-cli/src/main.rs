//! `avail` CLI — edit stored weekly availability files and list bookable slots.
//!
//! ## Usage
//!
//! ```sh
//! # Canonicalize a stored availability row (stdin → stdout)
//! cat weekly.json | avail normalize
//!
//! # Add a slot with an explicit start/end (fails on overlap)
//! avail add -i weekly.json --day monday --start 09:00 --end 10:00
//!
//! # Fill or clear a range on several days, snapped to the 15-minute grid
//! avail edit -i weekly.json --day monday --day tuesday --from 09:10 --to 11:00 --mode remove
//!
//! # Bookable 30-minute chunks for the week of 2026-03-16, minus booked sessions
//! avail slots -i weekly.json --booked booked.json --week 2026-03-16
//!
//! # Start times that fit a 60-minute session on one date
//! avail starts -i weekly.json --booked booked.json --date 2026-03-16 --duration 60
//! ```
//!
//! Logs go to stderr; set `RUST_LOG` or `--log-level` to see them.

use anyhow::{Context, Result};
use availability_engine::selection::{self, Granularity, SelectionMode};
use availability_engine::slots::{self, BookedSession, DateRange, SlotQuery};
use availability_engine::{wire, EngineConfig, TimeOfDay, WeeklyAvailability, Weekday};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Read};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "avail", version, about = "Weekly availability and bookable slot tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine configuration JSON (grid sizes, offered durations)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log filter used when RUST_LOG is unset (e.g. "debug")
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Add,
    Remove,
}

impl From<Mode> for SelectionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Add => SelectionMode::Add,
            Mode::Remove => SelectionMode::Remove,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Re-encode availability JSON in canonical form
    Normalize {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Add one slot; rejected if it overlaps an existing slot
    Add {
        #[arg(short, long)]
        input: Option<String>,
        #[arg(short, long)]
        output: Option<String>,
        #[arg(long)]
        day: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },
    /// Fill or clear a time range on one or more days
    Edit {
        #[arg(short, long)]
        input: Option<String>,
        #[arg(short, long)]
        output: Option<String>,
        /// Day to edit (repeat for several days)
        #[arg(long = "day", required = true)]
        days: Vec<String>,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long, value_enum, default_value = "add")]
        mode: Mode,
        /// Grid cell size in minutes (15, 30 or 60); defaults to the configured editor grid
        #[arg(long)]
        granularity: Option<u32>,
    },
    /// List bookable slots as JSON
    Slots {
        #[arg(short, long)]
        input: Option<String>,
        /// JSON array of {startTime, endTime} booked sessions
        #[arg(long)]
        booked: Option<String>,
        /// First date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "week", required_unless_present = "week")]
        from: Option<String>,
        /// Last date, inclusive (defaults to --from)
        #[arg(long, requires = "from")]
        to: Option<String>,
        /// Any date; lists its Monday-to-Sunday week
        #[arg(long)]
        week: Option<String>,
        /// Chunk size in minutes; defaults to the configured slot granularity
        #[arg(long)]
        granularity: Option<u32>,
        /// Combine chunks into sessions of this many minutes
        #[arg(long)]
        duration: Option<u32>,
        #[arg(long, default_value = "tutor")]
        tutor: String,
    },
    /// List start times on a date that fit a session duration
    Starts {
        #[arg(short, long)]
        input: Option<String>,
        #[arg(long)]
        booked: Option<String>,
        #[arg(long)]
        date: String,
        /// Session length in minutes; defaults to the configured default duration
        #[arg(long)]
        duration: Option<u32>,
        #[arg(long)]
        granularity: Option<u32>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = load_config(cli.config.as_deref())?;
    debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Normalize {
            input,
            output,
            pretty,
        } => {
            let weekly = read_weekly(input.as_deref())?;
            let value = wire::to_wire_value(&weekly);
            let json = if pretty {
                serde_json::to_string_pretty(&value)?
            } else {
                serde_json::to_string(&value)?
            };
            write_output(output.as_deref(), &json)?;
        }
        Commands::Add {
            input,
            output,
            day,
            start,
            end,
        } => {
            let weekly = read_weekly(input.as_deref())?;
            let day = parse_day(&day)?;
            let next = selection::add_slot(&weekly, day, parse_time(&start)?, parse_time(&end)?)
                .context("Slot rejected")?;
            info!(day = %day, %start, %end, "added slot");
            write_output(output.as_deref(), &wire::serialize_weekly(&next)?)?;
        }
        Commands::Edit {
            input,
            output,
            days,
            from,
            to,
            mode,
            granularity,
        } => {
            let mut next = read_weekly(input.as_deref())?;
            let granularity = resolve_granularity(granularity, config.editor_granularity)?;
            let (from, to) = (parse_time(&from)?, parse_time(&to)?);

            for day in days {
                let day = parse_day(&day)?;
                let edited = selection::commit_range(next.day(day), from, to, mode.into(), granularity);
                next.set_day(day, edited);
            }
            write_output(output.as_deref(), &wire::serialize_weekly(&next)?)?;
        }
        Commands::Slots {
            input,
            booked,
            from,
            to,
            week,
            granularity,
            duration,
            tutor,
        } => {
            let weekly = read_weekly(input.as_deref())?;
            let booked = read_booked(booked.as_deref())?;
            let range = match (week, from) {
                (Some(week), _) => DateRange::week_of(parse_date(&week)?),
                (None, Some(from)) => {
                    let start = parse_date(&from)?;
                    let end = to.as_deref().map(parse_date).transpose()?.unwrap_or(start);
                    DateRange::new(start, end)
                }
                (None, None) => anyhow::bail!("Either --from or --week is required"),
            };
            let granularity = resolve_granularity(granularity, config.slot_granularity)?;
            let query = SlotQuery::new(tutor, range, granularity);

            let chunks = slots::derive_slots(&weekly, &booked, &query);
            let result = match duration {
                Some(minutes) => {
                    ensure_offered(&config, minutes)?;
                    slots::combine_consecutive(&chunks, minutes)
                }
                None => chunks,
            };
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Starts {
            input,
            booked,
            date,
            duration,
            granularity,
        } => {
            let weekly = read_weekly(input.as_deref())?;
            let booked = read_booked(booked.as_deref())?;
            let date = parse_date(&date)?;
            let granularity = resolve_granularity(granularity, config.slot_granularity)?;
            let minutes = duration.unwrap_or(config.default_duration);
            ensure_offered(&config, minutes)?;

            let query = SlotQuery::new("tutor", DateRange::single(date), granularity);
            let chunks = slots::derive_slots(&weekly, &booked, &query);
            for start in slots::valid_start_times(&chunks, date, minutes) {
                println!("{}", start);
            }
        }
    }

    Ok(())
}

fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn load_config(path: Option<&str>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path))?;
            EngineConfig::from_json(&json).with_context(|| format!("Invalid config file: {}", path))
        }
        None => Ok(EngineConfig::default()),
    }
}

fn resolve_granularity(flag: Option<u32>, configured: Granularity) -> Result<Granularity> {
    match flag {
        Some(minutes) => Granularity::try_from(minutes).context("Unsupported --granularity"),
        None => Ok(configured),
    }
}

fn ensure_offered(config: &EngineConfig, minutes: u32) -> Result<()> {
    if !config.allows_duration(minutes) {
        anyhow::bail!(
            "{}-minute sessions are not offered (available: {:?})",
            minutes,
            config.session_durations
        );
    }
    Ok(())
}

fn parse_day(day: &str) -> Result<Weekday> {
    day.parse().with_context(|| format!("Invalid --day '{}'", day))
}

fn parse_time(time: &str) -> Result<TimeOfDay> {
    time.parse().with_context(|| format!("Invalid time '{}' (expected HH:MM)", time))
}

fn parse_date(date: &str) -> Result<NaiveDate> {
    date.parse()
        .with_context(|| format!("Invalid date '{}' (expected YYYY-MM-DD)", date))
}

fn read_weekly(path: Option<&str>) -> Result<WeeklyAvailability> {
    let json = read_input(path)?;
    wire::parse_weekly(&json).context("Failed to parse availability JSON")
}

fn read_booked(path: Option<&str>) -> Result<Vec<BookedSession>> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read file: {}", path))?;
            wire::parse_booked_sessions(&json).context("Failed to parse booked sessions JSON")
        }
        None => Ok(Vec::new()),
    }
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
