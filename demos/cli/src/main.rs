use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use dashboard_core::{
    align_field, compare, entry_for_day, normalize_timestamp, pad_front, rolling_lookup,
    DashboardConfig, DashboardError, DateGrid, DateKey,
};
use dashboard_kis::{parse_dated_records, parse_records, project, ViewKind};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

mod logging;

#[derive(Parser, Debug)]
#[command(
    name = "dashboard-cli",
    about = "Build chart series and patient tables from hospital dashboard exports."
)]
struct Args {
    /// JSON file overriding the default dashboard settings.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dense series of one metric from the daily log.
    Series {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        field: String,
        /// Last day of the window as a day key; defaults to today.
        #[arg(long)]
        end: Option<String>,
        /// Window length; defaults to the configured window.
        #[arg(long)]
        days: Option<u32>,
        /// Left-pad the series with nulls to this length.
        #[arg(long)]
        pad_to: Option<usize>,
    },
    /// Patient table for one view of a KIS export.
    Table {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        view: ViewKind,
    },
    /// Today's counters against yesterday's.
    Today {
        #[arg(short, long)]
        input: PathBuf,
        /// Day key of "today"; defaults to the local date.
        #[arg(long)]
        date: Option<String>,
    },
    /// Display form of a raw timestamp.
    Timestamp { raw: String },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_logging(args.verbose)?;

    let config = load_config(args.config.as_deref())?;
    let output = match args.command {
        Command::Series {
            input,
            field,
            end,
            days,
            pad_to,
        } => series(&config, &input, &field, end.as_deref(), days, pad_to)?,
        Command::Table { input, view } => table(&config, &input, view)?,
        Command::Today { input, date } => today(&config, &input, date.as_deref())?,
        Command::Timestamp { raw } => {
            Value::String(normalize_timestamp(&raw, config.timestamp_offset()?)?)
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<DashboardConfig> {
    let Some(path) = path else {
        return Ok(DashboardConfig::default());
    };
    let data = read_input(path)?;
    let config: DashboardConfig =
        serde_json::from_str(&data).with_context(|| format!("Invalid config in {path:?}"))?;
    config
        .validate()
        .with_context(|| format!("Unusable config in {path:?}"))?;
    Ok(config)
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Could not read file {path:?}"))
}

fn resolve_day(config: &DashboardConfig, key: Option<&str>) -> anyhow::Result<NaiveDate> {
    match key {
        Some(key) => Ok(config.date_key_format.parse(&DateKey::from(key))?),
        None => Ok(Local::now().date_naive()),
    }
}

fn series(
    config: &DashboardConfig,
    input: &Path,
    field: &str,
    end: Option<&str>,
    days: Option<u32>,
    pad_to: Option<usize>,
) -> anyhow::Result<Value> {
    let log = parse_dated_records(&read_input(input)?)
        .with_context(|| format!("Invalid daily log in {input:?}"))?;
    let end = resolve_day(config, end)?;
    let grid = DateGrid::ending_on(
        end,
        days.unwrap_or(config.window_days),
        &config.date_key_format,
    );

    let series = align_field(&log, field, &grid);
    info!(field, days = grid.len(), records = log.len(), "series aligned");

    let values = match pad_to {
        Some(target) => pad_front(series.as_slice(), target)?,
        None => series.into_inner(),
    };
    Ok(json!({ "grid": grid, "series": values }))
}

fn table(config: &DashboardConfig, input: &Path, view: ViewKind) -> anyhow::Result<Value> {
    let records = parse_records(&read_input(input)?)
        .with_context(|| format!("Invalid KIS export in {input:?}"))?;
    let rows = project(view, &records, config)
        .with_context(|| format!("Could not build {view} table"))?;
    info!(%view, rows = rows.len(), "table projected");
    Ok(serde_json::to_value(rows)?)
}

fn today(config: &DashboardConfig, input: &Path, date: Option<&str>) -> anyhow::Result<Value> {
    let log = parse_dated_records(&read_input(input)?)
        .with_context(|| format!("Invalid daily log in {input:?}"))?;
    let day = resolve_day(config, date)?;
    let today = config.date_key_format.format(day);
    let before = day.pred_opt().context("No day before the requested date")?;
    let yesterday = config.date_key_format.format(before);

    let fields = &config.metric_fields[..];
    let current = rolling_lookup(&log, &today, 1, fields);
    // The nightly job may not have appended today yet, so yesterday is
    // looked up by key rather than by its position from the tail.
    let previous = entry_for_day(&log, &yesterday, fields);

    let mut comparisons = Map::new();
    for field in fields {
        let value = match compare(&current, &previous, field) {
            Ok(comparison) => serde_json::to_value(comparison)?,
            Err(DashboardError::DivisionByZero) => {
                warn!(field = %field, "yesterday was zero, no percent change");
                Value::Null
            }
            Err(err) => return Err(err.into()),
        };
        comparisons.insert(field.clone(), value);
    }

    Ok(json!({ "dates": today, "metrics": comparisons }))
}
