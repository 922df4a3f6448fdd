//! Alpine Floods CLI
//!
//! Loads the flood and rainfall inputs, derives dashboard tables and runs
//! the offline preparation steps.

use alpine_floods::config::{Config, InputFile};
use alpine_floods::data::schema::{RAW_FLOOD_EXPORT, REGIONS};
use alpine_floods::data::{records, BaseTables, DataLoader, LoadReport};
use alpine_floods::export::{self, write_csv, write_json};
use alpine_floods::pipeline::{derive_dashboard, DashboardQuery, DashboardSettings, Period};
use alpine_floods::stats::{build_story, EventWindow};
use alpine_floods::wrangle::{merge_rainfall, prepare_events};
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(
    name = "alpine-floods",
    version,
    about = "Flood event and Alpine rainfall preparation for dashboards"
)]
struct Cli {
    /// TOML configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Command {
    /// Load every input and report rows that could not be converted
    Check {
        /// Write the full load report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Derive the dashboard tables for one year, country and timeframe
    Query {
        #[arg(short, long)]
        year: i32,

        /// Country name as it appears in the flood table
        #[arg(long)]
        country: Option<String>,

        /// D, W, M or Y
        #[arg(short, long, default_value = "D")]
        timeframe: Period,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// JSON file, or directory for CSV output (JSON goes to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Long-term aggregates, temperature comparison and one event close-up
    Story {
        /// First day of the examined event (YYYY-MM-DD)
        #[arg(long, default_value = "2005-08-01")]
        from: NaiveDate,

        /// Last day of the examined event (YYYY-MM-DD)
        #[arg(long, default_value = "2005-08-31")]
        to: NaiveDate,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build the canonical flood file from a raw export and the region codes
    PrepareEvents {
        /// Raw flood export
        #[arg(long)]
        raw: PathBuf,

        /// Region lookup with coordinates (defaults to the configured one)
        #[arg(long)]
        regions: Option<PathBuf>,

        /// Keep only events with a rain-related cause
        #[arg(long)]
        rain_only: bool,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Merge several rainfall exports into one file
    MergeRain {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Field separator of the inputs (sniffed when omitted)
        #[arg(long)]
        separator: Option<char>,

        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    match cli.command {
        Command::Check { report } => run_check(&config, report.as_deref()),
        Command::Query {
            year,
            country,
            timeframe,
            format,
            output,
        } => {
            let query = DashboardQuery {
                year,
                country,
                timeframe,
            };
            run_query(&config, &query, format, output.as_deref())
        }
        Command::Story {
            from,
            to,
            format,
            output,
        } => {
            let window = EventWindow::new(from, to)
                .ok_or_else(|| anyhow!("Event window {from}..{to} is empty"))?;
            run_story(&config, window, format, output.as_deref())
        }
        Command::PrepareEvents {
            raw,
            regions,
            rain_only,
            output,
        } => run_prepare_events(&config, &raw, regions, rain_only, &output),
        Command::MergeRain {
            inputs,
            separator,
            output,
        } => run_merge_rain(&config, inputs, separator, &output),
    }
}

fn load_base(config: &Config) -> Result<BaseTables> {
    let start = Instant::now();
    let base = BaseTables::load(config).context("Failed to load input tables")?;
    info!(
        "Loaded {} events, {} rainfall observations and {} regions in {:?}",
        base.events().len(),
        base.rainfall().len(),
        base.regions().len(),
        start.elapsed()
    );
    base.report().log_summary();
    Ok(base)
}

fn run_check(config: &Config, report_path: Option<&Path>) -> Result<()> {
    let base = load_base(config)?;
    let years = base.years();
    match (years.first(), years.last()) {
        (Some(first), Some(last)) => info!("Flood events cover {first}..={last}"),
        _ => warn!("No flood events with a valid year"),
    }
    if let Some(path) = report_path {
        write_json(base.report(), Some(path)).context("Failed to write load report")?;
    }
    Ok(())
}

fn run_query(
    config: &Config,
    query: &DashboardQuery,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let base = load_base(config)?;
    let settings = DashboardSettings::from(config);
    let tables = derive_dashboard(&base, query, &settings)
        .with_context(|| format!("Failed to derive dashboard for {}", query.year))?;
    if tables.no_data {
        warn!(
            "No flood events for {} {}",
            query.year,
            query.country.as_deref().unwrap_or("(all countries)")
        );
    }

    match format {
        OutputFormat::Json => write_json(&tables, output)?,
        OutputFormat::Csv => {
            let dir = output.unwrap_or(Path::new("out"));
            export::write_dashboard_csv(&tables, dir)?;
        }
    }
    Ok(())
}

fn run_story(
    config: &Config,
    window: EventWindow,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let base = load_base(config)?;
    if base.global_temperature().is_empty() {
        warn!("No global temperature series loaded, yearly comparison will be empty");
    }
    let story = build_story(
        base.rainfall(),
        base.global_temperature(),
        &config.series.story_windows,
        window,
    )?;
    if let Some(r) = story.temperature_correlation {
        info!("Correlation of yearly precipitation and temperature anomaly: {r:.3}");
    }

    match format {
        OutputFormat::Json => write_json(&story, output)?,
        OutputFormat::Csv => {
            let dir = output.unwrap_or(Path::new("out"));
            export::write_story_csv(&story, dir)?;
        }
    }
    Ok(())
}

fn run_prepare_events(
    config: &Config,
    raw: &Path,
    regions: Option<PathBuf>,
    rain_only: bool,
    output: &Path,
) -> Result<()> {
    let mut raw_loader = DataLoader::new();
    let raw_df = raw_loader
        .load_table(raw, &RAW_FLOOD_EXPORT)
        .with_context(|| format!("Failed to read raw export {}", raw.display()))?;

    let regions_input = regions
        .map(InputFile::new)
        .unwrap_or_else(|| config.inputs.regions.clone());
    let mut regions_loader = DataLoader::new().with_separator(regions_input.separator);
    let regions_df = regions_loader.load_table(&regions_input.path, &REGIONS)?;
    let mut report = LoadReport::new();
    let lookup = records::regions(regions_df, &mut report)?;
    report.log_summary();

    let mut options = config.wrangle.clone();
    options.rain_only |= rain_only;
    let (mut df, summary) = prepare_events(raw_df, &lookup, &options)?;
    if summary.output_rows == 0 {
        warn!("No events left after filtering");
    }
    write_csv(&mut df, output)?;
    Ok(())
}

fn run_merge_rain(
    config: &Config,
    inputs: Vec<PathBuf>,
    separator: Option<char>,
    output: &Path,
) -> Result<()> {
    let files: Vec<InputFile> = inputs
        .into_iter()
        .map(|path| InputFile { path, separator })
        .collect();
    let (mut df, summary) = merge_rainfall(&files, &config.dates.rainfall)?;
    if summary.unparsed_days > 0 {
        warn!("{} row(s) dropped for an unparseable DAY", summary.unparsed_days);
    }
    write_csv(&mut df, output)?;
    Ok(())
}
