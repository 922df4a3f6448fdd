//! Base Tables
//! The immutable inputs every dashboard query is derived from.

use super::loader::{DataLoader, LoaderError};
use super::records;
use super::report::LoadReport;
use super::schema::{TableSchema, FLOOD_EVENTS, GLOBAL_TEMPERATURE, RAINFALL, REGIONS};
use crate::config::{Config, InputFile};
use crate::model::{DailyRainfallObservation, FloodEvent, GlobalTemperature, Region};
use crate::pipeline::{join_events_to_regions, EnrichedEvent, JoinOptions};
use log::info;
use polars::prelude::DataFrame;

/// Loaded once at startup and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct BaseTables {
    events: Vec<EnrichedEvent>,
    rainfall: Vec<DailyRainfallObservation>,
    regions: Vec<Region>,
    global_temperature: Vec<GlobalTemperature>,
    report: LoadReport,
}

fn load_frame(input: &InputFile, schema: &TableSchema) -> Result<DataFrame, LoaderError> {
    let mut loader = DataLoader::new().with_separator(input.separator);
    let df = loader.load_table(&input.path, schema)?;
    info!(
        "Loaded {} rows from {} as {}",
        df.height(),
        input.path.display(),
        schema.name
    );
    Ok(df.clone())
}

impl BaseTables {
    /// Read every configured input. Missing files, empty tables and schema
    /// mismatches are fatal; row-level problems end up in the report.
    pub fn load(config: &Config) -> Result<Self, LoaderError> {
        let mut report = LoadReport::new();

        let events_df = load_frame(&config.inputs.flood_events, &FLOOD_EVENTS)?;
        let events = records::flood_events(&events_df, &config.dates.events, &mut report)?;

        let rainfall_df = load_frame(&config.inputs.rainfall, &RAINFALL)?;
        let rainfall =
            records::rainfall_observations(&rainfall_df, &config.dates.rainfall, &mut report)?;

        let regions_df = load_frame(&config.inputs.regions, &REGIONS)?;
        let regions = records::regions(&regions_df, &mut report)?;

        let global_temperature = match &config.inputs.global_temperature {
            Some(input) => {
                let df = load_frame(input, &GLOBAL_TEMPERATURE)?;
                records::global_temperatures(&df, &mut report)?
            }
            None => {
                info!("No global temperature file configured");
                Vec::new()
            }
        };

        Ok(Self::from_parts(
            events,
            rainfall,
            regions,
            global_temperature,
            &config.join,
            report,
        ))
    }

    /// Assemble base tables from already typed records.
    ///
    /// Rainfall is sorted by (date, grid); events are joined onto the
    /// region lookup once so queries never repeat the join.
    pub fn from_parts(
        events: Vec<FloodEvent>,
        mut rainfall: Vec<DailyRainfallObservation>,
        regions: Vec<Region>,
        mut global_temperature: Vec<GlobalTemperature>,
        join: &JoinOptions,
        report: LoadReport,
    ) -> Self {
        rainfall.sort_by_key(|obs| (obs.date, obs.grid_no));
        global_temperature.sort_by_key(|t| t.year);
        let events = join_events_to_regions(&events, &regions, join);
        Self {
            events,
            rainfall,
            regions,
            global_temperature,
            report,
        }
    }

    pub fn events(&self) -> &[EnrichedEvent] {
        &self.events
    }

    /// Observations sorted by (date, grid).
    pub fn rainfall(&self) -> &[DailyRainfallObservation] {
        &self.rainfall
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Sorted by year; empty when no temperature file was configured.
    pub fn global_temperature(&self) -> &[GlobalTemperature] {
        &self.global_temperature
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    /// Distinct event years, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.events.iter().map(|e| e.event.year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }
}
