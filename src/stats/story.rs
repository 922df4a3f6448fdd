//! Data Story
//! Long-term precipitation aggregates, temperature comparison and a
//! single-event close-up.

use super::calculator::{DescriptiveStats, StatsCalculator};
use crate::model::{DailyRainfallObservation, GlobalTemperature};
use crate::pipeline::{resample_with, Aggregation, Period, PipelineError, RollingMean};
use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// Monthly precipitation total with strict rolling means.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRow {
    /// Last day of the month.
    pub month: NaiveDate,
    pub precipitation: f64,
    /// Aligned with [`DataStory::windows`]; missing before the first full window.
    pub rolling_means: Vec<Option<f64>>,
}

/// Yearly total joined with the global temperature anomaly of that year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyRow {
    pub year: i32,
    pub precipitation: f64,
    /// Change to the previous joined year; missing for the first row.
    pub precipitation_delta: Option<f64>,
    pub temperature_anomaly: f64,
    pub temperature_lowess: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub precipitation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridDailyTotal {
    pub date: NaiveDate,
    pub grid_no: i64,
    pub precipitation: f64,
}

/// Inclusive date range of the event examined in detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl EventWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        (self.start..=self.end).contains(&date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataStory {
    pub windows: Vec<usize>,
    pub monthly: Vec<MonthlyRow>,
    pub yearly: Vec<YearlyRow>,
    /// Pearson correlation of yearly precipitation and the unsmoothed anomaly.
    pub temperature_correlation: Option<f64>,
    pub window: EventWindow,
    pub event_daily: Vec<DailyTotal>,
    pub event_by_grid: Vec<GridDailyTotal>,
    pub event_summary: DescriptiveStats,
}

fn monthly_rows(
    rainfall: &[DailyRainfallObservation],
    windows: &[usize],
) -> Result<Vec<MonthlyRow>, PipelineError> {
    let months = resample_with(rainfall, Period::Monthly, Aggregation::Sum);
    let totals: Vec<f64> = months.iter().map(|row| row.precipitation).collect();

    let means: Vec<Vec<Option<f64>>> = windows
        .par_iter()
        .map(|&window| RollingMean::strict(&totals, window).map(|rolling| rolling.iter().collect()))
        .collect::<Result<_, _>>()?;

    Ok(months
        .iter()
        .enumerate()
        .map(|(i, row)| MonthlyRow {
            month: row.date,
            precipitation: row.precipitation,
            rolling_means: means.iter().map(|series| series[i]).collect(),
        })
        .collect())
}

/// Inner join on year; years missing on either side are dropped.
fn yearly_rows(
    rainfall: &[DailyRainfallObservation],
    temperatures: &[GlobalTemperature],
) -> Vec<YearlyRow> {
    let by_year: BTreeMap<i32, &GlobalTemperature> =
        temperatures.iter().map(|t| (t.year, t)).collect();

    let joined: Vec<(i32, f64, &GlobalTemperature)> = resample_with(rainfall, Period::Yearly, Aggregation::Sum)
        .into_iter()
        .filter_map(|row| {
            let year = row.date.year();
            by_year.get(&year).map(|t| (year, row.precipitation, *t))
        })
        .collect();

    let totals: Vec<f64> = joined.iter().map(|(_, total, _)| *total).collect();
    joined
        .iter()
        .zip(StatsCalculator::deltas(&totals))
        .map(|((year, precipitation, temperature), precipitation_delta)| YearlyRow {
            year: *year,
            precipitation: *precipitation,
            precipitation_delta,
            temperature_anomaly: temperature.no_smoothing,
            temperature_lowess: temperature.lowess,
        })
        .collect()
}

fn event_totals(
    rainfall: &[DailyRainfallObservation],
    window: EventWindow,
) -> (Vec<DailyTotal>, Vec<GridDailyTotal>) {
    let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut by_grid: BTreeMap<(NaiveDate, i64), f64> = BTreeMap::new();
    for obs in rainfall.iter().filter(|obs| window.contains(obs.date)) {
        *daily.entry(obs.date).or_default() += obs.precipitation;
        *by_grid.entry((obs.date, obs.grid_no)).or_default() += obs.precipitation;
    }
    (
        daily
            .into_iter()
            .map(|(date, precipitation)| DailyTotal {
                date,
                precipitation,
            })
            .collect(),
        by_grid
            .into_iter()
            .map(|((date, grid_no), precipitation)| GridDailyTotal {
                date,
                grid_no,
                precipitation,
            })
            .collect(),
    )
}

/// Build every data-story table from the full rainfall record.
pub fn build_story(
    rainfall: &[DailyRainfallObservation],
    temperatures: &[GlobalTemperature],
    windows: &[usize],
    window: EventWindow,
) -> Result<DataStory, PipelineError> {
    let monthly = monthly_rows(rainfall, windows)?;
    let yearly = yearly_rows(rainfall, temperatures);

    let precipitation: Vec<f64> = yearly.iter().map(|row| row.precipitation).collect();
    let anomaly: Vec<f64> = yearly.iter().map(|row| row.temperature_anomaly).collect();
    let temperature_correlation = StatsCalculator::pearson_correlation(&precipitation, &anomaly);

    let (event_daily, event_by_grid) = event_totals(rainfall, window);
    let daily_values: Vec<f64> = event_daily.iter().map(|row| row.precipitation).collect();

    Ok(DataStory {
        windows: windows.to_vec(),
        monthly,
        yearly,
        temperature_correlation,
        window,
        event_summary: StatsCalculator::compute_descriptive_stats(&daily_values),
        event_daily,
        event_by_grid,
    })
}
