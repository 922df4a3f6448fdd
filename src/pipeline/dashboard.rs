//! Dashboard Derivation
//! Pure `(base tables, query) -> derived tables` for the renderer.

use super::flood_flag::{flag_flood_period, FloodIntervals, FloodPeriodFlag};
use super::join::EnrichedEvent;
use super::resample::{resample_by_period, Period};
use super::rolling::RollingMean;
use super::tables::{damage_table, flood_table, map_points, DamageRow, FloodTableRow, MapPoint};
use super::PipelineError;
use crate::config::{BoundingBox, Config};
use crate::data::BaseTables;
use crate::model::DailyRainfallObservation;
use crate::stats::{DescriptiveStats, StatsCalculator};
use chrono::{Datelike, NaiveDate};
use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// The parameter tuple the renderer sends for every redraw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardQuery {
    pub year: i32,
    pub country: Option<String>,
    pub timeframe: Period,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSettings {
    pub rolling_windows: Vec<usize>,
    pub cumulative_start_year: i32,
    pub country_bounds: BTreeMap<String, BoundingBox>,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for DashboardSettings {
    fn from(config: &Config) -> Self {
        Self {
            rolling_windows: config.series.rolling_windows.clone(),
            cumulative_start_year: config.series.cumulative_start_year,
            country_bounds: config.countries.clone(),
        }
    }
}

/// One resampled period with its rolling means and flood flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedRow {
    pub date: NaiveDate,
    pub precipitation: f64,
    pub temperature_avg: Option<f64>,
    /// Aligned with [`DerivedSeries::windows`].
    pub rolling_means: Vec<Option<f64>>,
    pub flood_period: FloodPeriodFlag,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedSeries {
    pub timeframe: Period,
    pub windows: Vec<usize>,
    pub rows: Vec<DerivedRow>,
}

impl DerivedSeries {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Everything the renderer draws for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardTables {
    pub query: DashboardQuery,
    pub events: Vec<EnrichedEvent>,
    pub flood_table: Vec<FloodTableRow>,
    pub damage_table: Vec<DamageRow>,
    pub map_points: Vec<MapPoint>,
    pub rainfall: DerivedSeries,
    pub cumulative: DerivedSeries,
    /// Countries with events in the selected year, in first-seen order.
    pub countries: Vec<String>,
    pub precipitation_summary: DescriptiveStats,
    pub no_data: bool,
}

/// Restrict rainfall to the country's extent.
///
/// Without a country, or without configured bounds for it, the input is
/// returned unchanged. Observations without a coordinate cannot be placed
/// and are dropped whenever bounds apply.
fn scope_rainfall<'a>(
    rainfall: &'a [DailyRainfallObservation],
    country: Option<&str>,
    bounds: &BTreeMap<String, BoundingBox>,
) -> Cow<'a, [DailyRainfallObservation]> {
    let Some(country) = country else {
        return Cow::Borrowed(rainfall);
    };
    let Some(bounds) = bounds.get(country) else {
        warn!("No bounds configured for {country}, rainfall left unfiltered");
        return Cow::Borrowed(rainfall);
    };
    Cow::Owned(
        rainfall
            .iter()
            .filter(|obs| obs.coordinate.is_some_and(|c| bounds.contains(&c)))
            .cloned()
            .collect(),
    )
}

/// Observations whose year lies in `first..=last`. Input must be date-sorted.
fn years_between(
    rainfall: &[DailyRainfallObservation],
    first: i32,
    last: i32,
) -> &[DailyRainfallObservation] {
    let from = rainfall.partition_point(|obs| obs.date.year() < first);
    let to = rainfall.partition_point(|obs| obs.date.year() <= last);
    &rainfall[from..to.max(from)]
}

fn derive_series(
    rainfall: &[DailyRainfallObservation],
    timeframe: Period,
    windows: &[usize],
    intervals: &FloodIntervals,
) -> Result<DerivedSeries, PipelineError> {
    let periods = resample_by_period(rainfall, timeframe);
    let values: Vec<f64> = periods.iter().map(|row| row.precipitation).collect();

    let means: Vec<Vec<Option<f64>>> = windows
        .par_iter()
        .map(|&window| RollingMean::new(&values, window).map(|rolling| rolling.iter().collect()))
        .collect::<Result<_, _>>()?;

    let dates: Vec<NaiveDate> = periods.iter().map(|row| row.date).collect();
    let flags = flag_flood_period(&dates, intervals);

    let rows = periods
        .into_iter()
        .zip(flags)
        .enumerate()
        .map(|(i, (period, flood_period))| DerivedRow {
            date: period.date,
            precipitation: period.precipitation,
            temperature_avg: period.temperature_avg,
            rolling_means: means.iter().map(|series| series[i]).collect(),
            flood_period,
        })
        .collect();

    Ok(DerivedSeries {
        timeframe,
        windows: windows.to_vec(),
        rows,
    })
}

/// Derive all dashboard tables for one query.
///
/// Never fails on an empty selection: a year or country without events
/// yields empty tables and `no_data`. Errors only come from invalid
/// settings such as a zero rolling window.
pub fn derive_dashboard(
    base: &BaseTables,
    query: &DashboardQuery,
    settings: &DashboardSettings,
) -> Result<DashboardTables, PipelineError> {
    let year_events: Vec<&EnrichedEvent> = base
        .events()
        .iter()
        .filter(|e| e.event.year == query.year)
        .collect();

    let mut countries: Vec<String> = Vec::new();
    for event in &year_events {
        if !countries.contains(&event.event.country) {
            countries.push(event.event.country.clone());
        }
    }

    let selected: Vec<&EnrichedEvent> = year_events
        .into_iter()
        .filter(|e| {
            query
                .country
                .as_deref()
                .map_or(true, |country| e.event.country == country)
        })
        .collect();
    let intervals = FloodIntervals::from_events(selected.iter().map(|e| &e.event));

    let scoped = scope_rainfall(
        base.rainfall(),
        query.country.as_deref(),
        &settings.country_bounds,
    );
    let year_rain = years_between(&scoped, query.year, query.year);
    let cumulative_rain = years_between(&scoped, settings.cumulative_start_year, query.year);

    let rainfall = derive_series(
        year_rain,
        query.timeframe,
        &settings.rolling_windows,
        &intervals,
    )?;
    let cumulative = derive_series(
        cumulative_rain,
        query.timeframe,
        &settings.rolling_windows,
        &intervals,
    )?;

    let precipitation: Vec<f64> = year_rain.iter().map(|obs| obs.precipitation).collect();
    let no_data = selected.is_empty();
    debug!(
        "Query {}/{:?}/{}: {} events, {} rainfall rows",
        query.year,
        query.country,
        query.timeframe,
        selected.len(),
        year_rain.len()
    );

    Ok(DashboardTables {
        query: query.clone(),
        flood_table: flood_table(&selected, &scoped),
        damage_table: damage_table(&selected),
        map_points: map_points(&selected),
        events: selected.into_iter().cloned().collect(),
        rainfall,
        cumulative,
        countries,
        precipitation_summary: StatsCalculator::compute_descriptive_stats(&precipitation),
        no_data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::LoadReport;
    use crate::model::{Coordinate, FloodEvent, Region};
    use crate::pipeline::JoinOptions;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn event(id: &str, year: i32, country: &str, start: NaiveDate, end: NaiveDate) -> FloodEvent {
        FloodEvent {
            id: id.to_string(),
            year,
            country: country.to_string(),
            region_code: None,
            location: Some("[46.9, 7.4]".to_string()),
            event_type: None,
            start_date: Some(start),
            end_date: Some(end),
            cause: Some("Heavy rain".to_string()),
            fatalities: Some(1.0),
            losses_mln_eur: Some(250.0),
            coordinate: Coordinate::new(46.9, 7.4),
        }
    }

    fn rain(date: NaiveDate, grid_no: i64, precipitation: f64, lat: f64, lon: f64) -> DailyRainfallObservation {
        DailyRainfallObservation {
            date,
            grid_no,
            precipitation,
            temperature_avg: None,
            coordinate: Coordinate::new(lat, lon),
        }
    }

    fn base() -> BaseTables {
        let events = vec![
            event("1", 2005, "Switzerland", d(2005, 8, 21), d(2005, 8, 23)),
            event("2", 2005, "Austria", d(2005, 8, 22), d(2005, 8, 24)),
            event("3", 2004, "Switzerland", d(2004, 7, 1), d(2004, 7, 2)),
        ];
        let mut rainfall = Vec::new();
        for day in 19..=25 {
            rainfall.push(rain(d(2005, 8, day), 1, f64::from(day) - 18.0, 46.9, 7.4));
            rainfall.push(rain(d(2005, 8, day), 2, 100.0, 47.5, 14.0));
        }
        rainfall.push(rain(d(2004, 7, 1), 1, 4.0, 46.9, 7.4));
        let regions = vec![Region {
            code: "CH021".to_string(),
            name: "Bern".to_string(),
            coordinate: Coordinate::new(46.9, 7.4),
        }];
        BaseTables::from_parts(
            events,
            rainfall,
            regions,
            Vec::new(),
            &JoinOptions::default(),
            LoadReport::new(),
        )
    }

    fn settings() -> DashboardSettings {
        DashboardSettings {
            cumulative_start_year: 2004,
            ..DashboardSettings::default()
        }
    }

    #[test]
    fn test_country_query_scopes_events_and_rainfall() {
        let query = DashboardQuery {
            year: 2005,
            country: Some("Switzerland".to_string()),
            timeframe: Period::Daily,
        };
        let tables = derive_dashboard(&base(), &query, &settings()).unwrap();

        assert!(!tables.no_data);
        assert_eq!(tables.countries, vec!["Switzerland", "Austria"]);
        assert_eq!(tables.events.len(), 1);
        assert_eq!(tables.flood_table[0].location, "Bern");
        // grid 1 only: 3 + 4 + 5 over 21..=23 August
        assert_eq!(tables.flood_table[0].precipitation_mm, Some(12.0));
        assert_eq!(tables.map_points[0].marker_size, 25.0);

        let rows = &tables.rainfall.rows;
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0].precipitation, 1.0);
        assert_eq!(rows[0].flood_period, FloodPeriodFlag::Rainfall);
        assert_eq!(rows[2].flood_period, FloodPeriodFlag::Flood);
        assert_eq!(rows[5].flood_period, FloodPeriodFlag::Rainfall);
        assert_eq!(rows[4].rolling_means, vec![Some(3.0)]);
        assert_eq!(tables.cumulative.rows.len(), 8);
        assert_eq!(tables.precipitation_summary.count, 7);
    }

    #[test]
    fn test_all_countries_flags_union_of_intervals() {
        let query = DashboardQuery {
            year: 2005,
            country: None,
            timeframe: Period::Daily,
        };
        let tables = derive_dashboard(&base(), &query, &settings()).unwrap();
        assert_eq!(tables.events.len(), 2);
        let flagged: Vec<bool> = tables
            .rainfall
            .rows
            .iter()
            .map(|row| row.flood_period.is_flood())
            .collect();
        assert_eq!(flagged, vec![false, false, true, true, true, true, false]);
        // both grids averaged per day
        assert_eq!(tables.rainfall.rows[0].precipitation, 50.5);
    }

    #[test]
    fn test_empty_selection_sets_no_data() {
        let query = DashboardQuery {
            year: 2005,
            country: Some("Monaco".to_string()),
            timeframe: Period::Weekly,
        };
        let tables = derive_dashboard(&base(), &query, &settings()).unwrap();
        assert!(tables.no_data);
        assert!(tables.events.is_empty());
        assert!(tables.flood_table.is_empty());
        assert!(tables.damage_table.is_empty());
        assert!(tables.rainfall.is_empty());
    }

    #[test]
    fn test_zero_window_is_an_error() {
        let query = DashboardQuery {
            year: 2005,
            country: None,
            timeframe: Period::Monthly,
        };
        let bad = DashboardSettings {
            rolling_windows: vec![0],
            ..settings()
        };
        assert_eq!(
            derive_dashboard(&base(), &query, &bad).unwrap_err(),
            PipelineError::ZeroWindow
        );
    }
}
