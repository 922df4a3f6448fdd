//! Record Conversion
//! Turns text frames into typed records, collecting per-row issues.

use super::loader::{optional_text_column, text_column, LoaderError};
use super::report::{IssueKind, LoadReport};
use super::schema::{columns, FLOOD_EVENTS, GLOBAL_TEMPERATURE, RAINFALL, REGIONS};
use crate::model::{Coordinate, DailyRainfallObservation, FloodEvent, GlobalTemperature, Region};
use crate::pipeline::{extract_coordinates, parse_dates_with_fallback, CoordinateEncoding, ParsedDates};
use log::debug;
use polars::prelude::*;

/// Parse a numeric cell. Accepts a decimal comma when no dot is present.
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    let value = match text.parse::<f64>() {
        Ok(value) => value,
        Err(_) if !text.contains('.') && text.matches(',').count() == 1 => {
            text.replace(',', ".").parse::<f64>().ok()?
        }
        Err(_) => return None,
    };
    value.is_finite().then_some(value)
}

/// Parse an integer cell, tolerating a `.0` suffix from float exports.
pub fn parse_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    text.parse::<i64>().ok().or_else(|| {
        parse_number(text)
            .filter(|value| value.fract() == 0.0 && value.abs() < i64::MAX as f64)
            .map(|value| value as i64)
    })
}

/// Numeric column with invalid cells recorded and left missing.
fn number_column(
    cells: &[Option<String>],
    table: &str,
    column: &str,
    report: &mut LoadReport,
) -> Vec<Option<f64>> {
    cells
        .iter()
        .enumerate()
        .map(|(row, cell)| {
            let text = cell.as_deref()?;
            let value = parse_number(text);
            if value.is_none() {
                report.record(
                    table,
                    row,
                    IssueKind::InvalidNumber {
                        column: column.to_string(),
                        value: text.to_string(),
                    },
                );
            }
            value
        })
        .collect()
}

fn date_column(
    cells: &[Option<String>],
    formats: &[String],
    table: &str,
    column: &str,
    report: &mut LoadReport,
) -> ParsedDates {
    let parsed = parse_dates_with_fallback(cells, formats);
    debug!("{table}.{column} resolved as {:?}", parsed.resolution);
    for &row in &parsed.unparsed {
        report.record(
            table,
            row,
            IssueKind::UnparseableDate {
                column: column.to_string(),
                value: cells[row].clone().unwrap_or_default(),
            },
        );
    }
    parsed
}

fn coordinate_column(
    cells: &[Option<String>],
    table: &str,
    report: &mut LoadReport,
) -> Vec<Option<Coordinate>> {
    let extracted = extract_coordinates(cells, CoordinateEncoding::Bracketed);
    for malformed in &extracted.malformed {
        report.record(
            table,
            malformed.row,
            IssueKind::MalformedCoordinate {
                value: malformed.value.clone(),
                reason: malformed.error.to_string(),
            },
        );
    }
    (0..extracted.len())
        .map(|row| extracted.coordinate(row))
        .collect()
}

/// Flood events. Rows without a valid year are dropped; every other
/// problem leaves the affected field missing.
pub fn flood_events(
    df: &DataFrame,
    date_formats: &[String],
    report: &mut LoadReport,
) -> Result<Vec<FloodEvent>, LoaderError> {
    let table = FLOOD_EVENTS.name;
    let ids = text_column(df, columns::ID)?;
    let years = text_column(df, columns::YEAR)?;
    let countries = text_column(df, columns::COUNTRY)?;
    let start_cells = text_column(df, columns::START_DATE)?;
    let end_cells = text_column(df, columns::END_DATE)?;
    let locations = text_column(df, columns::REGIONS)?;
    let causes = text_column(df, columns::CAUSE)?;
    let fatalities_cells = text_column(df, columns::FATALITIES)?;
    let losses_cells = text_column(df, columns::LOSSES)?;
    let types = optional_text_column(df, columns::TYPE)?;
    let codes = optional_text_column(df, columns::REGION_CODE)?;

    let starts = date_column(&start_cells, date_formats, table, columns::START_DATE, report);
    let ends = date_column(&end_cells, date_formats, table, columns::END_DATE, report);
    let coordinates = coordinate_column(&locations, table, report);
    let fatalities = number_column(&fatalities_cells, table, columns::FATALITIES, report);
    let losses = number_column(&losses_cells, table, columns::LOSSES, report);

    let mut events = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let year_text = years[row].as_deref().unwrap_or_default();
        let Some(year) = parse_integer(year_text).and_then(|y| i32::try_from(y).ok()) else {
            report.record(
                table,
                row,
                IssueKind::InvalidNumber {
                    column: columns::YEAR.to_string(),
                    value: year_text.to_string(),
                },
            );
            continue;
        };

        let event = FloodEvent {
            id: ids[row].clone().unwrap_or_default(),
            year,
            country: countries[row].clone().unwrap_or_default(),
            region_code: codes[row].clone(),
            location: locations[row].clone(),
            event_type: types[row].clone(),
            start_date: starts.dates[row],
            end_date: ends.dates[row],
            cause: causes[row].clone(),
            fatalities: fatalities[row],
            losses_mln_eur: losses[row],
            coordinate: coordinates[row],
        };
        if let (Some(start), Some(end)) = (event.start_date, event.end_date) {
            if start > end {
                report.record(table, row, IssueKind::InvertedDateRange);
            }
        }
        events.push(event);
    }
    Ok(events)
}

/// Rainfall observations, sorted by (date, grid) with duplicates averaged.
///
/// Rows without a usable date, grid number or precipitation are dropped.
pub fn rainfall_observations(
    df: &DataFrame,
    date_formats: &[String],
    report: &mut LoadReport,
) -> Result<Vec<DailyRainfallObservation>, LoaderError> {
    let table = RAINFALL.name;
    let day_cells = text_column(df, columns::DAY)?;
    let grid_cells = text_column(df, columns::GRID_NO)?;
    let precipitation_cells = text_column(df, columns::PRECIPITATION)?;
    let temperature_cells = optional_text_column(df, columns::TEMPERATURE_AVG)?;
    let latitude_cells = optional_text_column(df, columns::LATITUDE)?;
    let longitude_cells = optional_text_column(df, columns::LONGITUDE)?;

    let days = date_column(&day_cells, date_formats, table, columns::DAY, report);
    let temperatures = number_column(&temperature_cells, table, columns::TEMPERATURE_AVG, report);
    let latitudes = number_column(&latitude_cells, table, columns::LATITUDE, report);
    let longitudes = number_column(&longitude_cells, table, columns::LONGITUDE, report);

    let mut rows = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let Some(date) = days.dates[row] else {
            continue;
        };

        let grid_text = grid_cells[row].as_deref().unwrap_or_default();
        let Some(grid_no) = parse_integer(grid_text) else {
            report.record(
                table,
                row,
                IssueKind::InvalidNumber {
                    column: columns::GRID_NO.to_string(),
                    value: grid_text.to_string(),
                },
            );
            continue;
        };

        let precipitation_text = precipitation_cells[row].as_deref().unwrap_or_default();
        let precipitation = match parse_number(precipitation_text) {
            Some(value) if value < 0.0 => {
                report.record(
                    table,
                    row,
                    IssueKind::NegativePrecipitation {
                        value: precipitation_text.to_string(),
                    },
                );
                continue;
            }
            Some(value) => value,
            None => {
                report.record(
                    table,
                    row,
                    IssueKind::InvalidNumber {
                        column: columns::PRECIPITATION.to_string(),
                        value: precipitation_text.to_string(),
                    },
                );
                continue;
            }
        };

        let coordinate = match (latitudes[row], longitudes[row]) {
            (Some(latitude), Some(longitude)) => {
                let coordinate = Coordinate::new(latitude, longitude);
                if coordinate.is_none() {
                    report.record(
                        table,
                        row,
                        IssueKind::MalformedCoordinate {
                            value: format!("{latitude}, {longitude}"),
                            reason: "out of range".to_string(),
                        },
                    );
                }
                coordinate
            }
            _ => None,
        };

        rows.push((
            row,
            DailyRainfallObservation {
                date,
                grid_no,
                precipitation,
                temperature_avg: temperatures[row],
                coordinate,
            },
        ));
    }

    Ok(deduplicate_observations(rows, report))
}

/// Sort by (date, grid) and average repeated pairs into one observation.
///
/// Each input carries its source row so duplicates can be reported.
pub fn deduplicate_observations(
    mut rows: Vec<(usize, DailyRainfallObservation)>,
    report: &mut LoadReport,
) -> Vec<DailyRainfallObservation> {
    rows.sort_by_key(|(row, obs)| (obs.date, obs.grid_no, *row));

    let mut observations: Vec<DailyRainfallObservation> = Vec::with_capacity(rows.len());
    let mut group_len = 0usize;
    let mut temperature_count = 0usize;
    for (row, obs) in rows {
        match observations.last_mut() {
            Some(last) if last.date == obs.date && last.grid_no == obs.grid_no => {
                report.record(RAINFALL.name, row, IssueKind::DuplicateObservation);
                group_len += 1;
                // running means over the group
                last.precipitation += (obs.precipitation - last.precipitation) / group_len as f64;
                if let Some(temperature) = obs.temperature_avg {
                    temperature_count += 1;
                    let current = last.temperature_avg.unwrap_or(temperature);
                    last.temperature_avg =
                        Some(current + (temperature - current) / temperature_count as f64);
                }
                if last.coordinate.is_none() {
                    last.coordinate = obs.coordinate;
                }
            }
            _ => {
                group_len = 1;
                temperature_count = usize::from(obs.temperature_avg.is_some());
                observations.push(obs);
            }
        }
    }
    observations
}

/// Region lookup rows. Rows without a code are dropped.
pub fn regions(df: &DataFrame, report: &mut LoadReport) -> Result<Vec<Region>, LoaderError> {
    let codes = text_column(df, columns::CODE)?;
    let names = text_column(df, columns::NAME)?;
    let coordinate_cells = text_column(df, columns::COORDINATES)?;
    let coordinates = coordinate_column(&coordinate_cells, REGIONS.name, report);

    Ok((0..df.height())
        .filter_map(|row| {
            Some(Region {
                code: codes[row].clone()?,
                name: names[row].clone().unwrap_or_default(),
                coordinate: coordinates[row],
            })
        })
        .collect())
}

/// Global temperature rows sorted by year. Rows without a year or an
/// unsmoothed anomaly are dropped.
pub fn global_temperatures(
    df: &DataFrame,
    report: &mut LoadReport,
) -> Result<Vec<GlobalTemperature>, LoaderError> {
    let table = GLOBAL_TEMPERATURE.name;
    let years = text_column(df, columns::TEMP_YEAR)?;
    let anomalies = number_column(
        &text_column(df, columns::NO_SMOOTHING)?,
        table,
        columns::NO_SMOOTHING,
        report,
    );
    let smoothed = number_column(
        &optional_text_column(df, columns::LOWESS)?,
        table,
        columns::LOWESS,
        report,
    );

    let mut temperatures = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let year_text = years[row].as_deref().unwrap_or_default();
        let Some(year) = parse_integer(year_text).and_then(|y| i32::try_from(y).ok()) else {
            report.record(
                table,
                row,
                IssueKind::InvalidNumber {
                    column: columns::TEMP_YEAR.to_string(),
                    value: year_text.to_string(),
                },
            );
            continue;
        };
        let Some(no_smoothing) = anomalies[row] else {
            continue;
        };
        temperatures.push(GlobalTemperature {
            year,
            no_smoothing,
            lowess: smoothed[row],
        });
    }
    temperatures.sort_by_key(|t| t.year);
    Ok(temperatures)
}
