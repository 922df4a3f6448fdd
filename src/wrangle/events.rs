//! Flood Event Preparation
//! Raw flood export + region codes -> canonical one-row-per-region file.

use super::WrangleError;
use crate::config::WrangleOptions;
use crate::data::schema::{columns, RAW_FLOOD_EXPORT};
use crate::data::text_column;
use crate::model::Region;
use log::{debug, info};
use polars::prelude::*;
use serde::Serialize;
use std::collections::HashMap;

/// Row counts of one preparation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreparedEventsSummary {
    pub input_rows: usize,
    pub filtered_rows: usize,
    pub output_rows: usize,
    /// Region codes with no usable coordinate in the lookup.
    pub unresolved_codes: usize,
}

/// Keep rows of the configured countries and year range.
fn filter_countries_and_years(raw: &DataFrame, options: &WrangleOptions) -> PolarsResult<DataFrame> {
    let in_country = options
        .countries
        .iter()
        .fold(lit(false), |acc, country| {
            acc.or(col(columns::COUNTRY).eq(lit(country.as_str())))
        });
    let year = col(columns::YEAR).cast(DataType::Float64);
    raw.clone()
        .lazy()
        .filter(
            in_country
                .and(year.clone().gt_eq(lit(f64::from(options.first_year))))
                .and(year.lt_eq(lit(f64::from(options.last_year)))),
        )
        .collect()
}

fn contains_rain(cause: Option<&str>) -> bool {
    cause.is_some_and(|cause| cause.to_lowercase().contains("rain"))
}

/// Build the canonical flood table from a raw export.
///
/// Each `;`-separated region code of an event becomes its own row carrying
/// the region's coordinate as `[lat, lon]`; codes without a coordinate are
/// dropped. Region lookup rows are restricted to the configured country
/// code prefixes.
pub fn prepare_events(
    raw: &DataFrame,
    regions: &[Region],
    options: &WrangleOptions,
) -> Result<(DataFrame, PreparedEventsSummary), WrangleError> {
    let missing = RAW_FLOOD_EXPORT.missing_columns(&raw.get_column_names());
    if !missing.is_empty() {
        return Err(WrangleError::MissingColumns(missing));
    }

    let lookup: HashMap<&str, &Region> = regions
        .iter()
        .filter(|region| {
            options
                .country_codes
                .iter()
                .any(|code| region.country_prefix() == code.as_str())
        })
        .map(|region| (region.code.as_str(), region))
        .collect();
    debug!("{} of {} regions in scope", lookup.len(), regions.len());

    let filtered = filter_countries_and_years(raw, options)?;
    let mut summary = PreparedEventsSummary {
        input_rows: raw.height(),
        filtered_rows: filtered.height(),
        ..Default::default()
    };

    let ids = text_column(&filtered, columns::ID)?;
    let years = text_column(&filtered, columns::YEAR)?;
    let countries = text_column(&filtered, columns::COUNTRY)?;
    let starts = text_column(&filtered, columns::START_DATE)?;
    let ends = text_column(&filtered, columns::END_DATE)?;
    let types = text_column(&filtered, columns::TYPE)?;
    let region_codes = text_column(&filtered, columns::RAW_REGIONS)?;
    let causes = text_column(&filtered, columns::CAUSE)?;
    let fatalities = text_column(&filtered, columns::FATALITIES)?;
    let losses = text_column(&filtered, columns::RAW_LOSSES)?;

    let mut out: Vec<[Option<String>; 11]> = Vec::new();
    for row in 0..filtered.height() {
        if options.rain_only && !contains_rain(causes[row].as_deref()) {
            continue;
        }
        let Some(codes) = region_codes[row].as_deref() else {
            continue;
        };
        for code in codes.split(';').map(str::trim).filter(|c| !c.is_empty()) {
            let Some(coordinate) = lookup.get(code).and_then(|region| region.coordinate) else {
                summary.unresolved_codes += 1;
                continue;
            };
            out.push([
                ids[row].clone(),
                years[row].clone(),
                countries[row].clone(),
                starts[row].clone(),
                ends[row].clone(),
                types[row].clone(),
                Some(format!("[{}, {}]", coordinate.latitude, coordinate.longitude)),
                Some(code.to_string()),
                causes[row].clone(),
                fatalities[row].clone(),
                losses[row].clone(),
            ]);
        }
    }
    summary.output_rows = out.len();

    let names = [
        columns::ID,
        columns::YEAR,
        columns::COUNTRY,
        columns::START_DATE,
        columns::END_DATE,
        columns::TYPE,
        columns::REGIONS,
        columns::REGION_CODE,
        columns::CAUSE,
        columns::FATALITIES,
        columns::LOSSES,
    ];
    let frame_columns = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let values: Vec<Option<String>> = out.iter().map(|row| row[i].clone()).collect();
            Column::new((*name).into(), values)
        })
        .collect();
    let df = DataFrame::new(frame_columns)?;

    info!(
        "Prepared {} event rows from {} raw rows ({} after filtering, {} unresolved region codes)",
        summary.output_rows, summary.input_rows, summary.filtered_rows, summary.unresolved_codes
    );
    Ok((df, summary))
}
