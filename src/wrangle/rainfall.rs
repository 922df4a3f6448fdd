//! Rainfall Merge
//! Concatenates several rainfall exports into one canonical file.

use super::WrangleError;
use crate::config::InputFile;
use crate::data::schema::{columns, RAINFALL};
use crate::data::{text_column, DataLoader};
use crate::pipeline::{parse_dates_with_fallback, TABLE_DATE_FORMAT};
use log::{info, warn};
use polars::prelude::*;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergedRainfallSummary {
    pub files: usize,
    pub input_rows: usize,
    /// Rows whose `DAY` could not be parsed; they are dropped.
    pub unparsed_days: usize,
    /// Repeated (day, grid) rows dropped in favour of the first one.
    pub duplicates: usize,
    pub output_rows: usize,
}

/// Rewrite `DAY` as `dd.mm.yyyy` and drop rows without a parseable day.
fn normalize_days(df: &DataFrame, date_formats: &[String]) -> Result<(DataFrame, usize), WrangleError> {
    let days = text_column(df, columns::DAY)?;
    let parsed = parse_dates_with_fallback(&days, date_formats);
    let formatted: Vec<Option<String>> = parsed
        .dates
        .iter()
        .map(|date| date.map(|d| d.format(TABLE_DATE_FORMAT).to_string()))
        .collect();
    let keep: Vec<bool> = formatted.iter().map(Option::is_some).collect();
    let dropped = keep.iter().filter(|k| !**k).count();

    let mut normalized = df.clone();
    normalized.with_column(Column::new(columns::DAY.into(), formatted))?;
    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    Ok((normalized.filter(&mask)?, dropped))
}

/// Keep the first row of every (day, grid) pair, preserving order.
fn drop_duplicate_pairs(df: &DataFrame) -> Result<(DataFrame, usize), WrangleError> {
    let days = text_column(df, columns::DAY)?;
    let grids = text_column(df, columns::GRID_NO)?;
    let mut seen = HashSet::with_capacity(df.height());
    let keep: Vec<bool> = days
        .into_iter()
        .zip(grids)
        .map(|pair| seen.insert(pair))
        .collect();
    let duplicates = keep.iter().filter(|k| !**k).count();
    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    Ok((df.filter(&mask)?, duplicates))
}

/// Read every export, normalise its dates and stack them.
///
/// Only the columns present in every file are kept, in the order of the
/// first file.
pub fn merge_rainfall(
    inputs: &[InputFile],
    date_formats: &[String],
) -> Result<(DataFrame, MergedRainfallSummary), WrangleError> {
    if inputs.is_empty() {
        return Err(WrangleError::NoInputs);
    }

    let mut summary = MergedRainfallSummary {
        files: inputs.len(),
        ..Default::default()
    };
    let mut frames = Vec::with_capacity(inputs.len());
    for input in inputs {
        let mut loader = DataLoader::new().with_separator(input.separator);
        let df = loader.load_table(&input.path, &RAINFALL)?;
        summary.input_rows += df.height();
        let (normalized, dropped) = normalize_days(df, date_formats)?;
        if dropped > 0 {
            warn!("{}: dropped {dropped} row(s) with an unparseable DAY", input.path.display());
        }
        summary.unparsed_days += dropped;
        frames.push(normalized);
    }

    let common: Vec<String> = frames[0]
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .filter(|name| {
            frames
                .iter()
                .all(|df| df.get_column_names().iter().any(|other| other.as_str() == name.as_str()))
        })
        .collect();
    let lazyframes: Vec<LazyFrame> = frames
        .into_iter()
        .map(|df| {
            df.lazy()
                .select(common.iter().map(|name| col(name.as_str())).collect::<Vec<_>>())
        })
        .collect();
    let stacked = concat(&lazyframes, UnionArgs::default())?.collect()?;

    let (merged, duplicates) = drop_duplicate_pairs(&stacked)?;
    summary.duplicates = duplicates;
    summary.output_rows = merged.height();
    info!(
        "Merged {} rainfall files into {} rows ({} duplicates dropped)",
        summary.files, summary.output_rows, summary.duplicates
    );
    Ok((merged, summary))
}
