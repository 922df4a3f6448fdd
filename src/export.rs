//! Export Module
//! Writes derived tables as CSV (Polars) or JSON (serde_json).

use crate::pipeline::{DamageRow, DashboardTables, DerivedSeries, EnrichedEvent, FloodTableRow, MapPoint};
use crate::stats::{DailyTotal, DataStory, GridDailyTotal, MonthlyRow, YearlyRow};
use log::info;
use polars::prelude::*;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Date format of exported series; ISO so renderers sort it as text.
pub const EXPORT_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to build table: {0}")]
    Polars(#[from] PolarsError),
    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> ExportError + '_ {
    move |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write a frame as comma-separated CSV with a header row.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let mut file = File::create(path).map_err(io_error(path))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(df)?;
    info!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

/// Pretty-printed JSON to `path`, or to stdout when no path is given.
pub fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> Result<(), ExportError> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(io_error(path))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush().map_err(io_error(path))?;
            info!("Wrote {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            serde_json::to_writer_pretty(&mut handle, value)?;
            writeln!(handle).map_err(io_error(Path::new("<stdout>")))?;
        }
    }
    Ok(())
}

pub fn events_frame(events: &[EnrichedEvent]) -> PolarsResult<DataFrame> {
    let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.format(EXPORT_DATE_FORMAT).to_string());
    DataFrame::new(vec![
        Column::new("ID".into(), events.iter().map(|e| e.event.id.clone()).collect::<Vec<_>>()),
        Column::new("Year".into(), events.iter().map(|e| e.event.year).collect::<Vec<_>>()),
        Column::new(
            "Country name".into(),
            events.iter().map(|e| e.event.country.clone()).collect::<Vec<_>>(),
        ),
        Column::new(
            "Start date".into(),
            events.iter().map(|e| date(e.event.start_date)).collect::<Vec<_>>(),
        ),
        Column::new(
            "End date".into(),
            events.iter().map(|e| date(e.event.end_date)).collect::<Vec<_>>(),
        ),
        Column::new(
            "Region".into(),
            events
                .iter()
                .map(|e| e.region_name().map(str::to_string))
                .collect::<Vec<_>>(),
        ),
        Column::new(
            "Region code".into(),
            events
                .iter()
                .map(|e| e.region.as_ref().map(|r| r.code.clone()))
                .collect::<Vec<_>>(),
        ),
        Column::new(
            "Latitude".into(),
            events
                .iter()
                .map(|e| e.event.coordinate.map(|c| c.latitude))
                .collect::<Vec<_>>(),
        ),
        Column::new(
            "Longitude".into(),
            events
                .iter()
                .map(|e| e.event.coordinate.map(|c| c.longitude))
                .collect::<Vec<_>>(),
        ),
        Column::new(
            "Cause".into(),
            events.iter().map(|e| e.event.cause.clone()).collect::<Vec<_>>(),
        ),
        Column::new(
            "Fatalities".into(),
            events.iter().map(|e| e.event.fatalities).collect::<Vec<_>>(),
        ),
        Column::new(
            "Losses (mln EUR, 2020)".into(),
            events.iter().map(|e| e.event.losses_mln_eur).collect::<Vec<_>>(),
        ),
        Column::new(
            "Matched by".into(),
            events
                .iter()
                .map(|e| format!("{:?}", e.matched_by))
                .collect::<Vec<_>>(),
        ),
    ])
}

/// Series with one `rolling_mean_<w>` column per window and the flood flag label.
pub fn series_frame(series: &DerivedSeries) -> PolarsResult<DataFrame> {
    let rows = &series.rows;
    let mut columns = vec![
        Column::new(
            "DAY".into(),
            rows.iter()
                .map(|r| r.date.format(EXPORT_DATE_FORMAT).to_string())
                .collect::<Vec<_>>(),
        ),
        Column::new(
            "PRECIPITATION".into(),
            rows.iter().map(|r| r.precipitation).collect::<Vec<_>>(),
        ),
        Column::new(
            "TEMPERATURE_AVG".into(),
            rows.iter().map(|r| r.temperature_avg).collect::<Vec<_>>(),
        ),
    ];
    for (i, window) in series.windows.iter().enumerate() {
        columns.push(Column::new(
            format!("rolling_mean_{window}").into(),
            rows.iter()
                .map(|r| r.rolling_means.get(i).copied().flatten())
                .collect::<Vec<_>>(),
        ));
    }
    columns.push(Column::new(
        "In_Flood_Period".into(),
        rows.iter()
            .map(|r| r.flood_period.label().to_string())
            .collect::<Vec<_>>(),
    ));
    DataFrame::new(columns)
}

pub fn flood_table_frame(rows: &[FloodTableRow]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Column::new("location".into(), rows.iter().map(|r| r.location.clone()).collect::<Vec<_>>()),
        Column::new(
            "Start date".into(),
            rows.iter().map(|r| r.start_date.clone()).collect::<Vec<_>>(),
        ),
        Column::new(
            "End date".into(),
            rows.iter().map(|r| r.end_date.clone()).collect::<Vec<_>>(),
        ),
        Column::new(
            "Precipitation (mm)".into(),
            rows.iter().map(|r| r.precipitation_mm).collect::<Vec<_>>(),
        ),
    ])
}

pub fn damage_table_frame(rows: &[DamageRow]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Column::new(
            "Fatalities".into(),
            rows.iter().map(|r| r.fatalities.clone()).collect::<Vec<_>>(),
        ),
        Column::new(
            "Losses (mln EUR, 2020)".into(),
            rows.iter().map(|r| r.losses.clone()).collect::<Vec<_>>(),
        ),
        Column::new("location".into(), rows.iter().map(|r| r.locations.clone()).collect::<Vec<_>>()),
    ])
}

pub fn map_points_frame(points: &[MapPoint]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Column::new("Name".into(), points.iter().map(|p| p.name.clone()).collect::<Vec<_>>()),
        Column::new("Latitude".into(), points.iter().map(|p| p.latitude).collect::<Vec<_>>()),
        Column::new("Longitude".into(), points.iter().map(|p| p.longitude).collect::<Vec<_>>()),
        Column::new(
            "marker_size".into(),
            points.iter().map(|p| p.marker_size).collect::<Vec<_>>(),
        ),
    ])
}

pub fn monthly_frame(rows: &[MonthlyRow], windows: &[usize]) -> PolarsResult<DataFrame> {
    let mut columns = vec![
        Column::new(
            "DAY".into(),
            rows.iter()
                .map(|r| r.month.format(EXPORT_DATE_FORMAT).to_string())
                .collect::<Vec<_>>(),
        ),
        Column::new(
            "PRECIPITATION".into(),
            rows.iter().map(|r| r.precipitation).collect::<Vec<_>>(),
        ),
    ];
    for (i, window) in windows.iter().enumerate() {
        columns.push(Column::new(
            format!("precipitation_moving_avg_{window}_months").into(),
            rows.iter()
                .map(|r| r.rolling_means.get(i).copied().flatten())
                .collect::<Vec<_>>(),
        ));
    }
    DataFrame::new(columns)
}

pub fn yearly_frame(rows: &[YearlyRow]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Column::new("YEAR".into(), rows.iter().map(|r| r.year).collect::<Vec<_>>()),
        Column::new(
            "PRECIPITATION".into(),
            rows.iter().map(|r| r.precipitation).collect::<Vec<_>>(),
        ),
        Column::new(
            "PRECIPITATION_DELTA".into(),
            rows.iter().map(|r| r.precipitation_delta).collect::<Vec<_>>(),
        ),
        Column::new(
            "No_Smoothing".into(),
            rows.iter().map(|r| r.temperature_anomaly).collect::<Vec<_>>(),
        ),
        Column::new(
            "Lowess(5)".into(),
            rows.iter().map(|r| r.temperature_lowess).collect::<Vec<_>>(),
        ),
    ])
}

pub fn daily_totals_frame(rows: &[DailyTotal]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Column::new(
            "DAY".into(),
            rows.iter()
                .map(|r| r.date.format(EXPORT_DATE_FORMAT).to_string())
                .collect::<Vec<_>>(),
        ),
        Column::new(
            "PRECIPITATION".into(),
            rows.iter().map(|r| r.precipitation).collect::<Vec<_>>(),
        ),
    ])
}

pub fn grid_totals_frame(rows: &[GridDailyTotal]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Column::new(
            "DAY".into(),
            rows.iter()
                .map(|r| r.date.format(EXPORT_DATE_FORMAT).to_string())
                .collect::<Vec<_>>(),
        ),
        Column::new("GRID_NO".into(), rows.iter().map(|r| r.grid_no).collect::<Vec<_>>()),
        Column::new(
            "PRECIPITATION".into(),
            rows.iter().map(|r| r.precipitation).collect::<Vec<_>>(),
        ),
    ])
}

/// One CSV per dashboard table in `dir`. Returns the written paths.
pub fn write_dashboard_csv(tables: &DashboardTables, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    let frames = [
        ("events.csv", events_frame(&tables.events)?),
        ("flood_table.csv", flood_table_frame(&tables.flood_table)?),
        ("damage_table.csv", damage_table_frame(&tables.damage_table)?),
        ("map_points.csv", map_points_frame(&tables.map_points)?),
        ("rainfall.csv", series_frame(&tables.rainfall)?),
        ("cumulative.csv", series_frame(&tables.cumulative)?),
    ];
    write_frames(frames, dir)
}

pub fn write_story_csv(story: &DataStory, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    let frames = [
        ("monthly.csv", monthly_frame(&story.monthly, &story.windows)?),
        ("yearly.csv", yearly_frame(&story.yearly)?),
        ("event_daily.csv", daily_totals_frame(&story.event_daily)?),
        ("event_by_grid.csv", grid_totals_frame(&story.event_by_grid)?),
    ];
    write_frames(frames, dir)
}

fn write_frames<const N: usize>(
    frames: [(&str, DataFrame); N],
    dir: &Path,
) -> Result<Vec<PathBuf>, ExportError> {
    fs::create_dir_all(dir).map_err(io_error(dir))?;
    let mut written = Vec::with_capacity(N);
    for (name, mut df) in frames {
        let path = dir.join(name);
        write_csv(&mut df, &path)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{DerivedRow, FloodPeriodFlag, Period};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn series() -> DerivedSeries {
        DerivedSeries {
            timeframe: Period::Daily,
            windows: vec![5],
            rows: vec![
                DerivedRow {
                    date: NaiveDate::from_ymd_opt(2005, 8, 21).unwrap(),
                    precipitation: 3.0,
                    temperature_avg: None,
                    rolling_means: vec![Some(3.0)],
                    flood_period: FloodPeriodFlag::Flood,
                },
                DerivedRow {
                    date: NaiveDate::from_ymd_opt(2005, 8, 22).unwrap(),
                    precipitation: 5.0,
                    temperature_avg: Some(14.0),
                    rolling_means: vec![Some(4.0)],
                    flood_period: FloodPeriodFlag::Rainfall,
                },
            ],
        }
    }

    #[test]
    fn test_series_frame_columns() {
        let df = series_frame(&series()).unwrap();
        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(
            names,
            vec!["DAY", "PRECIPITATION", "TEMPERATURE_AVG", "rolling_mean_5", "In_Flood_Period"]
        );
        let labels = df.column("In_Flood_Period").unwrap();
        let labels = labels.as_materialized_series().str().unwrap();
        assert_eq!(labels.get(0), Some("Überschwemmung"));
        assert_eq!(labels.get(1), Some("Niederschläge"));
    }

    #[test]
    fn test_write_csv_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("rainfall.csv");
        let mut df = series_frame(&series()).unwrap();
        write_csv(&mut df, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("DAY,PRECIPITATION,TEMPERATURE_AVG,rolling_mean_5,In_Flood_Period")
        );
        let first = lines.next().unwrap();
        assert!(first.starts_with("2005-08-21,3"));
        assert!(first.ends_with("Überschwemmung"));
    }

    #[test]
    fn test_write_json_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("series.json");
        write_json(&series(), Some(&path)).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["rows"][0]["flood_period"], "flood");
        assert_eq!(value["timeframe"], "daily");
    }
}
