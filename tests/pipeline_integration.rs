//! End-to-end load and query over small fixture files.

use alpine_floods::config::{Config, InputFile};
use alpine_floods::data::BaseTables;
use alpine_floods::export::write_dashboard_csv;
use alpine_floods::pipeline::{
    derive_dashboard, DashboardQuery, DashboardSettings, FloodPeriodFlag, MatchKind, Period,
};
use alpine_floods::stats::{build_story, EventWindow};
use chrono::NaiveDate;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const FLOODS: &str = "\
ID,Year,Country name,Start date,End date,Type,regions,Cause,Fatalities,\"Losses (mln EUR, 2020)\"
1,2005,Switzerland,21.08.2005,23.08.2005,Fluvial,\"[46.948, 7.4474]\",Heavy rain,6,3000
2,2005,Switzerland,22.08.2005,24.08.2005,Fluvial,\"[46.7739, 8.6025]\",Heavy rain,,
3,2005,Austria,23.08.2005,25.08.2005,Pluvial,\"[47.2692, 11.4041]\",Torrential rain,1,250
4,2005,Switzerland,30.08.2005,29.08.2005,Fluvial,\"[abc]\",Snowmelt,,
5,2004,Italy,01.07.2004,02.07.2004,Flash,,Heavy rain,,
";

const RAIN: &str = "\
DAY;GRID_NO;PRECIPITATION;TEMPERATURE_AVG;LATITUDE;LONGITUDE
20050820;1;2.0;15.0;46.95;7.45
20050821;1;30.0;14.0;46.95;7.45
20050822;1;50.0;13.0;46.95;7.45
20050822;1;40.0;13.0;46.95;7.45
20050823;1;20.0;13.5;46.95;7.45
20050824;1;4.0;16.0;46.95;7.45
20050821;2;10.0;12.0;47.27;11.40
20050822;2;-3.0;12.0;47.27;11.40
20040701;1;8.0;20.0;46.95;7.45
";

const REGIONS: &str = "\
Code,Name,Coordinates
CH021,Bern,\"(46.948, 7.4474)\"
CH062,Uri,\"(46.7739, 8.6025)\"
AT332,Innsbruck,\"(47.2692, 11.4041)\"
";

const TEMPERATURE: &str = "\
YEAR,No_Smoothing,Lowess(5)
2004,0.54,0.60
2005,0.68,0.62
";

fn write(dir: &Path, name: &str, contents: &str) -> InputFile {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    InputFile::new(path)
}

fn fixture_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.inputs.flood_events = write(dir, "floods.csv", FLOODS);
    config.inputs.rainfall = write(dir, "rain.csv", RAIN);
    config.inputs.regions = write(dir, "regions.csv", REGIONS);
    config.inputs.global_temperature = Some(write(dir, "temp.csv", TEMPERATURE));
    config.series.cumulative_start_year = 2004;
    config
}

#[test]
fn test_load_records_row_issues_without_failing() {
    let dir = TempDir::new().unwrap();
    let base = BaseTables::load(&fixture_config(dir.path())).unwrap();

    assert_eq!(base.events().len(), 5);
    assert_eq!(base.rainfall().len(), 7);
    assert_eq!(base.regions().len(), 3);
    assert_eq!(base.global_temperature().len(), 2);

    let report = base.report();
    assert_eq!(report.count("flood_events", "malformed_coordinate"), 1);
    assert_eq!(report.count("flood_events", "inverted_date_range"), 1);
    assert_eq!(report.count("rainfall", "duplicate_observation"), 1);
    assert_eq!(report.count("rainfall", "negative_precipitation"), 1);

    let matched: Vec<MatchKind> = base.events().iter().map(|e| e.matched_by).collect();
    assert_eq!(
        matched,
        vec![
            MatchKind::Coordinates,
            MatchKind::Coordinates,
            MatchKind::Coordinates,
            MatchKind::Unmatched,
            MatchKind::Unmatched,
        ]
    );
}

#[test]
fn test_country_query_end_to_end() {
    let dir = TempDir::new().unwrap();
    let config = fixture_config(dir.path());
    let base = BaseTables::load(&config).unwrap();
    let query = DashboardQuery {
        year: 2005,
        country: Some("Switzerland".to_string()),
        timeframe: Period::Daily,
    };
    let tables = derive_dashboard(&base, &query, &DashboardSettings::from(&config)).unwrap();

    assert!(!tables.no_data);
    assert_eq!(tables.countries, vec!["Switzerland", "Austria"]);
    assert_eq!(tables.events.len(), 3);

    let bern = &tables.flood_table[0];
    assert_eq!(bern.location, "Bern");
    assert_eq!(bern.start_date.as_deref(), Some("21.08.2005"));
    // 30 + mean(50, 40) + 20 on the single Swiss grid cell
    assert_eq!(bern.precipitation_mm, Some(95.0));
    assert_eq!(tables.flood_table[2].precipitation_mm, None);

    let damage: Vec<(&str, &str)> = tables
        .damage_table
        .iter()
        .map(|row| (row.fatalities.as_str(), row.losses.as_str()))
        .collect();
    assert_eq!(damage, vec![("6", "3'000"), ("None", "0")]);
    assert_eq!(tables.damage_table[1].locations, "Uri, [abc]");
    assert_eq!(tables.map_points.len(), 2);

    let flags: Vec<FloodPeriodFlag> = tables.rainfall.rows.iter().map(|r| r.flood_period).collect();
    assert_eq!(
        flags,
        vec![
            FloodPeriodFlag::Rainfall,
            FloodPeriodFlag::Flood,
            FloodPeriodFlag::Flood,
            FloodPeriodFlag::Flood,
            FloodPeriodFlag::Flood,
        ]
    );
    assert_eq!(tables.rainfall.rows[4].rolling_means, vec![Some(20.2)]);
    assert_eq!(tables.cumulative.rows.len(), 6);

    let out = dir.path().join("out");
    let written = write_dashboard_csv(&tables, &out).unwrap();
    assert_eq!(written.len(), 6);
    let rainfall_csv = fs::read_to_string(out.join("rainfall.csv")).unwrap();
    assert!(rainfall_csv.starts_with("DAY,PRECIPITATION,TEMPERATURE_AVG,rolling_mean_5,In_Flood_Period"));
}

#[test]
fn test_unknown_year_yields_empty_tables() {
    let dir = TempDir::new().unwrap();
    let config = fixture_config(dir.path());
    let base = BaseTables::load(&config).unwrap();
    let query = DashboardQuery {
        year: 1990,
        country: None,
        timeframe: Period::Monthly,
    };
    let tables = derive_dashboard(&base, &query, &DashboardSettings::from(&config)).unwrap();
    assert!(tables.no_data);
    assert!(tables.countries.is_empty());
    assert!(tables.rainfall.is_empty());
    assert_eq!(tables.precipitation_summary.count, 0);
}

#[test]
fn test_story_over_fixture() {
    let dir = TempDir::new().unwrap();
    let config = fixture_config(dir.path());
    let base = BaseTables::load(&config).unwrap();
    let window = EventWindow::new(
        NaiveDate::from_ymd_opt(2005, 8, 21).unwrap(),
        NaiveDate::from_ymd_opt(2005, 8, 22).unwrap(),
    )
    .unwrap();
    let story = build_story(
        base.rainfall(),
        base.global_temperature(),
        &config.series.story_windows,
        window,
    )
    .unwrap();

    assert_eq!(story.monthly.len(), 2);
    assert_eq!(story.yearly.len(), 2);
    assert_eq!(story.yearly[1].precipitation_delta, Some(103.0));
    assert_eq!(story.event_daily.len(), 2);
    assert_eq!(story.event_daily[0].precipitation, 40.0);
    assert_eq!(story.event_by_grid.len(), 3);
}

#[test]
fn test_missing_input_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut config = fixture_config(dir.path());
    config.inputs.rainfall = InputFile::new(dir.path().join("missing.csv"));
    assert!(BaseTables::load(&config).is_err());
}

#[test]
fn test_missing_temperature_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut config = fixture_config(dir.path());
    config.inputs.global_temperature = Some(InputFile::new(dir.path().join("typo_temp.csv")));
    assert!(BaseTables::load(&config).is_err());

    config.inputs.global_temperature = None;
    let base = BaseTables::load(&config).unwrap();
    assert!(base.global_temperature().is_empty());
}
