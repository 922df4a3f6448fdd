//! Pipeline module - Cleaning, joining and deriving dashboard tables

mod coordinates;
mod dashboard;
mod dates;
mod flood_flag;
mod join;
mod resample;
mod rolling;
mod tables;

use thiserror::Error;

pub use coordinates::{
    extract_coordinates, parse_coordinate, CoordinateColumns, CoordinateEncoding, CoordinateError,
    MalformedCoordinate,
};
pub use dashboard::{
    derive_dashboard, DashboardQuery, DashboardSettings, DashboardTables, DerivedRow,
    DerivedSeries,
};
pub use dates::{parse_date_flexible, parse_dates_with_fallback, DateResolution, ParsedDates};
pub use flood_flag::{flag_flood_period, FloodIntervals, FloodPeriodFlag};
pub use join::{join_events_to_regions, CoordinateMatch, EnrichedEvent, JoinOptions, MatchKind};
pub use resample::{resample_by_period, resample_with, Aggregation, Period, PeriodRow};
pub use rolling::{compute_rolling_average, RollingMean, RollingMeanIter};
pub use tables::{
    damage_table, flood_table, format_fatalities, format_losses, location_label, map_points,
    DamageRow, FloodTableRow, MapPoint, TABLE_DATE_FORMAT,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Rolling window must cover at least one observation")]
    ZeroWindow,
    #[error("Unknown timeframe '{0}', expected D, W, M or Y")]
    UnknownTimeframe(String),
}
