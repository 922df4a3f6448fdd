//! Domain Records
//! Typed rows produced by the loader and consumed by the pipeline.
//!
//! Every record here is an immutable snapshot: the loader builds them once
//! at startup and the pipeline only ever derives new values from them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in decimal degrees.
///
/// Only constructed through [`Coordinate::new`], so a value always holds
/// finite numbers inside the valid geographic ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting non-finite or out-of-range values.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }

    /// Largest per-axis difference to another coordinate, in degrees.
    pub fn axis_distance(&self, other: &Coordinate) -> f64 {
        (self.latitude - other.latitude)
            .abs()
            .max((self.longitude - other.longitude).abs())
    }
}

/// A recorded historical flood occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloodEvent {
    pub id: String,
    pub year: i32,
    pub country: String,
    /// Region code from the upstream export, when the file carries one.
    pub region_code: Option<String>,
    /// Raw location text (the encoded coordinate pair in the source file).
    pub location: Option<String>,
    pub event_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub cause: Option<String>,
    pub fatalities: Option<f64>,
    /// Losses in million EUR at 2020 value.
    pub losses_mln_eur: Option<f64>,
    pub coordinate: Option<Coordinate>,
}

impl FloodEvent {
    /// The inclusive `[start, end]` interval, if both ends are known and ordered.
    pub fn interval(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if start <= end => Some((start, end)),
            _ => None,
        }
    }

    pub fn is_rain_related(&self) -> bool {
        self.cause
            .as_deref()
            .map(|cause| cause.to_lowercase().contains("rain"))
            .unwrap_or(false)
    }
}

/// One rainfall/temperature sample for a grid cell on a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRainfallObservation {
    pub date: NaiveDate,
    pub grid_no: i64,
    /// Millimetres, never negative.
    pub precipitation: f64,
    pub temperature_avg: Option<f64>,
    /// Grid cell centre, used for country filtering.
    pub coordinate: Option<Coordinate>,
}

/// Region lookup entry used to enrich flood events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub code: String,
    pub name: String,
    pub coordinate: Option<Coordinate>,
}

impl Region {
    /// Two-letter country prefix of the region code (e.g. `CH` for `CH033`).
    pub fn country_prefix(&self) -> &str {
        self.code.get(..2).unwrap_or(&self.code)
    }
}

/// Yearly global mean temperature anomaly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalTemperature {
    pub year: i32,
    pub no_smoothing: f64,
    pub lowess: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(start: Option<NaiveDate>, end: Option<NaiveDate>) -> FloodEvent {
        FloodEvent {
            id: "1".to_string(),
            year: 2005,
            country: "Switzerland".to_string(),
            region_code: None,
            location: None,
            event_type: None,
            start_date: start,
            end_date: end,
            cause: Some("Heavy RAIN, snowmelt".to_string()),
            fatalities: None,
            losses_mln_eur: None,
            coordinate: None,
        }
    }

    #[test]
    fn test_coordinate_rejects_out_of_range() {
        assert!(Coordinate::new(46.8, 8.2).is_some());
        assert!(Coordinate::new(91.0, 8.2).is_none());
        assert!(Coordinate::new(46.8, -180.5).is_none());
        assert!(Coordinate::new(f64::NAN, 8.2).is_none());
        assert!(Coordinate::new(46.8, f64::INFINITY).is_none());
    }

    #[test]
    fn test_interval_requires_ordered_dates() {
        let d1 = NaiveDate::from_ymd_opt(2005, 8, 21).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2005, 8, 23).unwrap();
        assert_eq!(event(Some(d1), Some(d2)).interval(), Some((d1, d2)));
        assert_eq!(event(Some(d2), Some(d1)).interval(), None);
        assert_eq!(event(Some(d1), None).interval(), None);
    }

    #[test]
    fn test_rain_related_is_case_insensitive() {
        assert!(event(None, None).is_rain_related());
    }

    #[test]
    fn test_region_country_prefix() {
        let region = Region {
            code: "CH033".to_string(),
            name: "Aargau".to_string(),
            coordinate: None,
        };
        assert_eq!(region.country_prefix(), "CH");
    }
}
