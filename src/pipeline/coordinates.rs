//! Coordinate Extraction
//! Splits `"[lat, lon]"` / `"lat,lon"` text into two numeric columns.

use crate::model::Coordinate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const BRACKETS: [char; 4] = ['[', ']', '(', ')'];

/// How the pair is encoded in the source column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateEncoding {
    /// `"[46.8, 8.2]"` or `"(46.8, 8.2)"`; brackets are stripped first.
    #[default]
    Bracketed,
    /// `"46.8,8.2"`; brackets are not accepted.
    Plain,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinateError {
    #[error("expected two comma-separated values, found {0}")]
    TokenCount(usize),
    #[error("'{0}' is not a number")]
    NotNumeric(String),
    #[error("latitude {latitude} / longitude {longitude} out of range")]
    OutOfRange { latitude: f64, longitude: f64 },
}

/// A row whose text could not be turned into a coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedCoordinate {
    pub row: usize,
    pub value: String,
    pub error: CoordinateError,
}

/// Latitude/longitude columns aligned with the input rows.
///
/// Entries are `None` for blank input and for malformed rows; malformed
/// rows are additionally listed in `malformed`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinateColumns {
    pub latitude: Vec<Option<f64>>,
    pub longitude: Vec<Option<f64>>,
    pub malformed: Vec<MalformedCoordinate>,
}

impl CoordinateColumns {
    pub fn len(&self) -> usize {
        self.latitude.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latitude.is_empty()
    }

    pub fn coordinate(&self, row: usize) -> Option<Coordinate> {
        match (self.latitude.get(row)?, self.longitude.get(row)?) {
            (Some(latitude), Some(longitude)) => Coordinate::new(*latitude, *longitude),
            _ => None,
        }
    }
}

/// Parse one encoded pair.
pub fn parse_coordinate(text: &str, encoding: CoordinateEncoding) -> Result<Coordinate, CoordinateError> {
    let text = text.trim();
    let inner = match encoding {
        CoordinateEncoding::Bracketed => text.trim_matches(&BRACKETS[..]),
        CoordinateEncoding::Plain => text,
    };

    let tokens: Vec<&str> = inner.split(',').map(str::trim).collect();
    let [lat, lon] = tokens.as_slice() else {
        return Err(CoordinateError::TokenCount(tokens.len()));
    };

    let latitude = parse_token(lat)?;
    let longitude = parse_token(lon)?;
    Coordinate::new(latitude, longitude).ok_or(CoordinateError::OutOfRange {
        latitude,
        longitude,
    })
}

fn parse_token(token: &str) -> Result<f64, CoordinateError> {
    token
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| CoordinateError::NotNumeric(token.to_string()))
}

/// Extract a latitude and a longitude column from encoded text.
///
/// Malformed rows are recorded and left missing; they never abort the
/// extraction of the remaining rows.
pub fn extract_coordinates<S: AsRef<str>>(
    values: &[Option<S>],
    encoding: CoordinateEncoding,
) -> CoordinateColumns {
    let mut columns = CoordinateColumns {
        latitude: Vec::with_capacity(values.len()),
        longitude: Vec::with_capacity(values.len()),
        malformed: Vec::new(),
    };

    for (row, value) in values.iter().enumerate() {
        let text = value.as_ref().map(|value| {
            let text: &str = value.as_ref();
            text.trim()
        });
        let parsed = match text {
            None | Some("") => None,
            Some(text) => match parse_coordinate(text, encoding) {
                Ok(coordinate) => Some(coordinate),
                Err(error) => {
                    columns.malformed.push(MalformedCoordinate {
                        row,
                        value: text.to_string(),
                        error,
                    });
                    None
                }
            },
        };
        columns.latitude.push(parsed.map(|c| c.latitude));
        columns.longitude.push(parsed.map(|c| c.longitude));
    }

    columns
}
