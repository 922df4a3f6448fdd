//! Configuration Module
//! TOML configuration for input files, date formats, join and series settings.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration for the canonical dashboard inputs.

use crate::model::Coordinate;
use crate::pipeline::JoinOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// One CSV input file. The separator is sniffed from the header when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputFile {
    pub path: PathBuf,
    #[serde(default)]
    pub separator: Option<char>,
}

impl InputFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            separator: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputPaths {
    pub flood_events: InputFile,
    pub rainfall: InputFile,
    pub regions: InputFile,
    /// Only needed by the data story; a configured file must exist.
    pub global_temperature: Option<InputFile>,
}

impl Default for InputPaths {
    fn default() -> Self {
        Self {
            flood_events: InputFile::new("data/flood_data_fixed.csv"),
            rainfall: InputFile::new("data/rain_data_alps.csv"),
            regions: InputFile::new("data/regionswithcords.csv"),
            global_temperature: None,
        }
    }
}

/// Candidate chrono formats, tried in order before the flexible fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateFormats {
    pub events: Vec<String>,
    pub rainfall: Vec<String>,
}

impl Default for DateFormats {
    fn default() -> Self {
        Self {
            events: vec!["%d.%m.%Y".to_string(), "%Y-%m-%d".to_string()],
            rainfall: vec![
                "%d.%m.%Y".to_string(),
                "%Y-%m-%d".to_string(),
                "%Y%m%d".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesOptions {
    /// Rolling windows applied to dashboard series, in observation units.
    pub rolling_windows: Vec<usize>,
    /// First year of the cumulative series.
    pub cumulative_start_year: i32,
    /// Strict rolling windows (months) for the data story.
    pub story_windows: Vec<usize>,
}

impl Default for SeriesOptions {
    fn default() -> Self {
        Self {
            rolling_windows: vec![5],
            cumulative_start_year: 1979,
            story_windows: vec![6, 12, 24, 36, 48],
        }
    }
}

/// Filters used when preparing the canonical flood file from a raw export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WrangleOptions {
    pub countries: Vec<String>,
    pub country_codes: Vec<String>,
    pub first_year: i32,
    pub last_year: i32,
    pub rain_only: bool,
}

impl Default for WrangleOptions {
    fn default() -> Self {
        let countries = [
            "France",
            "Switzerland",
            "Liechtenstein",
            "Monaco",
            "Slovenia",
            "Austria",
            "Germany",
            "Italy",
        ];
        let codes = ["FR", "CH", "LI", "MC", "SI", "AT", "DE", "IT"];
        Self {
            countries: countries.iter().map(|c| c.to_string()).collect(),
            country_codes: codes.iter().map(|c| c.to_string()).collect(),
            first_year: 1979,
            last_year: 2023,
            rain_only: false,
        }
    }
}

/// Axis-aligned box approximating a country's extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    pub const fn new(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> Self {
        Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        }
    }

    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        (self.lat_min..=self.lat_max).contains(&coordinate.latitude)
            && (self.lon_min..=self.lon_max).contains(&coordinate.longitude)
    }
}

/// Default extents for the Alpine countries covered by the flood export.
pub fn default_country_bounds() -> BTreeMap<String, BoundingBox> {
    [
        ("Austria", BoundingBox::new(46.37, 49.02, 9.53, 17.16)),
        ("France", BoundingBox::new(41.33, 51.12, -5.14, 9.56)),
        ("Germany", BoundingBox::new(47.27, 55.06, 5.87, 15.04)),
        ("Italy", BoundingBox::new(35.49, 47.09, 6.63, 18.52)),
        ("Liechtenstein", BoundingBox::new(47.05, 47.27, 9.47, 9.64)),
        ("Monaco", BoundingBox::new(43.72, 43.75, 7.41, 7.44)),
        ("Slovenia", BoundingBox::new(45.42, 46.88, 13.38, 16.61)),
        ("Switzerland", BoundingBox::new(45.82, 47.81, 5.96, 10.49)),
    ]
    .into_iter()
    .map(|(name, bounds)| (name.to_string(), bounds))
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `env_logger` filter, overridden by `RUST_LOG`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub inputs: InputPaths,
    pub dates: DateFormats,
    pub join: JoinOptions,
    pub series: SeriesOptions,
    pub wrangle: WrangleOptions,
    pub countries: BTreeMap<String, BoundingBox>,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inputs: InputPaths::default(),
            dates: DateFormats::default(),
            join: JoinOptions::default(),
            series: SeriesOptions::default(),
            wrangle: WrangleOptions::default(),
            countries: default_country_bounds(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load the configuration file, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.series.rolling_windows.contains(&0) || self.series.story_windows.contains(&0) {
            return Err(ConfigError::Invalid(
                "rolling windows must be at least 1".to_string(),
            ));
        }
        if self.join.tolerance_deg.is_nan() || self.join.tolerance_deg < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "join tolerance must be a non-negative number, got {}",
                self.join.tolerance_deg
            )));
        }
        if self.wrangle.first_year > self.wrangle.last_year {
            return Err(ConfigError::Invalid(format!(
                "wrangle year range {}..{} is empty",
                self.wrangle.first_year, self.wrangle.last_year
            )));
        }
        let inputs = [
            Some(&self.inputs.flood_events),
            Some(&self.inputs.rainfall),
            Some(&self.inputs.regions),
            self.inputs.global_temperature.as_ref(),
        ];
        for input in inputs.into_iter().flatten() {
            if let Some(separator) = input.separator {
                if !separator.is_ascii() {
                    return Err(ConfigError::Invalid(format!(
                        "separator {separator:?} for {} is not a single-byte character",
                        input.path.display()
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::CoordinateMatch;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.series.rolling_windows, vec![5]);
        assert_eq!(config.series.cumulative_start_year, 1979);
        assert!(config.countries.contains_key("Switzerland"));
        assert_eq!(config.inputs.global_temperature, None);
    }

    #[test]
    fn test_partial_override() {
        let config = Config::from_toml(
            r#"
[inputs.rainfall]
path = "rain.csv"
separator = ";"

[join]
coordinate_match = "exact"
prefer_region_code = false

[series]
rolling_windows = [5, 30]
"#,
        )
        .unwrap();
        assert_eq!(config.inputs.rainfall.path, PathBuf::from("rain.csv"));
        assert_eq!(config.inputs.rainfall.separator, Some(';'));
        assert_eq!(config.join.coordinate_match, CoordinateMatch::Exact);
        assert!(!config.join.prefer_region_code);
        assert_eq!(config.series.rolling_windows, vec![5, 30]);
        assert_eq!(config.series.story_windows, vec![6, 12, 24, 36, 48]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = Config::from_toml("[series]\nrolling_windows = [0]\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_bounding_box_contains() {
        let bounds = default_country_bounds();
        let bern = Coordinate::new(46.95, 7.45).unwrap();
        assert!(bounds["Switzerland"].contains(&bern));
        assert!(!bounds["Slovenia"].contains(&bern));
    }
}
