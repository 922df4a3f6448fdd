//! Period Resampling
//! Groups daily observations into calendar days, weeks, months or years.

use super::PipelineError;
use crate::model::DailyRainfallObservation;
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Resampling cadence. Periods are labelled by their last day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    #[default]
    Daily,
    /// Weeks end on Sunday.
    Weekly,
    Monthly,
    Yearly,
}

impl Period {
    /// Label of the period containing `date`.
    pub fn period_end(self, date: NaiveDate) -> NaiveDate {
        match self {
            Period::Daily => date,
            Period::Weekly => {
                let to_sunday = 6 - date.weekday().num_days_from_monday();
                date.checked_add_days(Days::new(u64::from(to_sunday)))
                    .unwrap_or(date)
            }
            Period::Monthly => {
                let (year, month) = if date.month() == 12 {
                    (date.year() + 1, 1)
                } else {
                    (date.year(), date.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, 1)
                    .and_then(|first| first.pred_opt())
                    .unwrap_or(date)
            }
            Period::Yearly => NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(date),
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Period::Daily => "D",
            Period::Weekly => "W",
            Period::Monthly => "M",
            Period::Yearly => "Y",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Period {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "d" | "day" | "daily" => Ok(Period::Daily),
            "w" | "week" | "weekly" => Ok(Period::Weekly),
            "m" | "month" | "monthly" => Ok(Period::Monthly),
            "y" | "year" | "yearly" => Ok(Period::Yearly),
            _ => Err(PipelineError::UnknownTimeframe(s.to_string())),
        }
    }
}

/// How precipitation is combined within a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    #[default]
    Mean,
    Sum,
}

/// One resampled period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodRow {
    /// Last day of the period.
    pub date: NaiveDate,
    pub precipitation: f64,
    /// Always averaged, over the observations that report a temperature.
    pub temperature_avg: Option<f64>,
    pub observations: usize,
}

#[derive(Default)]
struct Accumulator {
    precipitation: f64,
    temperature: f64,
    temperature_count: usize,
    count: usize,
}

/// Average all observations within each period.
pub fn resample_by_period(observations: &[DailyRainfallObservation], period: Period) -> Vec<PeriodRow> {
    resample_with(observations, period, Aggregation::Mean)
}

/// Resample with an explicit precipitation aggregation.
///
/// Only periods that contain at least one observation are emitted, in
/// chronological order.
pub fn resample_with(
    observations: &[DailyRainfallObservation],
    period: Period,
    aggregation: Aggregation,
) -> Vec<PeriodRow> {
    let mut buckets: BTreeMap<NaiveDate, Accumulator> = BTreeMap::new();
    for observation in observations {
        let bucket = buckets.entry(period.period_end(observation.date)).or_default();
        bucket.precipitation += observation.precipitation;
        bucket.count += 1;
        if let Some(temperature) = observation.temperature_avg {
            bucket.temperature += temperature;
            bucket.temperature_count += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(date, bucket)| PeriodRow {
            date,
            precipitation: match aggregation {
                Aggregation::Mean => bucket.precipitation / bucket.count as f64,
                Aggregation::Sum => bucket.precipitation,
            },
            temperature_avg: (bucket.temperature_count > 0)
                .then(|| bucket.temperature / bucket.temperature_count as f64),
            observations: bucket.count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(y: i32, m: u32, d: u32, grid_no: i64, precipitation: f64) -> DailyRainfallObservation {
        DailyRainfallObservation {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            grid_no,
            precipitation,
            temperature_avg: Some(10.0 + precipitation),
            coordinate: None,
        }
    }

    #[test]
    fn test_daily_averages_duplicate_days() {
        let series = vec![obs(2023, 8, 2, 1, 4.0), obs(2023, 8, 1, 1, 1.0), obs(2023, 8, 1, 2, 3.0)];
        let rows = resample_by_period(&series, Period::Daily);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2023, 8, 1).unwrap());
        assert_eq!(rows[0].precipitation, 2.0);
        assert_eq!(rows[0].temperature_avg, Some(12.0));
        assert_eq!(rows[0].observations, 2);
        assert_eq!(rows[1].precipitation, 4.0);
    }

    #[test]
    fn test_monthly_single_month_yields_one_row() {
        let series: Vec<_> = (1..=30).map(|d| obs(2023, 6, d, 1, d as f64)).collect();
        let rows = resample_by_period(&series, Period::Monthly);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2023, 6, 30).unwrap());
        assert_eq!(rows[0].precipitation, 15.5);
        assert_eq!(rows[0].observations, 30);
    }

    #[test]
    fn test_weekly_labels_end_on_sunday() {
        // 2023-07-31 is a Monday, 2023-08-06 a Sunday
        let series = vec![obs(2023, 7, 31, 1, 2.0), obs(2023, 8, 6, 1, 4.0), obs(2023, 8, 7, 1, 9.0)];
        let rows = resample_by_period(&series, Period::Weekly);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2023, 8, 6).unwrap());
        assert_eq!(rows[0].precipitation, 3.0);
        assert_eq!(rows[1].date, NaiveDate::from_ymd_opt(2023, 8, 13).unwrap());
    }

    #[test]
    fn test_sum_aggregation_and_year_end() {
        let series = vec![obs(2005, 8, 21, 1, 100.0), obs(2005, 12, 31, 2, 5.0), obs(2006, 1, 1, 1, 1.0)];
        let rows = resample_with(&series, Period::Yearly, Aggregation::Sum);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2005, 12, 31).unwrap());
        assert_eq!(rows[0].precipitation, 105.0);
        let december = Period::Monthly.period_end(NaiveDate::from_ymd_opt(2005, 12, 3).unwrap());
        assert_eq!(december, NaiveDate::from_ymd_opt(2005, 12, 31).unwrap());
    }

    #[test]
    fn test_period_from_str() {
        assert_eq!("W".parse::<Period>().unwrap(), Period::Weekly);
        assert_eq!("monthly".parse::<Period>().unwrap(), Period::Monthly);
        assert!("Q".parse::<Period>().is_err());
    }
}
