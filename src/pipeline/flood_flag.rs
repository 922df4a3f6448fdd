//! Flood Period Flag
//! Marks dates that fall inside any known flood interval.

use crate::model::FloodEvent;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloodPeriodFlag {
    Flood,
    Rainfall,
}

impl FloodPeriodFlag {
    pub fn is_flood(self) -> bool {
        self == FloodPeriodFlag::Flood
    }

    /// Legend label used by the dashboard.
    pub fn label(self) -> &'static str {
        match self {
            FloodPeriodFlag::Flood => "Überschwemmung",
            FloodPeriodFlag::Rainfall => "Niederschläge",
        }
    }
}

impl From<bool> for FloodPeriodFlag {
    fn from(in_flood: bool) -> Self {
        if in_flood {
            FloodPeriodFlag::Flood
        } else {
            FloodPeriodFlag::Rainfall
        }
    }
}

/// Inclusive date intervals, merged and sorted for lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloodIntervals {
    merged: Vec<(NaiveDate, NaiveDate)>,
}

impl FloodIntervals {
    /// Intervals with a missing or inverted endpoint are dropped.
    pub fn new<I>(intervals: I) -> Self
    where
        I: IntoIterator<Item = (Option<NaiveDate>, Option<NaiveDate>)>,
    {
        let mut spans: Vec<(NaiveDate, NaiveDate)> = intervals
            .into_iter()
            .filter_map(|pair| match pair {
                (Some(start), Some(end)) if start <= end => Some((start, end)),
                _ => None,
            })
            .collect();
        spans.sort_unstable();

        let mut merged: Vec<(NaiveDate, NaiveDate)> = Vec::with_capacity(spans.len());
        for (start, end) in spans {
            match merged.last_mut() {
                Some((_, last_end)) if start <= *last_end => *last_end = (*last_end).max(end),
                _ => merged.push((start, end)),
            }
        }
        Self { merged }
    }

    pub fn from_events<'a, I>(events: I) -> Self
    where
        I: IntoIterator<Item = &'a FloodEvent>,
    {
        Self::new(events.into_iter().map(|e| (e.start_date, e.end_date)))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        let after = self.merged.partition_point(|(start, _)| *start <= date);
        after > 0 && self.merged[after - 1].1 >= date
    }

    pub fn len(&self) -> usize {
        self.merged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.merged.is_empty()
    }
}

/// One flag per date; overlapping intervals still yield a single `Flood`.
pub fn flag_flood_period(dates: &[NaiveDate], intervals: &FloodIntervals) -> Vec<FloodPeriodFlag> {
    dates
        .iter()
        .map(|date| FloodPeriodFlag::from(intervals.contains(*date)))
        .collect()
}
