//! Event Tables
//! Flood listing, damage summary and map points for the selected events.

use super::join::EnrichedEvent;
use crate::model::DailyRainfallObservation;
use serde::Serialize;
use std::collections::BTreeMap;

/// Date format used in the event listings.
pub const TABLE_DATE_FORMAT: &str = "%d.%m.%Y";

const MIN_MARKER_SIZE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloodTableRow {
    pub location: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Rainfall summed over all grid cells in the event window.
    pub precipitation_mm: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DamageRow {
    pub fatalities: String,
    pub losses: String,
    /// Every location sharing this (fatalities, losses) pair, `, `-joined.
    pub locations: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub marker_size: f64,
}

/// Region name, falling back to the raw location text.
pub fn location_label(event: &EnrichedEvent) -> String {
    event
        .region_name()
        .or(event.event.location.as_deref())
        .unwrap_or_default()
        .to_string()
}

/// Missing fatalities are rendered as `None`, never as zero.
pub fn format_fatalities(fatalities: Option<f64>) -> String {
    match fatalities {
        None => "None".to_string(),
        Some(value) if value.fract() == 0.0 => format!("{value:.0}"),
        Some(value) => value.to_string(),
    }
}

/// Whole units with `'` as the thousands separator, e.g. `1'234`.
pub fn format_losses(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('\'');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        grouped.insert(0, '-');
    }
    grouped
}

/// Losses as reported, treating a blank entry as zero.
///
/// The flood export leaves losses below one million EUR blank, so a
/// missing value here means "under the reporting threshold", not unknown.
fn reported_losses(event: &EnrichedEvent) -> f64 {
    event.event.losses_mln_eur.unwrap_or(0.0)
}

/// Listing of the selected events with the rainfall over each event window.
///
/// `rainfall` must be sorted by date.
pub fn flood_table(events: &[&EnrichedEvent], rainfall: &[DailyRainfallObservation]) -> Vec<FloodTableRow> {
    events
        .iter()
        .map(|event| {
            let precipitation_mm = event.event.interval().map(|(start, end)| {
                let from = rainfall.partition_point(|obs| obs.date < start);
                let to = rainfall.partition_point(|obs| obs.date <= end);
                rainfall[from..to.max(from)]
                    .iter()
                    .map(|obs| obs.precipitation)
                    .sum()
            });
            FloodTableRow {
                location: location_label(event),
                start_date: event
                    .event
                    .start_date
                    .map(|date| date.format(TABLE_DATE_FORMAT).to_string()),
                end_date: event
                    .event
                    .end_date
                    .map(|date| date.format(TABLE_DATE_FORMAT).to_string()),
                precipitation_mm,
            }
        })
        .collect()
}

/// Locations grouped by identical (fatalities, losses) labels.
pub fn damage_table(events: &[&EnrichedEvent]) -> Vec<DamageRow> {
    let mut groups: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();
    for event in events {
        let key = (
            format_fatalities(event.event.fatalities),
            format_losses(reported_losses(event)),
        );
        groups.entry(key).or_default().push(location_label(event));
    }

    groups
        .into_iter()
        .map(|((fatalities, losses), locations)| DamageRow {
            fatalities,
            losses,
            locations: locations.join(", "),
        })
        .collect()
}

/// Events with a coordinate, sized by losses.
pub fn map_points(events: &[&EnrichedEvent]) -> Vec<MapPoint> {
    events
        .iter()
        .filter_map(|event| {
            let coordinate = event.event.coordinate?;
            let losses = reported_losses(event);
            let marker_size = if losses != 0.0 {
                MIN_MARKER_SIZE.max(losses / 10.0)
            } else {
                MIN_MARKER_SIZE
            };
            Some(MapPoint {
                name: location_label(event),
                latitude: coordinate.latitude,
                longitude: coordinate.longitude,
                marker_size,
            })
        })
        .collect()
}
