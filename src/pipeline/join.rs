//! Event/Region Join
//! Left join of flood events onto the region lookup.
//!
//! Exact coordinate equality only works when both tables come from the same
//! geocoding run, so the join can also match on the region code or within a
//! tolerance. Whatever the strategy, the output has exactly one row per
//! input event.

use crate::model::{Coordinate, FloodEvent, Region};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateMatch {
    /// Bitwise-equal latitude and longitude.
    Exact,
    /// Both axes within `tolerance_deg`; the closest region wins.
    Tolerance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinOptions {
    pub coordinate_match: CoordinateMatch,
    pub tolerance_deg: f64,
    /// Match on the region code first when the event carries one.
    pub prefer_region_code: bool,
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self {
            coordinate_match: CoordinateMatch::Tolerance,
            tolerance_deg: 1e-4,
            prefer_region_code: true,
        }
    }
}

impl JoinOptions {
    /// Exact float equality on coordinates only.
    pub fn exact() -> Self {
        Self {
            coordinate_match: CoordinateMatch::Exact,
            tolerance_deg: 0.0,
            prefer_region_code: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    RegionCode,
    Coordinates,
    Unmatched,
}

/// A flood event with its (possibly missing) region enrichment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedEvent {
    pub event: FloodEvent,
    pub region: Option<Region>,
    pub matched_by: MatchKind,
}

impl EnrichedEvent {
    pub fn unmatched(event: FloodEvent) -> Self {
        Self {
            event,
            region: None,
            matched_by: MatchKind::Unmatched,
        }
    }

    pub fn region_name(&self) -> Option<&str> {
        self.region.as_ref().map(|region| region.name.as_str())
    }
}

/// Key for exact matching; `-0.0` and `0.0` compare equal as floats.
fn exact_key(coordinate: &Coordinate) -> (u64, u64) {
    let normalize = |value: f64| if value == 0.0 { 0.0f64 } else { value };
    (
        normalize(coordinate.latitude).to_bits(),
        normalize(coordinate.longitude).to_bits(),
    )
}

struct RegionIndex<'a> {
    regions: &'a [Region],
    by_code: HashMap<&'a str, &'a Region>,
    by_exact: HashMap<(u64, u64), &'a Region>,
}

impl<'a> RegionIndex<'a> {
    fn new(regions: &'a [Region]) -> Self {
        let mut by_code = HashMap::new();
        let mut by_exact = HashMap::new();
        for region in regions {
            by_code.entry(region.code.as_str()).or_insert(region);
            if let Some(coordinate) = &region.coordinate {
                by_exact.entry(exact_key(coordinate)).or_insert(region);
            }
        }
        Self {
            regions,
            by_code,
            by_exact,
        }
    }

    fn by_coordinate(&self, coordinate: &Coordinate, options: &JoinOptions) -> Option<&'a Region> {
        match options.coordinate_match {
            CoordinateMatch::Exact => self.by_exact.get(&exact_key(coordinate)).copied(),
            CoordinateMatch::Tolerance => {
                let mut best: Option<(f64, &'a Region)> = None;
                for region in self.regions {
                    let Some(candidate) = &region.coordinate else {
                        continue;
                    };
                    let distance = coordinate.axis_distance(candidate);
                    if distance > options.tolerance_deg {
                        continue;
                    }
                    if best.map_or(true, |(current, _)| distance < current) {
                        best = Some((distance, region));
                    }
                }
                best.map(|(_, region)| region)
            }
        }
    }
}

/// Left-join events onto regions. The output preserves input order and
/// cardinality; events without any match keep a missing enrichment.
pub fn join_events_to_regions(
    events: &[FloodEvent],
    regions: &[Region],
    options: &JoinOptions,
) -> Vec<EnrichedEvent> {
    let index = RegionIndex::new(regions);

    let joined: Vec<EnrichedEvent> = events
        .iter()
        .map(|event| {
            let by_code = options
                .prefer_region_code
                .then(|| event.region_code.as_deref())
                .flatten()
                .and_then(|code| index.by_code.get(code).copied());
            if let Some(region) = by_code {
                return EnrichedEvent {
                    event: event.clone(),
                    region: Some(region.clone()),
                    matched_by: MatchKind::RegionCode,
                };
            }

            match event
                .coordinate
                .as_ref()
                .and_then(|coordinate| index.by_coordinate(coordinate, options))
            {
                Some(region) => EnrichedEvent {
                    event: event.clone(),
                    region: Some(region.clone()),
                    matched_by: MatchKind::Coordinates,
                },
                None => EnrichedEvent::unmatched(event.clone()),
            }
        })
        .collect();

    let unmatched = joined
        .iter()
        .filter(|e| e.matched_by == MatchKind::Unmatched)
        .count();
    debug!(
        "Joined {} events to {} regions, {} without a region",
        joined.len(),
        regions.len(),
        unmatched
    );

    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(code: &str, name: &str, lat: f64, lon: f64) -> Region {
        Region {
            code: code.to_string(),
            name: name.to_string(),
            coordinate: Coordinate::new(lat, lon),
        }
    }

    fn event(id: &str, code: Option<&str>, coordinate: Option<(f64, f64)>) -> FloodEvent {
        FloodEvent {
            id: id.to_string(),
            year: 2005,
            country: "Switzerland".to_string(),
            region_code: code.map(str::to_string),
            location: None,
            event_type: None,
            start_date: None,
            end_date: None,
            cause: None,
            fatalities: None,
            losses_mln_eur: None,
            coordinate: coordinate.and_then(|(lat, lon)| Coordinate::new(lat, lon)),
        }
    }

    fn regions() -> Vec<Region> {
        vec![
            region("CH021", "Bern", 46.9480, 7.4474),
            region("CH062", "Uri", 46.7739, 8.6025),
        ]
    }

    #[test]
    fn test_exact_join_preserves_unmatched_rows() {
        let events = vec![
            event("1", None, Some((46.9480, 7.4474))),
            event("2", None, Some((46.94801, 7.4474))),
            event("3", None, None),
        ];
        let joined = join_events_to_regions(&events, &regions(), &JoinOptions::exact());
        assert_eq!(joined.len(), 3);
        assert_eq!(joined[0].region_name(), Some("Bern"));
        assert_eq!(joined[0].matched_by, MatchKind::Coordinates);
        assert_eq!(joined[1].region, None);
        assert_eq!(joined[1].matched_by, MatchKind::Unmatched);
        assert_eq!(joined[2].region, None);
        assert_eq!(joined[2].event.id, "3");
    }

    #[test]
    fn test_tolerance_join_picks_closest() {
        let events = vec![event("1", None, Some((46.77395, 8.60245)))];
        let options = JoinOptions {
            prefer_region_code: false,
            ..JoinOptions::default()
        };
        let joined = join_events_to_regions(&events, &regions(), &options);
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].region_name(), Some("Uri"));

        let far = vec![event("2", None, Some((46.80, 8.60)))];
        let joined = join_events_to_regions(&far, &regions(), &options);
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].matched_by, MatchKind::Unmatched);
    }

    #[test]
    fn test_region_code_wins_over_coordinates() {
        let events = vec![
            event("1", Some("CH062"), Some((46.9480, 7.4474))),
            event("2", Some("XX999"), None),
        ];
        let joined = join_events_to_regions(&events, &regions(), &JoinOptions::default());
        assert_eq!(joined.len(), 2);
        assert_eq!(joined[1].matched_by, MatchKind::Unmatched);
        assert_eq!(joined[0].region_name(), Some("Uri"));
        assert_eq!(joined[0].matched_by, MatchKind::RegionCode);
    }

    #[test]
    fn test_duplicate_regions_do_not_multiply_rows() {
        let mut lookup = regions();
        lookup.push(region("CH021X", "Bern duplicate", 46.9480, 7.4474));
        let events = vec![event("1", None, Some((46.9480, 7.4474)))];
        let joined = join_events_to_regions(&events, &lookup, &JoinOptions::exact());
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].region_name(), Some("Bern"));
    }

    #[test]
    fn test_duplicate_regions_within_tolerance_keep_first() {
        let mut lookup = regions();
        lookup.push(region("CH021X", "Bern duplicate", 46.9480, 7.4474));
        lookup.push(region("CH021Y", "Bern nearby", 46.94805, 7.44745));
        let events = vec![
            event("1", None, Some((46.9480, 7.4474))),
            event("2", Some("CH021"), Some((46.9480, 7.4474))),
            event("3", None, None),
        ];
        let joined = join_events_to_regions(&events, &lookup, &JoinOptions::default());
        assert_eq!(joined.len(), events.len());
        assert_eq!(joined[0].region_name(), Some("Bern"));
        assert_eq!(joined[0].matched_by, MatchKind::Coordinates);
        assert_eq!(joined[1].matched_by, MatchKind::RegionCode);
        assert_eq!(joined[2].matched_by, MatchKind::Unmatched);
    }
}
