//! Load Report
//! Per-row problems found while converting input tables.

use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    UnparseableDate { column: String, value: String },
    MalformedCoordinate { value: String, reason: String },
    InvalidNumber { column: String, value: String },
    NegativePrecipitation { value: String },
    InvertedDateRange,
    DuplicateObservation,
}

impl IssueKind {
    pub fn name(&self) -> &'static str {
        match self {
            IssueKind::UnparseableDate { .. } => "unparseable_date",
            IssueKind::MalformedCoordinate { .. } => "malformed_coordinate",
            IssueKind::InvalidNumber { .. } => "invalid_number",
            IssueKind::NegativePrecipitation { .. } => "negative_precipitation",
            IssueKind::InvertedDateRange => "inverted_date_range",
            IssueKind::DuplicateObservation => "duplicate_observation",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::UnparseableDate { column, value } => {
                write!(f, "unparseable date '{value}' in {column}")
            }
            IssueKind::MalformedCoordinate { value, reason } => {
                write!(f, "malformed coordinate '{value}': {reason}")
            }
            IssueKind::InvalidNumber { column, value } => {
                write!(f, "invalid number '{value}' in {column}")
            }
            IssueKind::NegativePrecipitation { value } => {
                write!(f, "negative precipitation '{value}'")
            }
            IssueKind::InvertedDateRange => f.write_str("start date after end date"),
            IssueKind::DuplicateObservation => f.write_str("duplicate (date, grid) observation"),
        }
    }
}

/// One problem at a zero-based data row of an input table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowIssue {
    pub table: String,
    pub row: usize,
    #[serde(flatten)]
    pub kind: IssueKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub issues: Vec<RowIssue>,
}

impl LoadReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, table: &str, row: usize, kind: IssueKind) {
        self.issues.push(RowIssue {
            table: table.to_string(),
            row,
            kind,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Number of issues of the given kind name in `table`.
    pub fn count(&self, table: &str, kind: &str) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.table == table && issue.kind.name() == kind)
            .count()
    }

    /// Issue counts keyed by (table, kind name).
    pub fn summary(&self) -> BTreeMap<(String, &'static str), usize> {
        let mut counts = BTreeMap::new();
        for issue in &self.issues {
            *counts
                .entry((issue.table.clone(), issue.kind.name()))
                .or_insert(0) += 1;
        }
        counts
    }

    pub fn log_summary(&self) {
        if self.issues.is_empty() {
            info!("All input rows loaded cleanly");
            return;
        }
        for ((table, kind), count) in self.summary() {
            warn!("{table}: {count} row(s) with {kind}");
        }
    }
}
