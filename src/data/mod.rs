//! Data module - CSV loading, schema checks and typed records

mod base;
mod loader;
pub mod records;
mod report;
pub mod schema;

pub use base::BaseTables;
pub use loader::{optional_text_column, text_column, DataLoader, LoaderError};
pub use report::{IssueKind, LoadReport, RowIssue};
