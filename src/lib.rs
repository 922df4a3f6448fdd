//! Alpine Floods - Flood event and rainfall preparation for dashboard rendering
//!
//! Loads the flood event, rainfall, region and temperature tables once,
//! then derives every table a dashboard renderer needs for a query.

pub mod config;
pub mod data;
pub mod export;
pub mod model;
pub mod pipeline;
pub mod stats;
pub mod wrangle;

pub use config::Config;
pub use data::BaseTables;
pub use pipeline::{derive_dashboard, DashboardQuery, DashboardSettings, DashboardTables};
