//! Stats module - Descriptive statistics and the long-term data story

mod calculator;
mod story;

pub use calculator::{DescriptiveStats, StatsCalculator};
pub use story::{
    build_story, DailyTotal, DataStory, EventWindow, GridDailyTotal, MonthlyRow, YearlyRow,
};
