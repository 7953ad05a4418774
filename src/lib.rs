//! glucolog: glucose, insulin and meal log with statistics and insights
//!
//! Records live in a SQLite [`storage::Storage`]. Everything between loading
//! a [`report::Snapshot`] and displaying results is pure: window selection,
//! aggregation, chart series and insights are plain functions over slices.

pub mod chart;
pub mod config;
pub mod error;
pub mod export;
pub mod insights;
pub mod records;
pub mod report;
pub mod settings;
pub mod stats;
pub mod storage;
pub mod units;
pub mod window;

pub use chart::{build_daily_series, DailySeries};
pub use error::GlucologError;
pub use insights::{generate_insights, Insight};
pub use records::{GlucoseReading, InsulinInjection, InsulinType, Meal, MealType, Record};
pub use stats::{
    average_daily_carbs, average_daily_insulin, average_glucose, time_in_range, total_carbs,
    total_insulin, DailyStats, HistoryStats, WeeklyStats,
};
pub use units::{classify, glucose_color, GlucoseCategory, GlucoseUnit, TargetRange};
pub use window::{select_calendar_day, select_window};
