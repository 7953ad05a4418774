//! Statistics over glucose, insulin and meal records
//!
//! Every function here is total. An empty input produces `0`, which callers
//! cannot tell apart from a genuine zero by value alone; check the input for
//! emptiness when that matters. Non-finite numbers count as `0` in sums.

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::records::{GlucoseReading, InsulinInjection, Meal};
use crate::units::TargetRange;
use crate::window::{select_calendar_day, select_window};

/// Days in the weekly overview window
pub const WEEK_DAYS: u32 = 7;

/// Selectable history periods as (days, label)
pub const HISTORY_PERIODS: [(u32, &str); 4] = [
    (7, "7 Days"),
    (14, "14 Days"),
    (30, "30 Days"),
    (90, "90 Days"),
];

pub(crate) fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Mean glucose rounded to the nearest integer; `0` when there are no readings
pub fn average_glucose(readings: &[GlucoseReading]) -> u32 {
    if readings.is_empty() {
        return 0;
    }
    let sum: f64 = readings.iter().map(|r| finite_or_zero(r.glucose)).sum();
    (sum / readings.len() as f64).round() as u32
}

/// Percentage (0-100, rounded) of readings inside `range`, bounds inclusive;
/// `0` when there are no readings
pub fn time_in_range(readings: &[GlucoseReading], range: &TargetRange) -> u32 {
    if readings.is_empty() {
        return 0;
    }
    let in_range = readings.iter().filter(|r| range.contains(r.glucose)).count();
    ((in_range as f64 / readings.len() as f64) * 100.0).round() as u32
}

/// Sum of insulin units
pub fn total_insulin(injections: &[InsulinInjection]) -> f64 {
    injections.iter().map(|i| finite_or_zero(i.units)).sum()
}

/// Sum of carbohydrate grams
pub fn total_carbs(meals: &[Meal]) -> f64 {
    meals.iter().map(|m| finite_or_zero(m.carbs)).sum()
}

/// Insulin per day over a period, rounded to one decimal.
///
/// The divisor is the period length, so days without injections lower the
/// average. A zero-length period gives `0`.
pub fn average_daily_insulin(injections: &[InsulinInjection], period_days: u32) -> f64 {
    if period_days == 0 {
        return 0.0;
    }
    round_to_tenth(total_insulin(injections) / f64::from(period_days))
}

/// Carbs per day over a period, rounded to the nearest gram. Same divisor rule
/// as [`average_daily_insulin`].
pub fn average_daily_carbs(meals: &[Meal], period_days: u32) -> f64 {
    if period_days == 0 {
        return 0.0;
    }
    (total_carbs(meals) / f64::from(period_days)).round()
}

/// Today's figures for the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DailyStats {
    pub avg_glucose: u32,
    pub time_in_range: u32,
    pub total_insulin: f64,
    pub total_carbs: f64,
}

impl DailyStats {
    /// Glucose uses the one-day trailing window (back to yesterday's midnight);
    /// insulin and carbs use the calendar day of `now`.
    pub fn compute<Tz: TimeZone>(
        readings: &[GlucoseReading],
        injections: &[InsulinInjection],
        meals: &[Meal],
        range: &TargetRange,
        now: &DateTime<Tz>,
    ) -> Self {
        let recent = select_window(readings, 1, now);
        Self {
            avg_glucose: average_glucose(&recent),
            time_in_range: time_in_range(&recent, range),
            total_insulin: total_insulin(&select_calendar_day(injections, now)),
            total_carbs: total_carbs(&select_calendar_day(meals, now)),
        }
    }
}

/// Seven-day glucose overview
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WeeklyStats {
    pub avg_glucose: u32,
    pub time_in_range: u32,
}

impl WeeklyStats {
    pub fn compute<Tz: TimeZone>(
        readings: &[GlucoseReading],
        range: &TargetRange,
        now: &DateTime<Tz>,
    ) -> Self {
        let week = select_window(readings, WEEK_DAYS, now);
        Self {
            avg_glucose: average_glucose(&week),
            time_in_range: time_in_range(&week, range),
        }
    }
}

/// Figures for the history view over a chosen period
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HistoryStats {
    pub avg_glucose: u32,
    pub time_in_range: u32,
    pub total_readings: usize,
    pub avg_daily_insulin: f64,
    pub avg_daily_carbs: f64,
}

impl HistoryStats {
    /// All three collections are cut to the same trailing window first
    pub fn compute<Tz: TimeZone>(
        readings: &[GlucoseReading],
        injections: &[InsulinInjection],
        meals: &[Meal],
        range: &TargetRange,
        period_days: u32,
        now: &DateTime<Tz>,
    ) -> Self {
        let readings = select_window(readings, period_days, now);
        let injections = select_window(injections, period_days, now);
        let meals = select_window(meals, period_days, now);
        Self::from_period(&readings, &injections, &meals, range, period_days)
    }

    /// Compute from collections already restricted to the period
    pub fn from_period(
        readings: &[GlucoseReading],
        injections: &[InsulinInjection],
        meals: &[Meal],
        range: &TargetRange,
        period_days: u32,
    ) -> Self {
        Self {
            avg_glucose: average_glucose(readings),
            time_in_range: time_in_range(readings, range),
            total_readings: readings.len(),
            avg_daily_insulin: average_daily_insulin(injections, period_days),
            avg_daily_carbs: average_daily_carbs(meals, period_days),
        }
    }
}
