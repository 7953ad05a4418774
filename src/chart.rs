//! Daily glucose series for line charts

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::records::GlucoseReading;
use crate::stats::finite_or_zero;

/// One plottable line: a `month/day` label and mean glucose per day
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DailySeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl DailySeries {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Iterate `(label, value)` pairs in date order
    pub fn points(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.labels.iter().map(String::as_str).zip(self.values.iter().copied())
    }
}

/// Bucket readings by their local date in `tz` and average each day.
///
/// Days are emitted in ascending order; days without readings are skipped.
/// Means are not rounded. Non-finite readings count as 0, as in
/// [`average_glucose`](crate::stats::average_glucose).
pub fn build_daily_series<Tz: TimeZone>(readings: &[GlucoseReading], tz: &Tz) -> DailySeries {
    let mut days: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();

    for reading in readings {
        let date = reading.timestamp.with_timezone(tz).date_naive();
        let entry = days.entry(date).or_insert((0.0, 0));
        entry.0 += finite_or_zero(reading.glucose);
        entry.1 += 1;
    }

    let mut series = DailySeries::default();
    for (date, (sum, count)) in days {
        series.labels.push(format!("{}/{}", date.month(), date.day()));
        series.values.push(sum / count as f64);
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset, Utc};

    fn reading(ts: &str, glucose: f64) -> GlucoseReading {
        let timestamp = DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc);
        GlucoseReading { id: ts.to_string(), timestamp, glucose, notes: None }
    }

    #[test]
    fn test_single_day_mean() {
        let readings = vec![
            reading("2024-06-03T08:00:00Z", 100.0),
            reading("2024-06-03T20:00:00Z", 200.0),
        ];
        let series = build_daily_series(&readings, &Utc);
        assert_eq!(series.labels, vec!["6/3"]);
        assert_eq!(series.values, vec![150.0]);
    }

    #[test]
    fn test_days_sorted_ascending() {
        // newest-first input, spanning a month boundary
        let readings = vec![
            reading("2024-07-02T09:00:00Z", 130.0),
            reading("2024-07-01T09:00:00Z", 110.0),
            reading("2024-06-30T09:00:00Z", 90.0),
            reading("2024-06-30T19:00:00Z", 95.0),
        ];
        let series = build_daily_series(&readings, &Utc);
        assert_eq!(series.labels, vec!["6/30", "7/1", "7/2"]);
        assert_eq!(series.values, vec![92.5, 110.0, 130.0]);
        assert_eq!(series.labels.len(), series.values.len());
    }

    #[test]
    fn test_year_boundary_orders_by_date_not_label() {
        let readings = vec![
            reading("2025-01-02T12:00:00Z", 120.0),
            reading("2024-12-31T12:00:00Z", 100.0),
        ];
        let series = build_daily_series(&readings, &Utc);
        assert_eq!(series.labels, vec!["12/31", "1/2"]);
    }

    #[test]
    fn test_bucketing_follows_time_zone() {
        let readings = vec![
            reading("2024-06-03T22:00:00Z", 100.0),
            reading("2024-06-04T02:00:00Z", 200.0),
        ];
        assert_eq!(build_daily_series(&readings, &Utc).len(), 2);

        let tz = FixedOffset::east_opt(3 * 3600).unwrap();
        let series = build_daily_series(&readings, &tz);
        assert_eq!(series.labels, vec!["6/4"]);
        assert_eq!(series.values, vec![150.0]);
    }

    #[test]
    fn test_non_finite_reading_counts_as_zero() {
        let readings = vec![
            reading("2024-06-03T08:00:00Z", 100.0),
            reading("2024-06-03T09:00:00Z", f64::NAN),
            reading("2024-06-04T09:00:00Z", f64::INFINITY),
        ];
        let series = build_daily_series(&readings, &Utc);
        assert_eq!(series.values, vec![50.0, 0.0]);
        assert_eq!(crate::stats::average_glucose(&readings[..2]), 50);
    }

    #[test]
    fn test_empty_series() {
        let series = build_daily_series(&[], &Utc);
        assert!(series.is_empty());
        assert!(series.values.is_empty());
        assert_eq!(series.points().count(), 0);
    }
}
