//! Dashboard and history views assembled from a record snapshot

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::chart::{build_daily_series, DailySeries};
use crate::error::GlucologError;
use crate::insights::{generate_insights, Insight};
use crate::records::{GlucoseReading, InsulinInjection, Meal, Record};
use crate::settings::UserSettings;
use crate::stats::{DailyStats, HistoryStats, WeeklyStats};
use crate::storage::RecordSource;
use crate::units::{classify, GlucoseCategory};
use crate::window::select_window;

/// All collections read at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub glucose_readings: Vec<GlucoseReading>,
    pub insulin_injections: Vec<InsulinInjection>,
    pub meals: Vec<Meal>,
    pub settings: UserSettings,
}

impl Snapshot {
    pub fn load<S: RecordSource + ?Sized>(source: &S) -> Result<Self, GlucologError> {
        Ok(Self {
            glucose_readings: source.fetch_glucose_readings()?,
            insulin_injections: source.fetch_insulin_injections()?,
            meals: source.fetch_meals()?,
            settings: source.fetch_user_settings()?,
        })
    }
}

/// Home view: latest reading, today and the past week
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub latest: Option<GlucoseReading>,
    pub latest_category: Option<GlucoseCategory>,
    pub today: DailyStats,
    pub week: WeeklyStats,
}

impl Dashboard {
    pub fn compute<Tz: TimeZone>(snapshot: &Snapshot, now: &DateTime<Tz>) -> Self {
        let range = &snapshot.settings.target_range;
        let latest = snapshot
            .glucose_readings
            .iter()
            .max_by_key(|r| r.timestamp())
            .cloned();

        Self {
            latest_category: latest.as_ref().map(|r| classify(r.glucose)),
            latest,
            today: DailyStats::compute(
                &snapshot.glucose_readings,
                &snapshot.insulin_injections,
                &snapshot.meals,
                range,
                now,
            ),
            week: WeeklyStats::compute(&snapshot.glucose_readings, range, now),
        }
    }
}

/// History view for one period
#[derive(Debug, Clone, Serialize)]
pub struct HistoryReport {
    pub period_days: u32,
    pub stats: HistoryStats,
    pub series: DailySeries,
    pub insights: Vec<Insight>,
}

impl HistoryReport {
    pub fn compute<Tz: TimeZone>(
        snapshot: &Snapshot,
        period_days: u32,
        now: &DateTime<Tz>,
    ) -> Self {
        let readings = select_window(&snapshot.glucose_readings, period_days, now);
        let injections = select_window(&snapshot.insulin_injections, period_days, now);
        let meals = select_window(&snapshot.meals, period_days, now);

        let stats = HistoryStats::from_period(
            &readings,
            &injections,
            &meals,
            &snapshot.settings.target_range,
            period_days,
        );

        Self {
            period_days,
            stats,
            series: build_daily_series(&readings, &now.timezone()),
            insights: generate_insights(&stats, period_days),
        }
    }

    pub fn insight_messages(&self) -> Vec<&'static str> {
        self.insights.iter().map(|i| i.message()).collect()
    }
}

/// e.g. "Mar 5, 2024"
pub fn format_date<Tz: TimeZone>(ts: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    ts.format("%b %-d, %Y").to_string()
}

/// e.g. "08:05 PM"
pub fn format_time<Tz: TimeZone>(ts: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    ts.format("%I:%M %p").to_string()
}

pub fn format_date_time<Tz: TimeZone>(ts: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{} {}", format_date(ts), format_time(ts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{InsulinType, MealType};
    use crate::storage::Storage;
    use chrono::{Duration, Utc};

    fn noon() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-08-20T12:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn reading(id: &str, ts: DateTime<Utc>, glucose: f64) -> GlucoseReading {
        GlucoseReading { id: id.to_string(), timestamp: ts, glucose, notes: None }
    }

    #[test]
    fn test_two_readings_today_scenario() {
        let now = noon();
        let snapshot = Snapshot {
            glucose_readings: vec![
                reading("a", now - Duration::hours(1), 190.0),
                reading("b", now - Duration::hours(2), 90.0),
            ],
            ..Default::default()
        };

        let report = HistoryReport::compute(&snapshot, 7, &now);
        assert_eq!(report.stats.avg_glucose, 140);
        assert_eq!(report.stats.time_in_range, 50);

        let glucose_level: Vec<_> = report
            .insights
            .iter()
            .filter(|i| {
                matches!(i, Insight::HighAverage | Insight::LowAverage | Insight::GoodAverage)
            })
            .collect();
        assert_eq!(glucose_level, vec![&Insight::GoodAverage]);
        assert!(report.insights.contains(&Insight::RoomToImprove));
        assert!(!report.insights.contains(&Insight::ExcellentTimeInRange));

        assert_eq!(report.series.labels, vec!["8/20"]);
        assert_eq!(report.series.values, vec![140.0]);
    }

    #[test]
    fn test_empty_period() {
        let report = HistoryReport::compute(&Snapshot::default(), 30, &noon());
        assert_eq!(report.stats, HistoryStats::default());
        assert!(report.insights.is_empty());
        assert!(report.series.labels.is_empty());
        assert!(report.series.values.is_empty());

        let dashboard = Dashboard::compute(&Snapshot::default(), &noon());
        assert!(dashboard.latest.is_none());
        assert_eq!(dashboard.today, DailyStats::default());
        assert_eq!(dashboard.week, WeeklyStats::default());
    }

    #[test]
    fn test_history_excludes_older_records() {
        let now = noon();
        let snapshot = Snapshot {
            glucose_readings: vec![
                reading("new", now, 100.0),
                reading("old", now - Duration::days(20), 300.0),
            ],
            ..Default::default()
        };
        let report = HistoryReport::compute(&snapshot, 14, &now);
        assert_eq!(report.stats.total_readings, 1);
        assert_eq!(report.series.len(), 1);
        // one reading in 14 days
        assert_eq!(report.insights.last(), Some(&Insight::CheckMoreOften));
    }

    #[test]
    fn test_dashboard_from_storage() {
        let now = chrono::Utc::now();
        let storage = Storage::open_in_memory().unwrap();
        storage.add_glucose_reading(&reading("early", now - Duration::minutes(30), 60.0)).unwrap();
        storage.add_glucose_reading(&reading("late", now, 95.0)).unwrap();
        storage
            .add_insulin_injection(
                &InsulinInjection::new(3.0, InsulinType::RapidActing, None).unwrap(),
            )
            .unwrap();
        storage.add_meal(&Meal::new("Toast", 30.0, MealType::Breakfast, None).unwrap()).unwrap();

        let snapshot = Snapshot::load(&storage).unwrap();
        let dashboard = Dashboard::compute(&snapshot, &now.with_timezone(&chrono::Local));
        assert_eq!(dashboard.latest.as_ref().map(|r| r.id.as_str()), Some("late"));
        assert_eq!(dashboard.latest_category.map(|c| c.label), Some("Normal"));
        assert_eq!(dashboard.week.avg_glucose, 78);
        assert_eq!(dashboard.week.time_in_range, 50);
    }

    #[test]
    fn test_target_range_from_settings() {
        let now = noon();
        let mut snapshot = Snapshot {
            glucose_readings: vec![reading("a", now, 170.0)],
            ..Default::default()
        };
        assert_eq!(HistoryReport::compute(&snapshot, 7, &now).stats.time_in_range, 0);
        snapshot.settings.target_range.max = 180.0;
        assert_eq!(HistoryReport::compute(&snapshot, 7, &now).stats.time_in_range, 100);
    }

    #[test]
    fn test_formatting() {
        let ts = DateTime::parse_from_rfc3339("2024-03-05T20:05:00Z").unwrap().with_timezone(&Utc);
        assert_eq!(format_date(&ts), "Mar 5, 2024");
        assert_eq!(format_time(&ts), "08:05 PM");
        assert_eq!(format_date_time(&ts), "Mar 5, 2024 08:05 PM");
    }
}
