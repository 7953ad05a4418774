//! Guidance messages derived from history statistics

use std::fmt;

use serde::Serialize;

use crate::stats::HistoryStats;

/// Average glucose above this is reported as high
pub const HIGH_AVERAGE_MGDL: u32 = 180;
/// Average glucose below this is reported as low
pub const LOW_AVERAGE_MGDL: u32 = 80;
pub const EXCELLENT_TIR_PERCENT: u32 = 70;
pub const GOOD_TIR_PERCENT: u32 = 50;
/// Fewer readings per day than this suggests checking more often
pub const MIN_READINGS_PER_DAY: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Insight {
    HighAverage,
    LowAverage,
    GoodAverage,
    ExcellentTimeInRange,
    RoomToImprove,
    ConsiderAdjustment,
    CheckMoreOften,
}

impl Insight {
    pub fn message(self) -> &'static str {
        match self {
            Insight::HighAverage => {
                "📈 Your average glucose is high. Consider reviewing your meal timing and insulin doses."
            }
            Insight::LowAverage => {
                "📉 Your average glucose is low. You might need to adjust your insulin doses or meal timing."
            }
            Insight::GoodAverage => {
                "✅ Your average glucose is in a good range. Keep up the great work!"
            }
            Insight::ExcellentTimeInRange => {
                "🎯 Excellent time in range! You're managing your glucose levels well."
            }
            Insight::RoomToImprove => {
                "📊 Good time in range. There's room for improvement in glucose control."
            }
            Insight::ConsiderAdjustment => {
                "⚠️ Time in range could be better. Consider discussing adjustments with your healthcare provider."
            }
            Insight::CheckMoreOften => {
                "📱 Consider checking your glucose more frequently for better management."
            }
        }
    }
}

impl fmt::Display for Insight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Apply the insight rules to a period's statistics.
///
/// At most one average-glucose insight, then at most one time-in-range
/// insight, then the reading-frequency hint. A zero statistic means "no data"
/// and skips its rule, so all-zero stats yield nothing.
pub fn generate_insights(stats: &HistoryStats, period_days: u32) -> Vec<Insight> {
    let mut insights = Vec::new();

    if stats.avg_glucose > 0 {
        if stats.avg_glucose > HIGH_AVERAGE_MGDL {
            insights.push(Insight::HighAverage);
        } else if stats.avg_glucose < LOW_AVERAGE_MGDL {
            insights.push(Insight::LowAverage);
        } else {
            insights.push(Insight::GoodAverage);
        }
    }

    if stats.time_in_range > 0 {
        if stats.time_in_range >= EXCELLENT_TIR_PERCENT {
            insights.push(Insight::ExcellentTimeInRange);
        } else if stats.time_in_range >= GOOD_TIR_PERCENT {
            insights.push(Insight::RoomToImprove);
        } else {
            insights.push(Insight::ConsiderAdjustment);
        }
    }

    // a zero-day period has no meaningful rate
    if stats.total_readings > 0 && period_days > 0 {
        let per_day = stats.total_readings as f64 / f64::from(period_days);
        if per_day < MIN_READINGS_PER_DAY {
            insights.push(Insight::CheckMoreOften);
        }
    }

    insights
}
