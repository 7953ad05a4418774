//! Glucose units, target range and severity categories
//!
//! All values are kept in mg/dL. The display unit only changes how a value is
//! rendered; statistics never convert.
//!
//! Two different notions of "range" live here and must not be mixed up:
//! the user's [`TargetRange`] drives time-in-range math, while the fixed
//! [`GlucoseCategory`] table only picks a display color.

use serde::{Deserialize, Serialize};

/// mg/dL per mmol/L, used for display only
pub const MGDL_PER_MMOL: f64 = 18.0;

/// User's preferred display unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GlucoseUnit {
    #[serde(rename = "mg/dL")]
    #[default]
    MgDl,
    #[serde(rename = "mmol/L")]
    MmolL,
}

impl GlucoseUnit {
    /// Get the display value for an mg/dL reading
    pub fn display_value(self, mg_dl: f64) -> f64 {
        match self {
            GlucoseUnit::MgDl => mg_dl,
            GlucoseUnit::MmolL => mg_dl / MGDL_PER_MMOL,
        }
    }

    /// Format an mg/dL reading with unit suffix
    pub fn format(self, mg_dl: f64) -> String {
        match self {
            GlucoseUnit::MgDl => format!("{:.0} mg/dL", mg_dl),
            GlucoseUnit::MmolL => format!("{:.1} mmol/L", self.display_value(mg_dl)),
        }
    }

    /// Get the unit label
    pub fn label(self) -> &'static str {
        match self {
            GlucoseUnit::MgDl => "mg/dL",
            GlucoseUnit::MmolL => "mmol/L",
        }
    }

    /// Parse a unit label as typed on the command line
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mg/dl" | "mgdl" => Some(GlucoseUnit::MgDl),
            "mmol/l" | "mmol" => Some(GlucoseUnit::MmolL),
            _ => None,
        }
    }
}

/// User-configured target band for time-in-range, in mg/dL.
///
/// Callers keep `min < max`; the aggregator does not check it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetRange {
    pub min: f64,
    pub max: f64,
}

impl Default for TargetRange {
    fn default() -> Self {
        Self { min: 80.0, max: 140.0 }
    }
}

impl TargetRange {
    /// Both bounds are inclusive
    pub fn contains(&self, glucose: f64) -> bool {
        glucose >= self.min && glucose <= self.max
    }

    pub fn is_valid(&self) -> bool {
        self.min < self.max
    }

    pub fn format(&self, unit: GlucoseUnit) -> String {
        match unit {
            GlucoseUnit::MgDl => format!("{:.0}-{:.0} mg/dL", self.min, self.max),
            GlucoseUnit::MmolL => format!(
                "{:.1}-{:.1} mmol/L",
                unit.display_value(self.min),
                unit.display_value(self.max)
            ),
        }
    }
}

/// Named severity bucket used to color a glucose value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GlucoseCategory {
    pub min: f64,
    pub max: f64,
    pub label: &'static str,
    pub color: &'static str,
}

pub const LOW: GlucoseCategory = GlucoseCategory {
    min: 0.0,
    max: 80.0,
    label: "Low",
    color: "#2196F3",
};
pub const NORMAL: GlucoseCategory = GlucoseCategory {
    min: 80.0,
    max: 140.0,
    label: "Normal",
    color: "#4CAF50",
};
pub const HIGH: GlucoseCategory = GlucoseCategory {
    min: 140.0,
    max: 180.0,
    label: "High",
    color: "#FF9800",
};
pub const VERY_HIGH: GlucoseCategory = GlucoseCategory {
    min: 180.0,
    max: 400.0,
    label: "Very High",
    color: "#FF5252",
};

pub const GLUCOSE_CATEGORIES: [GlucoseCategory; 4] = [LOW, NORMAL, HIGH, VERY_HIGH];

/// Classify a reading for display.
///
/// Only the two extremes are split out: below 80 is Low, above 400 is Very
/// High, and everything from 80 to 400 inclusive is Normal. [`HIGH`] is part
/// of the table but never returned here (known inconsistency with the table).
pub fn classify(glucose: f64) -> GlucoseCategory {
    if glucose < LOW.max {
        LOW
    } else if glucose > VERY_HIGH.max {
        VERY_HIGH
    } else {
        NORMAL
    }
}

/// Display color for a reading
pub fn glucose_color(glucose: f64) -> &'static str {
    classify(glucose).color
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_extremes() {
        assert_eq!(classify(70.0).label, "Low");
        assert_eq!(classify(500.0).label, "Very High");
        assert_eq!(classify(79.9).label, "Low");
    }

    #[test]
    fn test_classify_middle_is_normal() {
        // High is never produced by classify
        assert_eq!(classify(200.0).label, "Normal");
        assert_eq!(classify(80.0).label, "Normal");
        assert_eq!(classify(150.0).label, "Normal");
        assert_eq!(classify(400.0).label, "Normal");
        assert_eq!(classify(400.5).label, "Very High");
    }

    #[test]
    fn test_glucose_color() {
        assert_eq!(glucose_color(60.0), "#2196F3");
        assert_eq!(glucose_color(120.0), "#4CAF50");
        assert_eq!(glucose_color(450.0), "#FF5252");
    }

    #[test]
    fn test_target_range_inclusive() {
        let range = TargetRange::default();
        assert!(range.contains(80.0));
        assert!(range.contains(140.0));
        assert!(!range.contains(79.0));
        assert!(!range.contains(141.0));
        assert!(range.is_valid());
        assert!(!TargetRange { min: 140.0, max: 80.0 }.is_valid());
    }

    #[test]
    fn test_unit_format() {
        assert_eq!(GlucoseUnit::MgDl.format(180.0), "180 mg/dL");
        assert_eq!(GlucoseUnit::MmolL.format(180.0), "10.0 mmol/L");
        assert_eq!(TargetRange::default().format(GlucoseUnit::MgDl), "80-140 mg/dL");
    }

    #[test]
    fn test_unit_serde_labels() {
        assert_eq!(serde_json::to_string(&GlucoseUnit::MgDl).unwrap(), "\"mg/dL\"");
        let unit: GlucoseUnit = serde_json::from_str("\"mmol/L\"").unwrap();
        assert_eq!(unit, GlucoseUnit::MmolL);
        assert_eq!(GlucoseUnit::parse("MMOL"), Some(GlucoseUnit::MmolL));
    }
}
