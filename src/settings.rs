//! Persistent user settings

use serde::{Deserialize, Serialize};

use crate::error::GlucologError;
use crate::units::{GlucoseUnit, TargetRange};

/// User preferences. Missing keys in a stored blob fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub name: String,
    pub glucose_unit: GlucoseUnit,
    pub target_range: TargetRange,
    pub reminder_enabled: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            glucose_unit: GlucoseUnit::MgDl,
            target_range: TargetRange::default(),
            reminder_enabled: true,
        }
    }
}

/// Partial settings change; `None` keeps the current value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub name: Option<String>,
    pub glucose_unit: Option<GlucoseUnit>,
    pub target_min: Option<f64>,
    pub target_max: Option<f64>,
    pub reminder_enabled: Option<bool>,
}

impl SettingsUpdate {
    /// Merge over `current`. The merged target range must keep `min < max`.
    pub fn apply(&self, current: &UserSettings) -> Result<UserSettings, GlucologError> {
        let mut merged = current.clone();
        if let Some(name) = &self.name {
            merged.name = name.trim().to_string();
        }
        if let Some(unit) = self.glucose_unit {
            merged.glucose_unit = unit;
        }
        if let Some(min) = self.target_min {
            merged.target_range.min = min;
        }
        if let Some(max) = self.target_max {
            merged.target_range.max = max;
        }
        if let Some(enabled) = self.reminder_enabled {
            merged.reminder_enabled = enabled;
        }

        if !merged.target_range.is_valid() {
            return Err(GlucologError::InvalidInput(format!(
                "target minimum ({}) must be less than maximum ({})",
                merged.target_range.min, merged.target_range.max
            )));
        }
        Ok(merged)
    }

    /// Build an update from a `key value` pair as typed on the command line
    pub fn from_key_value(key: &str, value: &str) -> Result<Self, GlucologError> {
        let mut update = Self::default();
        match key {
            "name" => update.name = Some(value.to_string()),
            "unit" => {
                update.glucose_unit = Some(GlucoseUnit::parse(value).ok_or_else(|| {
                    GlucologError::InvalidInput(format!("unknown unit: {}", value))
                })?)
            }
            "target-min" => update.target_min = Some(parse_number(key, value)?),
            "target-max" => update.target_max = Some(parse_number(key, value)?),
            "reminders" => {
                update.reminder_enabled = Some(match value {
                    "on" | "true" | "1" => true,
                    "off" | "false" | "0" => false,
                    _ => {
                        return Err(GlucologError::InvalidInput(format!(
                            "reminders must be on or off, got {}",
                            value
                        )))
                    }
                })
            }
            _ => return Err(GlucologError::Usage(format!("unknown setting: {}", key))),
        }
        Ok(update)
    }
}

fn parse_number(key: &str, value: &str) -> Result<f64, GlucologError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            GlucologError::InvalidInput(format!("{} must be a number, got {}", key, value))
        })
}
