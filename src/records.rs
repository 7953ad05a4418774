//! Record kinds: glucose readings, insulin injections and meals
//!
//! Every record carries an opaque id, the instant it was logged and optional
//! notes. The shared shape is exposed through [`Record`] so window filters can
//! work over any kind.
//!
//! Value checks live in the `validate_*` functions and are applied by the
//! constructors and patches. Records read back from storage or an import are
//! trusted as-is.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GlucologError;

pub const GLUCOSE_MIN_MGDL: f64 = 20.0;
pub const GLUCOSE_MAX_MGDL: f64 = 600.0;
pub const INSULIN_MAX_UNITS: f64 = 100.0;
pub const CARBS_MAX_GRAMS: f64 = 300.0;

/// Shared shape of all record kinds
pub trait Record {
    fn id(&self) -> &str;
    fn timestamp(&self) -> DateTime<Utc>;
    fn notes(&self) -> Option<&str>;
}

/// A blood glucose reading in mg/dL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlucoseReading {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub glucose: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsulinType {
    RapidActing,
    LongActing,
}

impl InsulinType {
    pub fn label(self) -> &'static str {
        match self {
            InsulinType::RapidActing => "Rapid-acting",
            InsulinType::LongActing => "Long-acting",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InsulinType::RapidActing => "rapid_acting",
            InsulinType::LongActing => "long_acting",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rapid" | "rapid_acting" | "rapid-acting" => Some(InsulinType::RapidActing),
            "long" | "long_acting" | "long-acting" => Some(InsulinType::LongActing),
            _ => None,
        }
    }
}

/// An insulin injection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsulinInjection {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub units: f64,
    #[serde(rename = "type")]
    pub kind: InsulinType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub fn label(self) -> &'static str {
        match self {
            MealType::Breakfast => "Breakfast",
            MealType::Lunch => "Lunch",
            MealType::Dinner => "Dinner",
            MealType::Snack => "Snack",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "breakfast" => Some(MealType::Breakfast),
            "lunch" => Some(MealType::Lunch),
            "dinner" => Some(MealType::Dinner),
            "snack" => Some(MealType::Snack),
            _ => None,
        }
    }
}

/// A logged meal. Missing `carbs` in stored JSON reads as 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub name: String,
    #[serde(default)]
    pub carbs: f64,
    #[serde(rename = "type")]
    pub kind: MealType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Record for GlucoseReading {
    fn id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

impl Record for InsulinInjection {
    fn id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

impl Record for Meal {
    fn id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Timestamps are kept to millisecond precision, matching storage
fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Blank notes are stored as no notes
fn clean_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

impl GlucoseReading {
    /// Create a validated reading stamped with the current time
    pub fn new(glucose: f64, notes: Option<String>) -> Result<Self, GlucologError> {
        Ok(Self {
            id: new_id(),
            timestamp: now_millis(),
            glucose: validate_glucose(glucose)?,
            notes: clean_notes(notes),
        })
    }
}

impl InsulinInjection {
    /// Create a validated injection stamped with the current time
    pub fn new(
        units: f64,
        kind: InsulinType,
        notes: Option<String>,
    ) -> Result<Self, GlucologError> {
        Ok(Self {
            id: new_id(),
            timestamp: now_millis(),
            units: validate_insulin_dose(units)?,
            kind,
            notes: clean_notes(notes),
        })
    }
}

impl Meal {
    /// Create a validated meal stamped with the current time
    pub fn new(
        name: &str,
        carbs: f64,
        kind: MealType,
        notes: Option<String>,
    ) -> Result<Self, GlucologError> {
        Ok(Self {
            id: new_id(),
            timestamp: now_millis(),
            name: validate_meal_name(name)?,
            carbs: validate_carb_amount(carbs)?,
            kind,
            notes: clean_notes(notes),
        })
    }
}

pub fn validate_glucose(glucose: f64) -> Result<f64, GlucologError> {
    if (GLUCOSE_MIN_MGDL..=GLUCOSE_MAX_MGDL).contains(&glucose) {
        Ok(glucose)
    } else {
        Err(GlucologError::InvalidInput(format!(
            "glucose must be between {} and {} mg/dL, got {}",
            GLUCOSE_MIN_MGDL, GLUCOSE_MAX_MGDL, glucose
        )))
    }
}

pub fn validate_insulin_dose(units: f64) -> Result<f64, GlucologError> {
    if units > 0.0 && units <= INSULIN_MAX_UNITS {
        Ok(units)
    } else {
        Err(GlucologError::InvalidInput(format!(
            "insulin dose must be above 0 and at most {} units, got {}",
            INSULIN_MAX_UNITS, units
        )))
    }
}

pub fn validate_carb_amount(carbs: f64) -> Result<f64, GlucologError> {
    if (0.0..=CARBS_MAX_GRAMS).contains(&carbs) {
        Ok(carbs)
    } else {
        Err(GlucologError::InvalidInput(format!(
            "carbs must be between 0 and {} g, got {}",
            CARBS_MAX_GRAMS, carbs
        )))
    }
}

pub fn validate_meal_name(name: &str) -> Result<String, GlucologError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GlucologError::InvalidInput("meal name must not be empty".to_string()));
    }
    Ok(name.to_string())
}

/// Partial update of a glucose reading. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlucosePatch {
    pub glucose: Option<f64>,
    pub notes: Option<String>,
}

impl GlucosePatch {
    /// Produce the updated reading; id and timestamp are kept
    pub fn apply(&self, reading: &GlucoseReading) -> Result<GlucoseReading, GlucologError> {
        let mut updated = reading.clone();
        if let Some(glucose) = self.glucose {
            updated.glucose = validate_glucose(glucose)?;
        }
        if let Some(notes) = &self.notes {
            updated.notes = clean_notes(Some(notes.clone()));
        }
        Ok(updated)
    }
}

/// Partial update of an insulin injection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InjectionPatch {
    pub units: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Option<InsulinType>,
    pub notes: Option<String>,
}

impl InjectionPatch {
    pub fn apply(&self, injection: &InsulinInjection) -> Result<InsulinInjection, GlucologError> {
        let mut updated = injection.clone();
        if let Some(units) = self.units {
            updated.units = validate_insulin_dose(units)?;
        }
        if let Some(kind) = self.kind {
            updated.kind = kind;
        }
        if let Some(notes) = &self.notes {
            updated.notes = clean_notes(Some(notes.clone()));
        }
        Ok(updated)
    }
}

/// Partial update of a meal
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MealPatch {
    pub name: Option<String>,
    pub carbs: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Option<MealType>,
    pub notes: Option<String>,
}

impl MealPatch {
    pub fn apply(&self, meal: &Meal) -> Result<Meal, GlucologError> {
        let mut updated = meal.clone();
        if let Some(name) = &self.name {
            updated.name = validate_meal_name(name)?;
        }
        if let Some(carbs) = self.carbs {
            updated.carbs = validate_carb_amount(carbs)?;
        }
        if let Some(kind) = self.kind {
            updated.kind = kind;
        }
        if let Some(notes) = &self.notes {
            updated.notes = clean_notes(Some(notes.clone()));
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_bounds() {
        assert!(validate_glucose(20.0).is_ok());
        assert!(validate_glucose(600.0).is_ok());
        assert!(validate_glucose(19.9).is_err());
        assert!(validate_glucose(f64::NAN).is_err());

        assert!(validate_insulin_dose(0.1).is_ok());
        assert!(validate_insulin_dose(100.0).is_ok());
        assert!(validate_insulin_dose(0.0).is_err());

        assert!(validate_carb_amount(0.0).is_ok());
        assert!(validate_carb_amount(300.0).is_ok());
        assert!(validate_carb_amount(301.0).is_err());

        assert!(validate_meal_name("   ").is_err());
        assert_eq!(validate_meal_name(" Toast ").unwrap(), "Toast");
    }

    #[test]
    fn test_new_records_get_unique_ids() {
        let a = GlucoseReading::new(110.0, None).unwrap();
        let b = GlucoseReading::new(110.0, Some("  ".to_string())).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(b.notes, None);
        assert!(Meal::new("", 10.0, MealType::Snack, None).is_err());
    }

    #[test]
    fn test_json_shape() {
        let injection = InsulinInjection::new(4.5, InsulinType::RapidActing, None).unwrap();
        let json = serde_json::to_value(&injection).unwrap();
        assert_eq!(json["type"], "rapid_acting");
        assert_eq!(json["units"], 4.5);
        assert!(json.get("notes").is_none());

        let notes = Some("with berries".to_string());
        let meal = Meal::new("Oatmeal", 45.0, MealType::Breakfast, notes).unwrap();
        let json = serde_json::to_value(&meal).unwrap();
        assert_eq!(json["type"], "breakfast");
        assert_eq!(json["notes"], "with berries");
    }

    #[test]
    fn test_missing_carbs_reads_as_zero() {
        let meal: Meal = serde_json::from_str(
            r#"{"id":"1","timestamp":"2024-03-01T12:00:00Z","name":"Tea","type":"snack"}"#,
        )
        .unwrap();
        assert_eq!(meal.carbs, 0.0);
        assert_eq!(meal.kind, MealType::Snack);
    }

    #[test]
    fn test_patch_keeps_identity() {
        let reading = GlucoseReading::new(120.0, None).unwrap();
        let patch = GlucosePatch { glucose: Some(130.0), notes: Some("after walk".into()) };
        let updated = patch.apply(&reading).unwrap();
        assert_eq!(updated.id, reading.id);
        assert_eq!(updated.timestamp, reading.timestamp);
        assert_eq!(updated.glucose, 130.0);
        assert_eq!(updated.notes(), Some("after walk"));

        let bad = GlucosePatch { glucose: Some(5.0), notes: None };
        assert!(bad.apply(&reading).is_err());
    }

    #[test]
    fn test_meal_patch() {
        let meal = Meal::new("Salad", 20.0, MealType::Lunch, None).unwrap();
        let patch = MealPatch {
            carbs: Some(25.0),
            kind: Some(MealType::Dinner),
            ..Default::default()
        };
        let updated = patch.apply(&meal).unwrap();
        assert_eq!(updated.name, "Salad");
        assert_eq!(updated.carbs, 25.0);
        assert_eq!(updated.kind, MealType::Dinner);
    }

    #[test]
    fn test_type_parsing() {
        assert_eq!(InsulinType::parse("rapid"), Some(InsulinType::RapidActing));
        assert_eq!(InsulinType::parse("Long-Acting"), Some(InsulinType::LongActing));
        assert_eq!(MealType::parse("SNACK"), Some(MealType::Snack));
        assert_eq!(MealType::parse("brunch"), None);
    }
}
