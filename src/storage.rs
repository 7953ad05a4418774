//! SQLite storage for glucose readings, insulin injections, meals and settings

use chrono::{DateTime, Utc};
use log::{debug, info};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::path::Path;

use crate::error::GlucologError;
use crate::export::ExportData;
use crate::records::{
    GlucosePatch, GlucoseReading, InjectionPatch, InsulinInjection, InsulinType, Meal, MealPatch,
    MealType,
};
use crate::settings::{SettingsUpdate, UserSettings};

const USER_SETTINGS_KEY: &str = "user_settings";

/// Read access to full, newest-first collection snapshots
pub trait RecordSource {
    fn fetch_glucose_readings(&self) -> Result<Vec<GlucoseReading>, GlucologError>;
    fn fetch_insulin_injections(&self) -> Result<Vec<InsulinInjection>, GlucologError>;
    fn fetch_meals(&self) -> Result<Vec<Meal>, GlucologError>;
    /// Defaults when nothing has been saved
    fn fetch_user_settings(&self) -> Result<UserSettings, GlucologError>;
}

/// Counts of newly inserted records from an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub glucose_readings: usize,
    pub insulin_injections: usize,
    pub meals: usize,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.glucose_readings + self.insulin_injections + self.meals
    }
}

/// SQLite database for storing records
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Create or open a database at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, GlucologError> {
        Self::init(Connection::open(path)?)
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self, GlucologError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, GlucologError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS glucose_readings (
                id TEXT PRIMARY KEY,
                epoch_ms INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                glucose REAL NOT NULL,
                notes TEXT
            );

            CREATE TABLE IF NOT EXISTS insulin_injections (
                id TEXT PRIMARY KEY,
                epoch_ms INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                units REAL NOT NULL,
                kind TEXT NOT NULL,
                notes TEXT
            );

            CREATE TABLE IF NOT EXISTS meals (
                id TEXT PRIMARY KEY,
                epoch_ms INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                name TEXT NOT NULL,
                carbs REAL NOT NULL DEFAULT 0,
                kind TEXT NOT NULL,
                notes TEXT
            );

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_glucose_epoch
                ON glucose_readings(epoch_ms);

            CREATE INDEX IF NOT EXISTS idx_insulin_epoch
                ON insulin_injections(epoch_ms);

            CREATE INDEX IF NOT EXISTS idx_meals_epoch
                ON meals(epoch_ms);",
        )?;

        Ok(Self { conn })
    }

    // ============= Glucose =============

    /// Insert a reading, ignoring duplicates by id. Returns true if inserted.
    pub fn add_glucose_reading(&self, reading: &GlucoseReading) -> Result<bool, GlucologError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO glucose_readings (id, epoch_ms, timestamp, glucose, notes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                reading.id,
                reading.timestamp.timestamp_millis(),
                reading.timestamp.to_rfc3339(),
                reading.glucose,
                reading.notes,
            ],
        )?;
        debug!("Insert glucose reading {}: {}", reading.id, inserted > 0);
        Ok(inserted > 0)
    }

    /// All readings, newest first
    pub fn glucose_readings(&self) -> Result<Vec<GlucoseReading>, GlucologError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, epoch_ms, glucose, notes FROM glucose_readings
             ORDER BY epoch_ms DESC, rowid DESC",
        )?;
        let readings = stmt
            .query_map([], |row| Self::row_to_glucose(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(readings)
    }

    pub fn glucose_reading(&self, id: &str) -> Result<Option<GlucoseReading>, GlucologError> {
        let reading = self
            .conn
            .query_row(
                "SELECT id, epoch_ms, glucose, notes FROM glucose_readings WHERE id = ?1",
                [id],
                |row| Self::row_to_glucose(row),
            )
            .optional()?;
        Ok(reading)
    }

    pub fn update_glucose_reading(
        &self,
        id: &str,
        patch: &GlucosePatch,
    ) -> Result<GlucoseReading, GlucologError> {
        let current = self.glucose_reading(id)?.ok_or_else(|| not_found("glucose", id))?;
        let updated = patch.apply(&current)?;
        self.conn.execute(
            "UPDATE glucose_readings SET glucose = ?1, notes = ?2 WHERE id = ?3",
            params![updated.glucose, updated.notes, id],
        )?;
        Ok(updated)
    }

    /// Returns false if no such reading existed
    pub fn delete_glucose_reading(&self, id: &str) -> Result<bool, GlucologError> {
        let deleted = self.conn.execute("DELETE FROM glucose_readings WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }

    // ============= Insulin =============

    pub fn add_insulin_injection(
        &self,
        injection: &InsulinInjection,
    ) -> Result<bool, GlucologError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO insulin_injections (id, epoch_ms, timestamp, units, kind, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                injection.id,
                injection.timestamp.timestamp_millis(),
                injection.timestamp.to_rfc3339(),
                injection.units,
                injection.kind,
                injection.notes,
            ],
        )?;
        debug!("Insert insulin injection {}: {}", injection.id, inserted > 0);
        Ok(inserted > 0)
    }

    /// All injections, newest first
    pub fn insulin_injections(&self) -> Result<Vec<InsulinInjection>, GlucologError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, epoch_ms, units, kind, notes FROM insulin_injections
             ORDER BY epoch_ms DESC, rowid DESC",
        )?;
        let injections = stmt
            .query_map([], |row| Self::row_to_injection(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(injections)
    }

    pub fn insulin_injection(&self, id: &str) -> Result<Option<InsulinInjection>, GlucologError> {
        let injection = self
            .conn
            .query_row(
                "SELECT id, epoch_ms, units, kind, notes FROM insulin_injections WHERE id = ?1",
                [id],
                |row| Self::row_to_injection(row),
            )
            .optional()?;
        Ok(injection)
    }

    pub fn update_insulin_injection(
        &self,
        id: &str,
        patch: &InjectionPatch,
    ) -> Result<InsulinInjection, GlucologError> {
        let current = self.insulin_injection(id)?.ok_or_else(|| not_found("insulin", id))?;
        let updated = patch.apply(&current)?;
        self.conn.execute(
            "UPDATE insulin_injections SET units = ?1, kind = ?2, notes = ?3 WHERE id = ?4",
            params![updated.units, updated.kind, updated.notes, id],
        )?;
        Ok(updated)
    }

    pub fn delete_insulin_injection(&self, id: &str) -> Result<bool, GlucologError> {
        let deleted = self.conn.execute("DELETE FROM insulin_injections WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }

    // ============= Meals =============

    pub fn add_meal(&self, meal: &Meal) -> Result<bool, GlucologError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO meals (id, epoch_ms, timestamp, name, carbs, kind, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                meal.id,
                meal.timestamp.timestamp_millis(),
                meal.timestamp.to_rfc3339(),
                meal.name,
                meal.carbs,
                meal.kind,
                meal.notes,
            ],
        )?;
        debug!("Insert meal {}: {}", meal.id, inserted > 0);
        Ok(inserted > 0)
    }

    /// All meals, newest first
    pub fn meals(&self) -> Result<Vec<Meal>, GlucologError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, epoch_ms, name, carbs, kind, notes FROM meals
             ORDER BY epoch_ms DESC, rowid DESC",
        )?;
        let meals = stmt
            .query_map([], |row| Self::row_to_meal(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(meals)
    }

    pub fn meal(&self, id: &str) -> Result<Option<Meal>, GlucologError> {
        let meal = self
            .conn
            .query_row(
                "SELECT id, epoch_ms, name, carbs, kind, notes FROM meals WHERE id = ?1",
                [id],
                |row| Self::row_to_meal(row),
            )
            .optional()?;
        Ok(meal)
    }

    pub fn update_meal(&self, id: &str, patch: &MealPatch) -> Result<Meal, GlucologError> {
        let current = self.meal(id)?.ok_or_else(|| not_found("meal", id))?;
        let updated = patch.apply(&current)?;
        self.conn.execute(
            "UPDATE meals SET name = ?1, carbs = ?2, kind = ?3, notes = ?4 WHERE id = ?5",
            params![updated.name, updated.carbs, updated.kind, updated.notes, id],
        )?;
        Ok(updated)
    }

    pub fn delete_meal(&self, id: &str) -> Result<bool, GlucologError> {
        let deleted = self.conn.execute("DELETE FROM meals WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }

    // ============= Settings =============

    /// Saved settings, or defaults if none were saved
    pub fn user_settings(&self) -> Result<UserSettings, GlucologError> {
        let blob: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                [USER_SETTINGS_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match blob {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(UserSettings::default()),
        }
    }

    pub fn save_user_settings(&self, settings: &UserSettings) -> Result<(), GlucologError> {
        let json = serde_json::to_string(settings)?;
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![USER_SETTINGS_KEY, json],
        )?;
        Ok(())
    }

    /// Merge a partial update into the saved settings
    pub fn update_user_settings(
        &self,
        update: &SettingsUpdate,
    ) -> Result<UserSettings, GlucologError> {
        let merged = update.apply(&self.user_settings()?)?;
        self.save_user_settings(&merged)?;
        Ok(merged)
    }

    // ============= Data management =============

    /// Snapshot of everything, stamped with the current time
    pub fn export_all(&self) -> Result<ExportData, GlucologError> {
        Ok(ExportData {
            glucose_readings: self.glucose_readings()?,
            insulin_injections: self.insulin_injections()?,
            meals: self.meals()?,
            user_settings: Some(self.user_settings()?),
            export_date: Utc::now(),
        })
    }

    /// Import an export document. Records whose id already exists are skipped;
    /// settings, when present, are replaced. Runs in one transaction.
    pub fn import(&self, data: &ExportData) -> Result<ImportSummary, GlucologError> {
        if let Some(settings) = &data.user_settings {
            if !settings.target_range.is_valid() {
                return Err(GlucologError::InvalidInput(format!(
                    "imported target minimum ({}) must be less than maximum ({})",
                    settings.target_range.min, settings.target_range.max
                )));
            }
        }

        let tx = self.conn.unchecked_transaction()?;
        let mut summary = ImportSummary::default();

        for reading in &data.glucose_readings {
            if self.add_glucose_reading(reading)? {
                summary.glucose_readings += 1;
            }
        }
        for injection in &data.insulin_injections {
            if self.add_insulin_injection(injection)? {
                summary.insulin_injections += 1;
            }
        }
        for meal in &data.meals {
            if self.add_meal(meal)? {
                summary.meals += 1;
            }
        }
        if let Some(settings) = &data.user_settings {
            self.save_user_settings(settings)?;
        }

        tx.commit()?;
        info!(
            "Imported {} new records ({} in document)",
            summary.total(),
            data.record_count()
        );
        Ok(summary)
    }

    /// Remove every record and the saved settings
    pub fn clear_all(&self) -> Result<(), GlucologError> {
        self.conn.execute_batch(
            "DELETE FROM glucose_readings;
             DELETE FROM insulin_injections;
             DELETE FROM meals;
             DELETE FROM settings;",
        )?;
        info!("Cleared all data");
        Ok(())
    }

    fn row_to_glucose(row: &Row) -> rusqlite::Result<GlucoseReading> {
        Ok(GlucoseReading {
            id: row.get(0)?,
            timestamp: epoch_ms_column(row, 1)?,
            glucose: row.get(2)?,
            notes: row.get(3)?,
        })
    }

    fn row_to_injection(row: &Row) -> rusqlite::Result<InsulinInjection> {
        Ok(InsulinInjection {
            id: row.get(0)?,
            timestamp: epoch_ms_column(row, 1)?,
            units: row.get(2)?,
            kind: row.get(3)?,
            notes: row.get(4)?,
        })
    }

    fn row_to_meal(row: &Row) -> rusqlite::Result<Meal> {
        Ok(Meal {
            id: row.get(0)?,
            timestamp: epoch_ms_column(row, 1)?,
            name: row.get(2)?,
            carbs: row.get(3)?,
            kind: row.get(4)?,
            notes: row.get(5)?,
        })
    }
}

impl RecordSource for Storage {
    fn fetch_glucose_readings(&self) -> Result<Vec<GlucoseReading>, GlucologError> {
        self.glucose_readings()
    }

    fn fetch_insulin_injections(&self) -> Result<Vec<InsulinInjection>, GlucologError> {
        self.insulin_injections()
    }

    fn fetch_meals(&self) -> Result<Vec<Meal>, GlucologError> {
        self.meals()
    }

    fn fetch_user_settings(&self) -> Result<UserSettings, GlucologError> {
        self.user_settings()
    }
}

fn not_found(kind: &'static str, id: &str) -> GlucologError {
    GlucologError::NotFound { kind, id: id.to_string() }
}

fn epoch_ms_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, millis))
}

impl ToSql for InsulinType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for InsulinType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        InsulinType::parse(s)
            .ok_or_else(|| FromSqlError::Other(format!("unknown insulin type: {}", s).into()))
    }
}

impl ToSql for MealType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for MealType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        MealType::parse(s)
            .ok_or_else(|| FromSqlError::Other(format!("unknown meal type: {}", s).into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn reading_at(id: &str, ts: DateTime<Utc>, glucose: f64) -> GlucoseReading {
        GlucoseReading { id: id.to_string(), timestamp: ts, glucose, notes: None }
    }

    #[test]
    fn test_glucose_newest_first() {
        let storage = Storage::open_in_memory().unwrap();
        let now = Utc::now();
        storage.add_glucose_reading(&reading_at("old", now - Duration::hours(3), 90.0)).unwrap();
        storage.add_glucose_reading(&reading_at("new", now, 150.0)).unwrap();
        storage.add_glucose_reading(&reading_at("mid", now - Duration::hours(1), 120.0)).unwrap();

        let ids: Vec<_> = storage.glucose_readings().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let storage = Storage::open_in_memory().unwrap();
        let notes = Some("bedtime".to_string());
        let injection = InsulinInjection::new(6.5, InsulinType::LongActing, notes).unwrap();
        let meal = Meal::new("Pasta", 80.0, MealType::Dinner, None).unwrap();
        storage.add_insulin_injection(&injection).unwrap();
        storage.add_meal(&meal).unwrap();

        assert_eq!(storage.insulin_injections().unwrap(), vec![injection]);
        assert_eq!(storage.meals().unwrap(), vec![meal]);
    }

    #[test]
    fn test_duplicate_id_ignored() {
        let storage = Storage::open_in_memory().unwrap();
        let reading = GlucoseReading::new(110.0, None).unwrap();
        assert!(storage.add_glucose_reading(&reading).unwrap());
        assert!(!storage.add_glucose_reading(&reading).unwrap());
        assert_eq!(storage.glucose_readings().unwrap().len(), 1);
    }

    #[test]
    fn test_update_and_delete() {
        let storage = Storage::open_in_memory().unwrap();
        let reading = GlucoseReading::new(110.0, None).unwrap();
        storage.add_glucose_reading(&reading).unwrap();

        let patch = GlucosePatch { notes: Some("fasting".into()), ..Default::default() };
        let updated = storage.update_glucose_reading(&reading.id, &patch).unwrap();
        assert_eq!(updated.notes.as_deref(), Some("fasting"));
        assert_eq!(storage.glucose_reading(&reading.id).unwrap(), Some(updated));

        let missing = storage.update_glucose_reading("nope", &patch);
        assert!(matches!(missing, Err(GlucologError::NotFound { .. })));

        assert!(storage.delete_glucose_reading(&reading.id).unwrap());
        assert!(!storage.delete_glucose_reading(&reading.id).unwrap());
        assert!(storage.glucose_readings().unwrap().is_empty());
    }

    #[test]
    fn test_update_meal_validates() {
        let storage = Storage::open_in_memory().unwrap();
        let meal = Meal::new("Soup", 15.0, MealType::Lunch, None).unwrap();
        storage.add_meal(&meal).unwrap();

        let bad = MealPatch { carbs: Some(500.0), ..Default::default() };
        assert!(storage.update_meal(&meal.id, &bad).is_err());
        assert_eq!(storage.meal(&meal.id).unwrap().unwrap().carbs, 15.0);
    }

    #[test]
    fn test_settings_default_and_merge() {
        let storage = Storage::open_in_memory().unwrap();
        assert_eq!(storage.user_settings().unwrap(), UserSettings::default());

        let update = SettingsUpdate {
            name: Some("Alex".into()),
            target_min: Some(70.0),
            ..Default::default()
        };
        let merged = storage.update_user_settings(&update).unwrap();
        assert_eq!(merged.name, "Alex");
        assert_eq!(merged.target_range.min, 70.0);
        assert_eq!(storage.user_settings().unwrap(), merged);
    }

    #[test]
    fn test_export_import_skips_existing() {
        let source = Storage::open_in_memory().unwrap();
        let now = Utc::now();
        source.add_glucose_reading(&reading_at("a", now - Duration::minutes(5), 100.0)).unwrap();
        source.add_glucose_reading(&reading_at("b", now, 180.0)).unwrap();
        source.add_meal(&Meal::new("Apple", 25.0, MealType::Snack, None).unwrap()).unwrap();
        let data = source.export_all().unwrap();

        let target = Storage::open_in_memory().unwrap();
        let first = target.import(&data).unwrap();
        assert_eq!(first, ImportSummary { glucose_readings: 2, insulin_injections: 0, meals: 1 });
        let second = target.import(&data).unwrap();
        assert_eq!(second.total(), 0);
        assert_eq!(target.glucose_readings().unwrap(), data.glucose_readings);
    }

    #[test]
    fn test_import_settings() {
        let storage = Storage::open_in_memory().unwrap();
        let saved = UserSettings { name: "Kim".into(), ..Default::default() };
        storage.save_user_settings(&saved).unwrap();

        // no settings in the document keeps the saved ones
        let data: ExportData = serde_json::from_str(
            r#"{"glucoseReadings":[{"id":"x","timestamp":"2024-05-01T08:00:00Z","glucose":120.0}],
                "exportDate":"2024-05-02T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(storage.import(&data).unwrap().glucose_readings, 1);
        assert_eq!(storage.user_settings().unwrap(), saved);

        // an inverted target range is rejected before anything is written
        let mut bad = data.clone();
        bad.glucose_readings[0].id = "y".into();
        let mut settings = UserSettings::default();
        settings.target_range.min = 150.0;
        settings.target_range.max = 100.0;
        bad.user_settings = Some(settings);
        assert!(matches!(storage.import(&bad), Err(GlucologError::InvalidInput(_))));
        assert_eq!(storage.user_settings().unwrap(), saved);
        assert!(storage.glucose_reading("y").unwrap().is_none());

        let replaced = UserSettings { name: "Lee".into(), ..Default::default() };
        bad.user_settings = Some(replaced.clone());
        storage.import(&bad).unwrap();
        assert_eq!(storage.user_settings().unwrap(), replaced);
    }

    #[test]
    fn test_clear_all() {
        let storage = Storage::open_in_memory().unwrap();
        storage.add_glucose_reading(&GlucoseReading::new(100.0, None).unwrap()).unwrap();
        let settings = UserSettings { name: "Kim".into(), ..Default::default() };
        storage.save_user_settings(&settings).unwrap();
        storage.clear_all().unwrap();
        assert!(storage.export_all().unwrap().is_empty());
        assert_eq!(storage.user_settings().unwrap(), UserSettings::default());
    }
}
