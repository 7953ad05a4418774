//! Portable JSON export of the whole record set

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::GlucologError;
use crate::records::{GlucoseReading, InsulinInjection, Meal};
use crate::settings::UserSettings;

/// Everything the user has logged, plus settings.
///
/// Collections are newest-first, as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    #[serde(default)]
    pub glucose_readings: Vec<GlucoseReading>,
    #[serde(default)]
    pub insulin_injections: Vec<InsulinInjection>,
    #[serde(default)]
    pub meals: Vec<Meal>,
    /// Absent in documents that carry no settings; import then keeps the saved ones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_settings: Option<UserSettings>,
    pub export_date: DateTime<Utc>,
}

impl ExportData {
    pub fn is_empty(&self) -> bool {
        self.glucose_readings.is_empty()
            && self.insulin_injections.is_empty()
            && self.meals.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.glucose_readings.len() + self.insulin_injections.len() + self.meals.len()
    }
}

/// Default export file name for a given export date
pub fn export_file_name(export_date: DateTime<Utc>) -> String {
    format!("glucolog-export-{}.json", export_date.format("%Y-%m-%d"))
}

/// Write an export as pretty JSON
pub fn write_export<P: AsRef<Path>>(path: P, data: &ExportData) -> Result<PathBuf, GlucologError> {
    let path = path.as_ref().to_path_buf();
    let mut writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(&mut writer, data)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    info!("Exported {} records to {}", data.record_count(), path.display());
    Ok(path)
}

/// Read an export written by [`write_export`]
pub fn read_export<P: AsRef<Path>>(path: P) -> Result<ExportData, GlucologError> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let data: ExportData = serde_json::from_reader(reader)?;
    info!("Read {} records from {}", data.record_count(), path.as_ref().display());
    Ok(data)
}
