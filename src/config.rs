//! Configuration file parsing and data locations

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::error::GlucologError;

const APP_DIR: &str = "glucolog";

const DEFAULT_CONFIG: &str = "\
# glucolog configuration
# One setting per line: <key> <value>

# SQLite database location (defaults to the data directory)
# database_path /path/to/glucolog.db

# Period in days used by `glucolog history` when none is given
default_period 7
";

/// Configuration loaded from config.txt
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Config {
    pub database_path: Option<String>,
    pub default_period: Option<u32>,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GlucologError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = Vec::new();
        for line in reader.lines() {
            lines.push(line?);
        }
        Self::parse(lines.iter().map(String::as_str))
    }

    /// Parse config lines; unknown keys are ignored
    pub fn parse<'a, I: IntoIterator<Item = &'a str>>(lines: I) -> Result<Self, GlucologError> {
        let mut config = Config::default();

        for line in lines {
            // Skip empty lines and comments
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, rest)) = Self::parse_line(line) {
                // Extract value before any comment
                let value = rest.split('#').next().unwrap_or("").trim();
                match key {
                    "database_path" => config.database_path = Some(value.to_string()),
                    "default_period" => {
                        let days = value.parse::<u32>().ok().filter(|d| *d > 0).ok_or_else(|| {
                            GlucologError::InvalidInput(format!(
                                "default_period must be a positive number of days, got {}",
                                value
                            ))
                        })?;
                        config.default_period = Some(days);
                    }
                    _ => log::warn!("Ignoring unknown config key: {}", key),
                }
            }
        }

        Ok(config)
    }

    /// Parse a single config line, returning (key, value)
    fn parse_line(line: &str) -> Option<(&str, &str)> {
        // Find first whitespace to separate key from value
        let mut parts = line.splitn(2, |c: char| c.is_whitespace());
        let key = parts.next()?.trim();
        let value = parts.next()?.trim();

        if key.is_empty() || value.is_empty() {
            return None;
        }

        Some((key, value))
    }

    /// Write the commented default config
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<(), GlucologError> {
        let mut file = File::create(path)?;
        file.write_all(DEFAULT_CONFIG.as_bytes())?;
        Ok(())
    }
}

/// Per-user data directory
pub fn get_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

pub fn ensure_data_dir() -> Result<PathBuf, GlucologError> {
    let dir = get_data_dir();
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn default_database_path() -> PathBuf {
    get_data_dir().join("glucolog.db")
}

pub fn config_file_path() -> PathBuf {
    get_data_dir().join("config.txt")
}

/// Where exports go when no file is given
pub fn default_export_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}
