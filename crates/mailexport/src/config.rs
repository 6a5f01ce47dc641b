//! Export run configuration
//!
//! Supports loading settings from (in order of priority):
//! 1. Command-line overrides applied by the caller
//! 2. A JSON file given explicitly
//! 3. `export.json` in the shared config directory
//! 4. Built-in defaults

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::archive::Compression;
use crate::convert::ConversionOptions;

/// Config filename in the shared config directory
pub const CONFIG_FILE: &str = "export.json";

/// Calendar day format used for date bounds, e.g. `20230115`
pub const DAY_FORMAT: &str = "%Y%m%d";

/// Parse a `YYYYMMDD` calendar day
pub fn parse_day(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DAY_FORMAT)
        .with_context(|| format!("Invalid date '{}', expected YYYYMMDD", s))
}

/// Settings for one export run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Folder to export, matched by display name then by full path
    pub folder: String,
    /// Directory archives are written to
    pub target_dir: PathBuf,
    /// Maximum number of items in the export window
    pub max_count: usize,
    /// First calendar day to export (inclusive)
    #[serde(with = "day")]
    pub start_date: Option<NaiveDate>,
    /// Export stops before items created after midnight of this day
    #[serde(with = "day")]
    pub end_date: Option<NaiveDate>,
    /// Resolve addresses through the session address book
    pub use_address_book: bool,
    pub compression: Compression,
    /// Consecutive fetch failures tolerated at one position before stopping
    pub max_fetch_retries: u32,
    pub conversion: ConversionOptions,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            folder: String::new(),
            target_dir: PathBuf::from("."),
            max_count: 1000,
            start_date: None,
            end_date: None,
            use_address_book: false,
            compression: Compression::default(),
            max_fetch_retries: 3,
            conversion: ConversionOptions::default(),
        }
    }
}

impl ExportConfig {
    /// Load from the shared config directory, falling back to defaults
    pub fn load() -> Result<Self> {
        if ::config::config_exists(CONFIG_FILE) {
            return ::config::load_json(CONFIG_FILE);
        }
        Ok(Self::default())
    }

    /// Load from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        ::config::load_json_file(path)
    }

    /// Parse from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse export config JSON")
    }

    /// Default config file path (~/.config/mmdump/export.json)
    pub fn default_config_path() -> Option<PathBuf> {
        ::config::config_path(CONFIG_FILE)
    }
}

/// Serde adapter for optional `YYYYMMDD` days
mod day {
    use super::*;

    pub fn serialize<S: Serializer>(
        day: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match day {
            Some(day) => serializer.serialize_some(&day.format(DAY_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => NaiveDate::parse_from_str(s, DAY_FORMAT)
                .map(Some)
                .map_err(|e| serde::de::Error::custom(format!("invalid date '{}': {}", s, e))),
        }
    }
}
