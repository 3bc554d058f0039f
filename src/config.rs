//! User settings: which days the home grid shows and whether to sync on
//! startup. Stored as a JSON document; missing fields take their defaults.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub const DEFAULT_OFFSETS: [u32; 7] = [0, 1, 2, 5, 7, 14, 30];
pub const DEFAULT_COLUMNS_PER_ROW: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "settings io error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "settings parse error: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "invalid setting: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Offsets back from the latest day shown on the home grid.
    pub display_offsets: Vec<u32>,
    pub columns_per_row: u32,
    pub sync_on_startup: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            display_offsets: DEFAULT_OFFSETS.to_vec(),
            columns_per_row: DEFAULT_COLUMNS_PER_ROW,
            sync_on_startup: false,
        }
    }
}

impl Settings {
    /// Read settings from `path`, or defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_json::from_slice(&fs::read(path)?)?;
        if settings.columns_per_row == 0 {
            return Err(ConfigError::Invalid("columns_per_row must be at least 1".into()));
        }
        Ok(settings)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    /// Parse a comma separated list like `"0, 1, 7"` and store it.
    pub fn set_offsets_from_str(&mut self, input: &str) -> Result<(), ConfigError> {
        self.display_offsets = parse_offsets(input)?;
        Ok(())
    }

    pub fn set_columns_per_row(&mut self, columns: u32) -> Result<(), ConfigError> {
        if columns == 0 {
            return Err(ConfigError::Invalid("columns_per_row must be at least 1".into()));
        }
        self.columns_per_row = columns;
        Ok(())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Columns actually used by the grid.
    pub fn grid_columns(&self) -> u32 {
        (self.display_offsets.len() as u32).min(self.columns_per_row)
    }

    /// Unused cells at the end of a full row.
    pub fn empty_slots(&self) -> u32 {
        self.columns_per_row - self.grid_columns()
    }
}

pub fn parse_offsets(input: &str) -> Result<Vec<u32>, ConfigError> {
    let offsets = input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u32>()
                .map_err(|_| ConfigError::Invalid(format!("not a non-negative integer: {}", part)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if offsets.is_empty() {
        return Err(ConfigError::Invalid("at least one offset is required".into()));
    }
    Ok(offsets)
}
