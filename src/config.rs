// Settings file support. Every field has a default so a partial or missing
// microtools.toml is valid.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::csv_convert::CsvSettings;
use crate::grammar::AnalyzerOptions;
use crate::stats::DEFAULT_WORDS_PER_MINUTE;
use crate::units::Rounding;

pub const DEFAULT_CONFIG_FILE: &str = "microtools.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsSettings {
    pub words_per_minute: u32,
}

impl Default for StatsSettings {
    fn default() -> Self {
        Self {
            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UnitSettings {
    pub rounding: Rounding,
    /// History file; defaults to `.microtools_history.json` in the working directory
    pub history_path: Option<PathBuf>,
}

/// Input reading behaviour for batch commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderSettings {
    /// Whether to fail fast on first error or continue processing
    pub fail_fast: bool,
    /// Buffer size for async reading
    pub buffer_size: usize,
    /// Inputs analyzed at once; 0 means one per CPU
    pub concurrency: usize,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            fail_fast: false,
            buffer_size: 8192,
            concurrency: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub analyzer: AnalyzerOptions,
    pub stats: StatsSettings,
    pub csv: CsvSettings,
    pub units: UnitSettings,
    pub reader: ReaderSettings,
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid settings file")
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read settings file {}", path.display()))?;
        let settings = Self::from_toml_str(&content)
            .with_context(|| format!("Cannot parse settings file {}", path.display()))?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Explicit path must exist; otherwise `microtools.toml` in `dir` is used when present
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            return Self::load_from(&candidate);
        }
        debug!("No settings file found, using defaults");
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Category, Severity};

    #[test]
    fn test_empty_file_is_defaults() {
        assert_eq!(Settings::from_toml_str("").unwrap(), Settings::default());
    }

    #[test]
    fn test_partial_settings() {
        let settings = Settings::from_toml_str(
            r#"
            [analyzer]
            excluded_categories = ["style"]
            min_severity = "medium"

            [csv]
            delimiter = ";"

            [units]
            rounding = { mode = "fixed", digits = 2 }
            "#,
        )
        .unwrap();

        assert_eq!(settings.analyzer.excluded_categories, vec![Category::Style]);
        assert_eq!(settings.analyzer.min_severity, Severity::Medium);
        assert_eq!(settings.csv.delimiter, Some(';'));
        assert!(settings.csv.header);
        assert_eq!(settings.units.rounding, Rounding::Fixed { digits: 2 });
        assert_eq!(settings.stats.words_per_minute, 200);
        assert_eq!(settings.reader.buffer_size, 8192);
    }

    #[test]
    fn test_invalid_value_is_error() {
        let err = Settings::from_toml_str("[analyzer]\nmin_severity = \"urgent\"").unwrap_err();
        assert!(err.to_string().contains("Invalid settings file"));
    }
}
