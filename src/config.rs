//! Configuration file and data directory resolution.
//!
//! `config.toml` is optional; every key has a default. Example:
//!
//! ```toml
//! [xlsx]
//! template = "/path/to/daily-work.xlsx"
//!
//! [pdf]
//! font = "/usr/share/fonts/truetype/nanum/NanumGothic.ttf"
//! bold_font = "/usr/share/fonts/truetype/nanum/NanumGothicBold.ttf"
//!
//! [update]
//! enabled = true
//! url = "https://api.github.com/repos/jihun-io/dailywork/releases/latest"
//! ```

use std::fs;
use std::path::PathBuf;

use log::debug;
use serde::Deserialize;

use crate::error::{DailyworkError, Result};

/// Overrides the data directory (preferences, draft, log file).
pub const HOME_ENV: &str = "DAILYWORK_HOME";
/// Overrides the config file location.
pub const CONFIG_ENV: &str = "DAILYWORK_CONFIG";

pub const DEFAULT_RELEASE_URL: &str =
    "https://api.github.com/repos/jihun-io/dailywork/releases/latest";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub xlsx: XlsxConfig,
    pub pdf: PdfConfig,
    pub update: UpdateConfig,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct XlsxConfig {
    /// Template workbook; the built-in template is used when unset.
    pub template: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct PdfConfig {
    /// Regular-weight TrueType font with Hangul coverage.
    pub font: Option<PathBuf>,
    /// Bold-weight TrueType font; falls back to `font`.
    pub bold_font: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpdateConfig {
    pub enabled: bool,
    pub url: String,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        UpdateConfig {
            enabled: true,
            url: DEFAULT_RELEASE_URL.to_string(),
        }
    }
}

impl Config {
    /// Loads the config file, or defaults when there is none.
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => {
                debug!("Loading config from {}", path.display());
                let text = fs::read_to_string(&path)?;
                Self::from_toml(&text)
                    .map_err(|e| DailyworkError::Config(format!("{}: {}", path.display(), e)))
            }
            _ => Ok(Config::default()),
        }
    }

    pub fn from_toml(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Returns the path to the config file (`config.toml`).
///
/// 1. `DAILYWORK_CONFIG` environment variable.
/// 2. `~/.config/dailywork/config.toml` (on Linux).
fn config_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(p));
    }
    dirs::config_dir().map(|mut p| {
        p.push("dailywork");
        p.push("config.toml");
        p
    })
}

/// Returns the directory holding stored preferences and the draft record.
///
/// The path is determined in the following order:
/// 1. `DAILYWORK_HOME` environment variable.
/// 2. `~/.local/share/dailywork` (on Linux).
/// 3. `./dailywork` (fallback).
pub fn data_dir() -> PathBuf {
    std::env::var(HOME_ENV).map(PathBuf::from).unwrap_or_else(|_| {
        let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("dailywork");
        p
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.update.enabled);
        assert_eq!(config.update.url, DEFAULT_RELEASE_URL);
    }

    #[test]
    fn partial_sections_fill_in_defaults() {
        let config = Config::from_toml(
            r#"
            [pdf]
            font = "/fonts/a.ttf"

            [update]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.pdf.font, Some(PathBuf::from("/fonts/a.ttf")));
        assert_eq!(config.pdf.bold_font, None);
        assert!(!config.update.enabled);
        assert_eq!(config.update.url, DEFAULT_RELEASE_URL);
        assert_eq!(config.xlsx.template, None);
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(Config::from_toml("[pdf\nfont = 3").is_err());
    }
}
