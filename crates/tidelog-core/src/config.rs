//! Configuration file parsing for tidelog
//!
//! Supports multiple configuration file formats:
//! - TOML (.toml)
//! - YAML (.yaml, .yml)
//! - JSON (.json)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::constants::*;
use crate::error::{Error, Result};
use crate::types::validate_base_name;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(ConfigFormat::Toml),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "json" => Some(ConfigFormat::Json),
            _ => None,
        }
    }

    /// Detect format from file path
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Time-based rotation trigger
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::None => "none",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }
}

impl FromStr for Frequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Frequency::None),
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            _ => Err(Error::InvalidFrequency(s.to_string())),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_max_size() -> u64 {
    DEFAULT_LOG_MAX_SIZE
}

fn default_max_files() -> usize {
    DEFAULT_LOG_MAX_FILES
}

fn default_compression_level() -> u32 {
    DEFAULT_COMPRESSION_LEVEL
}

fn default_day_of_month() -> u32 {
    1
}

fn default_base_name() -> String {
    DEFAULT_BASE_NAME.to_string()
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

/// Rotation policy for one log stream.
///
/// Size and time triggers combine with OR: whichever fires first rotates.
/// Times are interpreted in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RotationConfig {
    /// Rotate once the current file reaches this many bytes
    #[serde(default = "default_max_size")]
    pub max_size: u64,
    /// Rotated files kept after retention
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    /// Gzip rotated files
    #[serde(default)]
    pub compress: bool,
    /// Gzip level, 0-9
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
    #[serde(default)]
    pub frequency: Frequency,
    /// 0-23
    #[serde(default)]
    pub rotate_hour: u32,
    /// 0-59
    #[serde(default)]
    pub rotate_minute: u32,
    /// 0 = Sunday .. 6 = Saturday
    #[serde(default)]
    pub rotate_day_of_week: u32,
    /// 1-31, clamped to the length of short months
    #[serde(default = "default_day_of_month")]
    pub rotate_day_of_month: u32,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_LOG_MAX_SIZE,
            max_files: DEFAULT_LOG_MAX_FILES,
            compress: false,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            frequency: Frequency::None,
            rotate_hour: 0,
            rotate_minute: 0,
            rotate_day_of_week: 0,
            rotate_day_of_month: 1,
        }
    }
}

impl RotationConfig {
    pub fn new(max_size: u64, max_files: usize) -> Self {
        Self {
            max_size,
            max_files,
            ..Default::default()
        }
    }

    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_daily(mut self, hour: u32, minute: u32) -> Self {
        self.frequency = Frequency::Daily;
        self.rotate_hour = hour;
        self.rotate_minute = minute;
        self
    }

    pub fn with_weekly(mut self, day_of_week: u32, hour: u32, minute: u32) -> Self {
        self.frequency = Frequency::Weekly;
        self.rotate_day_of_week = day_of_week;
        self.rotate_hour = hour;
        self.rotate_minute = minute;
        self
    }

    pub fn with_monthly(mut self, day_of_month: u32, hour: u32, minute: u32) -> Self {
        self.frequency = Frequency::Monthly;
        self.rotate_day_of_month = day_of_month;
        self.rotate_hour = hour;
        self.rotate_minute = minute;
        self
    }

    /// Reject values that would otherwise misbehave silently at runtime
    pub fn validate(&self) -> Result<()> {
        if self.max_files == 0 {
            return Err(Error::config("max_files must be at least 1"));
        }
        if self.max_size == 0 {
            return Err(Error::config("max_size must be greater than 0"));
        }
        if self.compression_level > 9 {
            return Err(Error::config(format!(
                "compression_level must be 0-9, got {}",
                self.compression_level
            )));
        }
        if self.rotate_hour > 23 {
            return Err(Error::config(format!(
                "rotate_hour must be 0-23, got {}",
                self.rotate_hour
            )));
        }
        if self.rotate_minute > 59 {
            return Err(Error::config(format!(
                "rotate_minute must be 0-59, got {}",
                self.rotate_minute
            )));
        }
        if self.rotate_day_of_week > 6 {
            return Err(Error::config(format!(
                "rotate_day_of_week must be 0-6, got {}",
                self.rotate_day_of_week
            )));
        }
        if !(1..=31).contains(&self.rotate_day_of_month) {
            return Err(Error::config(format!(
                "rotate_day_of_month must be 1-31, got {}",
                self.rotate_day_of_month
            )));
        }
        Ok(())
    }
}

/// Identity and cache settings of one log stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Directory holding the current and rotated files
    pub directory: Option<PathBuf>,
    #[serde(default = "default_base_name")]
    pub base_name: String,
    /// Recent entries kept in memory
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            directory: None,
            base_name: default_base_name(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl StreamConfig {
    /// Configured directory or `~/.tidelog/logs`
    pub fn resolved_directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(logs_dir)
    }
}

/// Configuration file structure (tidelog.toml/yaml/json)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub rotation: RotationConfig,
}

impl Settings {
    /// Load config from file, automatically detecting format from extension
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }

        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            Error::ConfigError(format!(
                "Unsupported config file extension: {}. Expected .toml, .yaml, .yml, or .json",
                path.display()
            ))
        })?;

        let content = std::fs::read_to_string(path)?;
        let mut settings = Self::parse(&content, format)?;

        // Relative directories are resolved against the config file location
        if let (Some(dir), Some(parent)) = (settings.stream.directory.as_mut(), path.parent()) {
            if dir.is_relative() {
                *dir = parent.join(&*dir);
            }
        }
        Ok(settings)
    }

    /// Parse config content with specified format
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        let settings: Settings = match format {
            ConfigFormat::Toml => toml::from_str(content)?,
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Find and load the first config file from `dir`, `None` when there is none
    pub fn find_and_load(dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        for name in CONFIG_FILES {
            let path = dir.join(name);
            if path.exists() {
                let settings = Self::load(&path)?;
                return Ok(Some((settings, path)));
            }
        }
        Ok(None)
    }

    pub fn validate(&self) -> Result<()> {
        if !validate_base_name(&self.stream.base_name) {
            return Err(Error::config(format!(
                "Invalid base name '{}': only letters, digits, '_' and '-' are allowed",
                self.stream.base_name
            )));
        }
        if self.stream.cache_capacity == 0 {
            return Err(Error::config("cache_capacity must be at least 1"));
        }
        self.rotation.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_config_format_detection() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("yaml"), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_extension("yml"), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_extension("JSON"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("txt"), None);
    }

    #[test]
    fn test_frequency_from_str() {
        assert_eq!("daily".parse::<Frequency>().unwrap(), Frequency::Daily);
        assert_eq!("Monthly".parse::<Frequency>().unwrap(), Frequency::Monthly);
        assert!(matches!(
            "hourly".parse::<Frequency>(),
            Err(Error::InvalidFrequency(_))
        ));
    }

    #[test]
    fn test_rotation_defaults_are_valid() {
        let config = RotationConfig::default();
        assert_eq!(config.max_size, DEFAULT_LOG_MAX_SIZE);
        assert_eq!(config.max_files, DEFAULT_LOG_MAX_FILES);
        assert_eq!(config.frequency, Frequency::None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rotation_validate_rejects_bad_values() {
        assert!(RotationConfig::new(100, 0).validate().is_err());
        assert!(RotationConfig::new(0, 3).validate().is_err());
        assert!(RotationConfig::new(100, 3).with_daily(24, 0).validate().is_err());
        assert!(RotationConfig::new(100, 3).with_daily(0, 60).validate().is_err());
        assert!(RotationConfig::new(100, 3).with_weekly(7, 0, 0).validate().is_err());
        assert!(RotationConfig::new(100, 3).with_monthly(0, 0, 0).validate().is_err());
        assert!(RotationConfig::new(100, 3).with_monthly(31, 23, 59).validate().is_ok());
    }

    #[test]
    fn test_config_parse_toml() {
        let content = r#"
[stream]
directory = "/var/log/tidelog"
base_name = "api"
cache_capacity = 250

[rotation]
max_size = 1048576
max_files = 3
compress = true
frequency = "weekly"
rotate_day_of_week = 1
rotate_hour = 4
"#;
        let settings = Settings::parse(content, ConfigFormat::Toml).unwrap();
        assert_eq!(settings.stream.base_name, "api");
        assert_eq!(settings.stream.cache_capacity, 250);
        assert_eq!(settings.rotation.max_size, 1_048_576);
        assert!(settings.rotation.compress);
        assert_eq!(settings.rotation.frequency, Frequency::Weekly);
        assert_eq!(settings.rotation.rotate_day_of_week, 1);
        assert_eq!(settings.rotation.rotate_hour, 4);
        assert_eq!(settings.rotation.rotate_minute, 0);
    }

    #[test]
    fn test_config_parse_yaml() {
        let content = r#"
stream:
  base_name: worker
rotation:
  max_files: 2
  frequency: daily
  rotate_hour: 3
"#;
        let settings = Settings::parse(content, ConfigFormat::Yaml).unwrap();
        assert_eq!(settings.stream.base_name, "worker");
        assert_eq!(settings.rotation.max_files, 2);
        assert_eq!(settings.rotation.frequency, Frequency::Daily);
        assert_eq!(settings.rotation.max_size, DEFAULT_LOG_MAX_SIZE);
    }

    #[test]
    fn test_config_parse_json() {
        let content = r#"{"rotation": {"max_size": 100, "max_files": 1}}"#;
        let settings = Settings::parse(content, ConfigFormat::Json).unwrap();
        assert_eq!(settings.stream, StreamConfig::default());
        assert_eq!(settings.rotation.max_size, 100);
    }

    #[test]
    fn test_config_rejects_invalid_frequency() {
        let content = "[rotation]\nfrequency = \"hourly\"\n";
        assert!(Settings::parse(content, ConfigFormat::Toml).is_err());
    }

    #[test]
    fn test_config_rejects_zero_max_files() {
        let content = r#"{"rotation": {"max_files": 0}}"#;
        assert!(matches!(
            Settings::parse(content, ConfigFormat::Json),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_config_rejects_traversal_base_name() {
        let content = "[stream]\nbase_name = \"../escape\"\n";
        assert!(Settings::parse(content, ConfigFormat::Toml).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Settings::load(Path::new("/nonexistent/tidelog.toml"));
        assert!(matches!(result, Err(Error::ConfigNotFound(_))));
    }

    #[test]
    fn test_load_resolves_relative_directory() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        file.write_all(b"[stream]\ndirectory = \"logs\"\n").unwrap();

        let settings = Settings::load(file.path()).unwrap();
        let parent = file.path().parent().unwrap();
        assert_eq!(settings.stream.directory, Some(parent.join("logs")));
    }

    #[test]
    fn test_find_and_load_priority() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("tidelog.json"), r#"{"stream": {"base_name": "json"}}"#)
            .unwrap();
        std::fs::write(dir.path().join("tidelog.toml"), "[stream]\nbase_name = \"toml\"\n")
            .unwrap();

        let (settings, path) = Settings::find_and_load(dir.path()).unwrap().unwrap();
        assert_eq!(settings.stream.base_name, "toml");
        assert!(path.ends_with("tidelog.toml"));
    }

    #[test]
    fn test_find_and_load_none() {
        let dir = TempDir::new().unwrap();
        assert!(Settings::find_and_load(dir.path()).unwrap().is_none());
    }
}
