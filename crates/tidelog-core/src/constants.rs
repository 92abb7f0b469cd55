//! Constants and default values for tidelog

use std::path::{Path, PathBuf};

/// Default tidelog home directory name
pub const TIDELOG_DIR: &str = ".tidelog";

/// Default log directory name
pub const LOGS_DIR: &str = "logs";

/// Default stream base name
pub const DEFAULT_BASE_NAME: &str = "app";

/// Extension of every log file, current or rotated
pub const LOG_EXTENSION: &str = "log";

/// Suffix appended to compressed rotated files
pub const COMPRESSED_SUFFIX: &str = "gz";

/// Default config file names to search for (in priority order)
pub const CONFIG_FILES: &[&str] = &[
    "tidelog.toml",
    "tidelog.yaml",
    "tidelog.yml",
    "tidelog.json",
];

/// Default log max size in bytes (10MB)
pub const DEFAULT_LOG_MAX_SIZE: u64 = 10 * 1024 * 1024;

/// Default max rotated files to keep
pub const DEFAULT_LOG_MAX_FILES: usize = 5;

/// Default gzip level for rotated files
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Default number of recent entries held in memory
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Get the tidelog home directory
pub fn tidelog_home() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(TIDELOG_DIR))
        .unwrap_or_else(|| PathBuf::from(TIDELOG_DIR))
}

/// Get the default logs directory
pub fn logs_dir() -> PathBuf {
    tidelog_home().join(LOGS_DIR)
}

/// Get the current (live) log file path for a stream
pub fn current_log_path(dir: &Path, base_name: &str) -> PathBuf {
    dir.join(format!("{}.{}", base_name, LOG_EXTENSION))
}
