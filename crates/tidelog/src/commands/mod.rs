//! Command implementations

pub mod clear;
pub mod export;
pub mod rotate;
pub mod search;
pub mod show;
pub mod status;
pub mod tail;
pub mod write;

use anyhow::{Context, Result};
use std::path::Path;
use tidelog_core::Settings;
use tidelog_rotation::LogManager;
use tracing::debug;

use crate::cli::StreamArgs;

/// Resolve settings from `--config`, a tidelog.* file in `cwd`, or defaults,
/// then apply `--dir` and `--base`
pub fn load_settings(args: &StreamArgs, cwd: &Path) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => match Settings::find_and_load(cwd)
            .with_context(|| format!("Failed to load config from {}", cwd.display()))?
        {
            Some((settings, path)) => {
                debug!("Using config {}", path.display());
                settings
            }
            None => Settings::default(),
        },
    };

    if let Some(dir) = &args.dir {
        settings.stream.directory = Some(dir.clone());
    }
    if let Some(base) = &args.base {
        settings.stream.base_name = base.clone();
    }
    settings.validate()?;
    Ok(settings)
}

/// Open the manager for the selected stream
pub async fn open_manager(args: &StreamArgs) -> Result<(LogManager, Settings)> {
    let cwd = std::env::current_dir()?;
    let settings = load_settings(args, &cwd)?;
    let manager = LogManager::open(&settings).await.with_context(|| {
        format!(
            "Failed to open log stream in {}",
            settings.stream.resolved_directory().display()
        )
    })?;
    Ok((manager, settings))
}
