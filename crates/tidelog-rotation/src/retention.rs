//! Retention of rotated files

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::naming::RotatedFileNamer;

/// Outcome of one retention pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RetentionReport {
    pub deleted: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

/// Deletes the oldest rotated files beyond a count limit
#[derive(Debug, Clone)]
pub struct RetentionEnforcer {
    namer: RotatedFileNamer,
}

impl RetentionEnforcer {
    pub fn new(namer: RotatedFileNamer) -> Self {
        Self { namer }
    }

    /// Keep the newest `max_files` rotated files and delete the rest.
    ///
    /// `just_created` always survives and counts as the newest file, even when
    /// its stamp sorts older because the clock stepped back. Best effort: a
    /// file that cannot be deleted is logged and skipped, the remaining
    /// deletions still run.
    pub async fn enforce(&self, max_files: usize, just_created: Option<&Path>) -> RetentionReport {
        let mut report = RetentionReport::default();

        let mut files = match self.namer.list_rotated().await {
            Ok(files) => files,
            Err(e) => {
                warn!("Retention skipped for {}: {}", self.namer.base_name(), e);
                return report;
            }
        };

        let fresh = just_created.and_then(|p| files.iter().position(|f| f.path.as_path() == p));
        if let Some(pos) = fresh {
            let newest = files.remove(pos);
            files.insert(0, newest);
        }

        for file in files.into_iter().skip(max_files.max(1)) {
            match tokio::fs::remove_file(&file.path).await {
                Ok(()) => {
                    debug!("Deleted rotated log {}", file.path.display());
                    report.deleted.push(file.path);
                }
                Err(e) => {
                    warn!("Failed to delete rotated log {}: {}", file.path.display(), e);
                    report.failed.push(file.path);
                }
            }
        }

        report
    }
}
