//! Rotated file naming and discovery
//!
//! Rotated files are named `{base}.{YYYYmmdd-HHMMSS}.{index}.log[.{suffix}]`,
//! where the suffix comes from the compression codec (`gz` for gzip). The
//! timestamp is fixed-width and the index zero-padded so name order follows
//! rotation order; listing still sorts on the parsed components so indexes
//! past the padding width keep their order.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Reverse;
use std::io;
use std::path::{Path, PathBuf};
use tidelog_core::{COMPRESSED_SUFFIX, LOG_EXTENSION};
use tracing::debug;

/// Timestamp component format of rotated names
pub const STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Matches the part of a rotated name between `{base}.` and the codec suffix
static ROTATED_STEM_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{8}-\d{6})\.(\d+)\.log$").expect("Invalid rotated name regex")
});

/// A rotated file discovered on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatedFile {
    pub path: PathBuf,
    pub stamp: String,
    pub index: u32,
    pub compressed: bool,
}

impl RotatedFile {
    /// Parse a file name belonging to `base_name`, `None` for anything else.
    /// Names ending in `.{suffix}` are compressed.
    pub fn parse(dir: &Path, base_name: &str, suffix: &str, file_name: &str) -> Option<Self> {
        let rest = file_name.strip_prefix(base_name)?.strip_prefix('.')?;
        let packed = rest.strip_suffix(suffix).and_then(|r| r.strip_suffix('.'));
        let (stem, compressed) = match packed {
            Some(stem) => (stem, true),
            None => (rest, false),
        };
        let caps = ROTATED_STEM_REGEX.captures(stem)?;
        Some(Self {
            path: dir.join(file_name),
            stamp: caps[1].to_string(),
            index: caps[2].parse().ok()?,
            compressed,
        })
    }
}

/// Derives names for rotation events of one stream
#[derive(Debug, Clone)]
pub struct RotatedFileNamer {
    dir: PathBuf,
    base_name: String,
    suffix: &'static str,
}

impl RotatedFileNamer {
    pub fn new(dir: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            base_name: base_name.into(),
            suffix: COMPRESSED_SUFFIX,
        }
    }

    /// Use the suffix of a non-gzip codec for compressed files
    pub fn with_suffix(mut self, suffix: &'static str) -> Self {
        self.suffix = suffix;
        self
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Candidate path for a given stamp and index
    pub fn candidate(&self, stamp: &str, index: u32, compress: bool) -> PathBuf {
        let mut name = format!("{}.{}.{:03}.{}", self.base_name, stamp, index, LOG_EXTENSION);
        if compress {
            name.push('.');
            name.push_str(self.suffix);
        }
        self.dir.join(name)
    }

    /// First unused rotated name for `now`.
    ///
    /// An index is taken if either the plain or the compressed variant exists,
    /// so toggling compression never produces two files with the same identity.
    pub async fn next_name(&self, now: DateTime<Utc>, compress: bool) -> io::Result<PathBuf> {
        let stamp = now.format(STAMP_FORMAT).to_string();
        let mut index = 1u32;
        loop {
            let plain = self.candidate(&stamp, index, false);
            let packed = self.candidate(&stamp, index, true);
            if !tokio::fs::try_exists(&plain).await? && !tokio::fs::try_exists(&packed).await? {
                return Ok(if compress { packed } else { plain });
            }
            index += 1;
        }
    }

    /// Rotated files of this stream, newest first. The current file is never included.
    pub async fn list_rotated(&self) -> io::Result<Vec<RotatedFile>> {
        let mut files = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(e),
        };

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if let Some(rotated) =
                RotatedFile::parse(&self.dir, &self.base_name, self.suffix, name)
            {
                files.push(rotated);
            }
        }

        files.sort_by_key(|f| Reverse((f.stamp.clone(), f.index)));
        debug!("Found {} rotated files for {}", files.len(), self.base_name);
        Ok(files)
    }
}
