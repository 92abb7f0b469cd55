//! Log rotator: append, rotate, retain, and read back one stream

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tidelog_core::{
    current_log_path, validate_base_name, Error, LogEntry, Result, RotationConfig,
};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::codec::{CompressionCodec, GzipCodec};
use crate::naming::{RotatedFile, RotatedFileNamer};
use crate::policy::RotationPolicy;
use crate::retention::RetentionEnforcer;

/// Bounds for [`LogRotator::read_logs`]
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Earliest timestamp (inclusive)
    pub start: Option<DateTime<Utc>>,
    /// Latest timestamp (inclusive)
    pub end: Option<DateTime<Utc>>,
    /// Rotated files to scan, newest first. Defaults to `max_files`.
    pub max_files_to_scan: Option<usize>,
}

impl ReadOptions {
    fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| timestamp >= s) && self.end.map_or(true, |e| timestamp <= e)
    }
}

/// Rotated file as reported by [`LogRotator::status`]
#[derive(Debug, Clone, Serialize)]
pub struct RotatedFileInfo {
    pub path: PathBuf,
    pub size: u64,
    pub compressed: bool,
}

/// Snapshot of a rotator's state
#[derive(Debug, Clone, Serialize)]
pub struct RotatorStatus {
    pub current_path: PathBuf,
    pub current_size: u64,
    pub next_rotation: Option<DateTime<Utc>>,
    pub rotated: Vec<RotatedFileInfo>,
}

/// Builder for [`LogRotator`]
pub struct RotatorBuilder {
    dir: PathBuf,
    base_name: String,
    config: RotationConfig,
    codec: Option<Arc<dyn CompressionCodec>>,
    clock: Arc<dyn Clock>,
}

impl RotatorBuilder {
    pub fn config(mut self, config: RotationConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the gzip codec used for rotated files
    pub fn codec(mut self, codec: Arc<dyn CompressionCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate the configuration, create the directory, and reconcile the
    /// size counter with the file on disk. A torn trailing line left by a
    /// crash is cut off so the next append starts on a line boundary.
    pub async fn open(self) -> Result<LogRotator> {
        self.config.validate()?;
        if !validate_base_name(&self.base_name) {
            return Err(Error::config(format!(
                "Invalid base name '{}': only letters, digits, '_' and '-' are allowed",
                self.base_name
            )));
        }

        fs::create_dir_all(&self.dir).await?;

        let current_path = current_log_path(&self.dir, &self.base_name);
        let current_size = match fs::metadata(&current_path).await {
            Ok(meta) => trim_torn_tail(&current_path, meta.len()).await?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };

        let now = self.clock.now();
        let policy = RotationPolicy::new(self.config.clone(), now);
        let level = self.config.compression_level;
        let codec = self
            .codec
            .unwrap_or_else(|| Arc::new(GzipCodec::new(level)) as Arc<dyn CompressionCodec>);
        let namer = RotatedFileNamer::new(&self.dir, &self.base_name).with_suffix(codec.suffix());

        debug!(
            "Opened log stream {} ({} bytes, next rotation {:?})",
            current_path.display(),
            current_size,
            policy.next_rotation()
        );

        Ok(LogRotator {
            dir: self.dir,
            current_path,
            config: self.config,
            retention: RetentionEnforcer::new(namer.clone()),
            namer,
            codec,
            clock: self.clock,
            state: Mutex::new(RotatorState {
                file: None,
                current_size,
                policy,
            }),
        })
    }
}

/// Mutable per-stream state. Only touched while holding the rotator lock.
struct RotatorState {
    file: Option<File>,
    current_size: u64,
    policy: RotationPolicy,
}

/// Owns one `(directory, base name)` stream.
///
/// Writes, rotations and rewrites are serialized through one lock, so a write
/// always lands after any rotation it triggered. Reads only scan files and
/// never take the lock. Two rotators on the same files will race; one stream
/// must have exactly one rotator.
pub struct LogRotator {
    dir: PathBuf,
    current_path: PathBuf,
    config: RotationConfig,
    namer: RotatedFileNamer,
    retention: RetentionEnforcer,
    codec: Arc<dyn CompressionCodec>,
    clock: Arc<dyn Clock>,
    state: Mutex<RotatorState>,
}

impl LogRotator {
    pub fn builder(dir: impl Into<PathBuf>, base_name: impl Into<String>) -> RotatorBuilder {
        RotatorBuilder {
            dir: dir.into(),
            base_name: base_name.into(),
            config: RotationConfig::default(),
            codec: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Open a stream with the wall clock and gzip codec
    pub async fn open(
        dir: impl Into<PathBuf>,
        base_name: impl Into<String>,
        config: RotationConfig,
    ) -> Result<Self> {
        Self::builder(dir, base_name).config(config).open().await
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    pub fn base_name(&self) -> &str {
        self.namer.base_name()
    }

    pub fn current_path(&self) -> &Path {
        &self.current_path
    }

    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub async fn current_size(&self) -> u64 {
        self.state.lock().await.current_size
    }

    pub async fn next_rotation_time(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.policy.next_rotation()
    }

    /// Whether the next write would rotate. Does not advance the schedule.
    pub async fn should_rotate(&self) -> bool {
        let state = self.state.lock().await;
        state.policy.is_due(state.current_size, self.clock.now())
    }

    /// Rotated files of this stream, newest first
    pub async fn list_rotated(&self) -> Result<Vec<RotatedFile>> {
        Ok(self.namer.list_rotated().await?)
    }

    /// Append one entry, rotating first if the policy says so.
    ///
    /// A failed rotation is logged and retried on the next write; a failed
    /// append is returned and leaves the size counter untouched.
    pub async fn write_log(&self, entry: &LogEntry) -> Result<()> {
        let line = entry.to_line()?;
        let mut state = self.state.lock().await;

        let now = self.clock.now();
        let current_size = state.current_size;
        if state.policy.should_rotate(current_size, now) {
            if let Err(e) = self.rotate_locked(&mut state, now).await {
                warn!("Rotation of {} failed: {}", self.current_path.display(), e);
            }
        }

        self.append_locked(&mut state, line.as_bytes()).await
    }

    /// Rotate now regardless of the policy.
    ///
    /// Returns the archived path, or `None` when the current file was empty.
    pub async fn rotate(&self) -> Result<Option<PathBuf>> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();
        self.rotate_locked(&mut state, now).await
    }

    async fn append_locked(&self, state: &mut RotatorState, bytes: &[u8]) -> Result<()> {
        let file = match state.file.take() {
            Some(file) => file,
            None => open_append(&self.current_path).await?,
        };
        let file = state.file.insert(file);

        if let Err(e) = write_flushed(file, bytes).await {
            // drop any partial line so the next append starts on a clean boundary
            if let Err(trunc) = file.set_len(state.current_size).await {
                debug!("Could not roll back partial write: {}", trunc);
            }
            state.file = None;
            return Err(e.into());
        }

        state.current_size += bytes.len() as u64;
        Ok(())
    }

    async fn rotate_locked(
        &self,
        state: &mut RotatorState,
        now: DateTime<Utc>,
    ) -> Result<Option<PathBuf>> {
        if let Some(mut file) = state.file.take() {
            file.flush().await?;
        }

        let content = match fs::read(&self.current_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        if content.is_empty() {
            debug!("Skipping rotation of empty {}", self.current_path.display());
            state.current_size = 0;
            return Ok(None);
        }
        let original_size = content.len();

        let packed = if self.config.compress {
            match self.compress(content).await {
                Ok(packed) => Some(packed),
                Err(e) => {
                    warn!(
                        "Compression of {} failed, keeping rotated copy uncompressed: {}",
                        self.current_path.display(),
                        e
                    );
                    None
                }
            }
        } else {
            None
        };

        let dest = self.namer.next_name(now, packed.is_some()).await?;
        match &packed {
            Some(bytes) => {
                write_atomic(&dest, bytes).await?;
                if let Err(e) = File::create(&self.current_path).await {
                    // the entries are still in the current file, drop the copy
                    if let Err(undo) = fs::remove_file(&dest).await {
                        warn!("Could not remove {}: {}", dest.display(), undo);
                    }
                    return Err(e.into());
                }
            }
            None => {
                fs::rename(&self.current_path, &dest).await?;
                state.current_size = 0;
                File::create(&self.current_path).await?;
            }
        }
        state.current_size = 0;

        info!(
            "Rotated {} -> {} ({} bytes{})",
            self.current_path.display(),
            dest.display(),
            original_size,
            packed
                .as_ref()
                .map(|p| format!(", {} compressed", p.len()))
                .unwrap_or_default()
        );

        let report = self
            .retention
            .enforce(self.config.max_files, Some(&dest))
            .await;
        if !report.deleted.is_empty() {
            debug!("Retention removed {} rotated files", report.deleted.len());
        }

        Ok(Some(dest))
    }

    async fn compress(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        let codec = Arc::clone(&self.codec);
        tokio::task::spawn_blocking(move || codec.compress(&data))
            .await
            .map_err(|e| Error::compression(format!("compression task failed: {}", e)))?
    }

    async fn decompress(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        let codec = Arc::clone(&self.codec);
        tokio::task::spawn_blocking(move || codec.decompress(&data))
            .await
            .map_err(|e| Error::compression(format!("decompression task failed: {}", e)))?
    }

    /// Raw contents of a rotated file, decompressed when needed
    async fn read_rotated(&self, file: &RotatedFile) -> Result<Vec<u8>> {
        let raw = fs::read(&file.path).await?;
        if file.compressed {
            self.decompress(raw).await
        } else {
            Ok(raw)
        }
    }

    /// Read entries from the current file and the newest rotated files.
    ///
    /// Order: the current file first, then rotated files newest first; within a
    /// file entries keep their stored order. Callers wanting one timeline sort
    /// by timestamp. Unreadable files and unparsable lines are skipped.
    pub async fn read_logs(&self, options: &ReadOptions) -> Vec<LogEntry> {
        let mut entries = Vec::new();

        match fs::read(&self.current_path).await {
            Ok(bytes) => collect_entries(&bytes, &self.current_path, options, &mut entries),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Skipping {}: {}", self.current_path.display(), e),
        }

        let rotated = match self.namer.list_rotated().await {
            Ok(files) => files,
            Err(e) => {
                warn!("Could not list rotated logs in {}: {}", self.dir.display(), e);
                Vec::new()
            }
        };

        let max_files = options.max_files_to_scan.unwrap_or(self.config.max_files);
        for file in rotated.iter().take(max_files) {
            match self.read_rotated(file).await {
                Ok(bytes) => collect_entries(&bytes, &file.path, options, &mut entries),
                Err(e) => warn!("Skipping {}: {}", file.path.display(), e),
            }
        }

        entries
    }

    /// Rewrite the stream keeping only entries for which `keep` returns true.
    ///
    /// The current file is replaced via write-then-rename under the rotator
    /// lock; a failure there is returned. Rotated files are rewritten the same
    /// way, best effort, and deleted when nothing survives. Unparsable lines
    /// are dropped. Returns the number of entries removed.
    pub async fn retain<F>(&self, keep: F) -> Result<usize>
    where
        F: Fn(&LogEntry) -> bool,
    {
        let mut state = self.state.lock().await;
        if let Some(mut file) = state.file.take() {
            file.flush().await?;
        }

        let mut removed = 0usize;

        let bytes = match fs::read(&self.current_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let (kept, dropped) = partition_lines(&bytes, &keep)?;
        removed += dropped;
        write_atomic(&self.current_path, &kept).await?;
        state.current_size = kept.len() as u64;

        let rotated = self.namer.list_rotated().await?;
        for file in rotated {
            match self.retain_rotated(&file, &keep).await {
                Ok(dropped) => removed += dropped,
                Err(e) => warn!("Could not rewrite {}: {}", file.path.display(), e),
            }
        }

        info!(
            "Rewrote {} stream, removed {} entries",
            self.base_name(),
            removed
        );
        Ok(removed)
    }

    async fn retain_rotated<F>(&self, file: &RotatedFile, keep: &F) -> Result<usize>
    where
        F: Fn(&LogEntry) -> bool,
    {
        let bytes = self.read_rotated(file).await?;
        let (kept, dropped) = partition_lines(&bytes, keep)?;
        if dropped == 0 && kept.len() == bytes.len() {
            return Ok(0);
        }

        if kept.is_empty() {
            fs::remove_file(&file.path).await?;
        } else if file.compressed {
            let packed = self.compress(kept).await?;
            write_atomic(&file.path, &packed).await?;
        } else {
            write_atomic(&file.path, &kept).await?;
        }
        Ok(dropped)
    }

    /// Current state plus the rotated files on disk
    pub async fn status(&self) -> Result<RotatorStatus> {
        let (current_size, next_rotation) = {
            let state = self.state.lock().await;
            (state.current_size, state.policy.next_rotation())
        };

        let mut rotated = Vec::new();
        for file in self.namer.list_rotated().await? {
            let size = fs::metadata(&file.path).await.map(|m| m.len()).unwrap_or(0);
            rotated.push(RotatedFileInfo {
                path: file.path,
                size,
                compressed: file.compressed,
            });
        }

        Ok(RotatorStatus {
            current_path: self.current_path.clone(),
            current_size,
            next_rotation,
            rotated,
        })
    }
}

const TAIL_CHUNK: u64 = 8192;

/// Cut the file back to its last newline. Returns the resulting length.
async fn trim_torn_tail(path: &Path, len: u64) -> io::Result<u64> {
    if len == 0 {
        return Ok(0);
    }

    let mut file = OpenOptions::new().read(true).write(true).open(path).await?;
    let mut buf = vec![0u8; TAIL_CHUNK as usize];
    let mut end = len;
    let mut keep = 0;
    while end > 0 {
        let start = end.saturating_sub(TAIL_CHUNK);
        let chunk = &mut buf[..(end - start) as usize];
        file.seek(SeekFrom::Start(start)).await?;
        file.read_exact(chunk).await?;
        if let Some(pos) = chunk.iter().rposition(|&b| b == b'\n') {
            keep = start + pos as u64 + 1;
            break;
        }
        end = start;
    }

    if keep < len {
        warn!(
            "Dropping {} bytes of incomplete trailing line in {}",
            len - keep,
            path.display()
        );
        file.set_len(keep).await?;
    }
    Ok(keep)
}

async fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path).await
}

/// Write to a sibling temp file, then rename over `path`
async fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let result = match write_synced(&tmp, bytes).await {
        Ok(()) => fs::rename(&tmp, path).await,
        Err(e) => Err(e),
    };
    if result.is_err() {
        let _ = fs::remove_file(&tmp).await;
    }
    result
}

async fn write_flushed(file: &mut File, bytes: &[u8]) -> io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await
}

async fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

/// Parse JSON lines into `out`, skipping blank and malformed lines
fn collect_entries(bytes: &[u8], source: &Path, options: &ReadOptions, out: &mut Vec<LogEntry>) {
    let text = String::from_utf8_lossy(bytes);
    let mut skipped = 0usize;
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match LogEntry::from_line(line) {
            Ok(entry) if options.contains(entry.timestamp) => out.push(entry),
            Ok(_) => {}
            Err(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!("Skipped {} unparsable lines in {}", skipped, source.display());
    }
}

/// Split stored lines into the bytes to keep and the count of removed entries
fn partition_lines<F>(bytes: &[u8], keep: &F) -> Result<(Vec<u8>, usize)>
where
    F: Fn(&LogEntry) -> bool,
{
    let text = String::from_utf8_lossy(bytes);
    let mut kept = Vec::with_capacity(bytes.len());
    let mut dropped = 0usize;
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let Ok(entry) = LogEntry::from_line(line) else {
            continue;
        };
        if keep(&entry) {
            kept.extend_from_slice(entry.to_line()?.as_bytes());
        } else {
            dropped += 1;
        }
    }
    Ok((kept, dropped))
}
