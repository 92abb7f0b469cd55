//! Consumer-facing log manager: recent-entry cache over a rotated stream

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::path::PathBuf;
use tidelog_core::{
    search_regex, take_recent, EntryMatcher, Error, LogEntry, LogFilter, LogLevel, Result,
    Settings,
};
use tracing::debug;

use crate::rotator::{LogRotator, ReadOptions};

/// Entry point for writing and querying one log stream.
///
/// Every entry is kept in a bounded in-memory cache (oldest evicted first) and
/// persisted through the [`LogRotator`]. Queries without a time range that the
/// cache can fully answer skip disk I/O. Concurrent writers land in the cache
/// in the same order as on disk.
pub struct LogManager {
    rotator: LogRotator,
    cache: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
    write_order: tokio::sync::Mutex<()>,
}

impl LogManager {
    pub fn new(rotator: LogRotator, cache_capacity: usize) -> Result<Self> {
        if cache_capacity == 0 {
            return Err(Error::config("cache_capacity must be at least 1"));
        }
        Ok(Self {
            rotator,
            cache: Mutex::new(VecDeque::with_capacity(cache_capacity)),
            capacity: cache_capacity,
            write_order: tokio::sync::Mutex::new(()),
        })
    }

    /// Open the stream described by `settings` with the wall clock
    pub async fn open(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let rotator = LogRotator::open(
            settings.stream.resolved_directory(),
            &settings.stream.base_name,
            settings.rotation.clone(),
        )
        .await?;
        Self::new(rotator, settings.stream.cache_capacity)
    }

    pub fn rotator(&self) -> &LogRotator {
        &self.rotator
    }

    /// Cached entries, oldest first
    pub fn cached(&self) -> Vec<LogEntry> {
        self.cache.lock().iter().cloned().collect()
    }

    /// Cache and persist one entry. Persistence failures are returned.
    pub async fn add_entry(&self, entry: LogEntry) -> Result<()> {
        let _order = self.write_order.lock().await;
        {
            let mut cache = self.cache.lock();
            if cache.len() >= self.capacity {
                cache.pop_front();
            }
            cache.push_back(entry.clone());
        }
        self.rotator.write_log(&entry).await
    }

    pub async fn log(
        &self,
        level: LogLevel,
        name: &str,
        message: &str,
        args: Vec<Value>,
    ) -> Result<()> {
        let entry = LogEntry::new(self.rotator.clock().now(), level, name, message).with_args(args);
        self.add_entry(entry).await
    }

    pub async fn debug(&self, name: &str, message: &str, args: Vec<Value>) -> Result<()> {
        self.log(LogLevel::Debug, name, message, args).await
    }

    pub async fn info(&self, name: &str, message: &str, args: Vec<Value>) -> Result<()> {
        self.log(LogLevel::Info, name, message, args).await
    }

    pub async fn success(&self, name: &str, message: &str, args: Vec<Value>) -> Result<()> {
        self.log(LogLevel::Success, name, message, args).await
    }

    pub async fn warning(&self, name: &str, message: &str, args: Vec<Value>) -> Result<()> {
        self.log(LogLevel::Warning, name, message, args).await
    }

    pub async fn error(&self, name: &str, message: &str, args: Vec<Value>) -> Result<()> {
        self.log(LogLevel::Error, name, message, args).await
    }

    /// Entries matching `filter`, oldest first.
    ///
    /// Served from the cache when the filter has no time range and the cache
    /// holds at least `limit` matches; otherwise read from disk.
    pub async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>> {
        let matcher = filter.compile()?;

        if let (false, Some(limit)) = (filter.has_time_range(), filter.limit) {
            let hits: Vec<LogEntry> = self
                .cache
                .lock()
                .iter()
                .filter(|e| matcher.matches(e))
                .cloned()
                .collect();
            if hits.len() >= limit {
                debug!("Serving {} entries from cache", limit);
                return Ok(take_recent(hits, Some(limit)));
            }
        }

        let entries = self.history(filter, &matcher).await;
        Ok(take_recent(entries, filter.limit))
    }

    /// Entries whose message or name matches the regex `pattern`, after the
    /// same filtering as [`get_logs`](Self::get_logs). `limit` applies last.
    pub async fn search(
        &self,
        pattern: &str,
        case_insensitive: bool,
        filter: &LogFilter,
    ) -> Result<Vec<LogEntry>> {
        let regex = search_regex(pattern, case_insensitive)?;
        let matcher = filter.compile()?;

        let hits: Vec<LogEntry> = self
            .history(filter, &matcher)
            .await
            .into_iter()
            .filter(|e| regex.is_match(&e.message) || regex.is_match(&e.name))
            .collect();
        Ok(take_recent(hits, filter.limit))
    }

    /// Remove every entry matching `filter` from the cache and from disk.
    ///
    /// `limit` is ignored. Returns the number of persisted entries removed.
    pub async fn clear(&self, filter: &LogFilter) -> Result<usize> {
        let matcher = filter.compile()?;
        self.cache.lock().retain(|e| !matcher.matches(e));
        self.rotator.retain(|e| !matcher.matches(e)).await
    }

    /// Force a rotation of the current file
    pub async fn rotate(&self) -> Result<Option<PathBuf>> {
        self.rotator.rotate().await
    }

    /// Persisted entries matching the filter in timestamp order
    async fn history(&self, filter: &LogFilter, matcher: &EntryMatcher) -> Vec<LogEntry> {
        let options = ReadOptions {
            start: filter.start,
            end: filter.end,
            max_files_to_scan: None,
        };
        let mut entries: Vec<LogEntry> = self
            .rotator
            .read_logs(&options)
            .await
            .into_iter()
            .filter(|e| matcher.matches(e))
            .collect();
        entries.sort_by_key(|e| e.timestamp);
        entries
    }
}
