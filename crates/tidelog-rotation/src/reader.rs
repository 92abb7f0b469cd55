//! Tail and follow the current log file

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tidelog_core::{Error, LogEntry, Result};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tracing::debug;

/// Bytes read per step when scanning backwards
const TAIL_CHUNK: u64 = 8192;

/// Fallback re-check interval when no file event arrives
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Reader over a stream's current file
pub struct LogTail {
    path: PathBuf,
}

impl LogTail {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Last `n` parsable entries, oldest first.
    ///
    /// Scans backwards from the end so large files are not read whole.
    pub fn tail(&self, n: usize) -> Result<Vec<LogEntry>> {
        if n == 0 {
            return Ok(vec![]);
        }
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut position = file.metadata()?.len();
        let mut entries = Vec::with_capacity(n);
        // start of a line whose beginning lies in an earlier chunk
        let mut carry: Vec<u8> = Vec::new();

        while position > 0 && entries.len() < n {
            let read_size = TAIL_CHUNK.min(position);
            position -= read_size;

            file.seek(SeekFrom::Start(position))?;
            let mut chunk = vec![0u8; read_size as usize];
            file.read_exact(&mut chunk)?;
            chunk.extend_from_slice(&carry);

            let split = if position > 0 {
                match chunk.iter().position(|&b| b == b'\n') {
                    Some(i) => i + 1,
                    None => {
                        carry = chunk;
                        continue;
                    }
                }
            } else {
                0
            };

            for line in chunk[split..].split(|&b| b == b'\n').rev() {
                if entries.len() >= n {
                    break;
                }
                if let Some(entry) = parse_line(line) {
                    entries.push(entry);
                }
            }
            carry = chunk[..split].to_vec();
        }

        entries.reverse();
        Ok(entries)
    }

    /// Stream entries appended after this call (like `tail -f`).
    ///
    /// Survives rotation: when the file is replaced or shrinks, reading
    /// restarts from its beginning. The background task ends when the
    /// receiver is dropped.
    pub fn follow(&self) -> Result<mpsc::Receiver<LogEntry>> {
        let (position, id) = match std::fs::metadata(&self.path) {
            Ok(meta) => (meta.len(), file_id(&meta)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => (0, None),
            Err(e) => return Err(e.into()),
        };

        let path = self.path.clone();
        let (tx, rx) = mpsc::channel(100);
        tokio::spawn(async move {
            if let Err(e) = follow_file(path, position, id, tx).await {
                debug!("Follow ended: {}", e);
            }
        });

        Ok(rx)
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> Result<u64> {
        match std::fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

fn parse_line(line: &[u8]) -> Option<LogEntry> {
    let text = String::from_utf8_lossy(line);
    if text.trim().is_empty() {
        return None;
    }
    LogEntry::from_line(&text).ok()
}

#[cfg(unix)]
fn file_id(meta: &std::fs::Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(meta.ino())
}

#[cfg(not(unix))]
fn file_id(_meta: &std::fs::Metadata) -> Option<u64> {
    None
}

async fn follow_file(
    path: PathBuf,
    mut position: u64,
    mut id: Option<u64>,
    tx: mpsc::Sender<LogEntry>,
) -> Result<()> {
    use notify::{RecommendedWatcher, RecursiveMode, Watcher};

    // rotation renames the file, so watch the directory rather than the inode
    let watch_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let (watch_tx, mut watch_rx) = mpsc::unbounded_channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| {
            let _ = watch_tx.send(res);
        },
        notify::Config::default(),
    )
    .map_err(|e| Error::config(format!("Failed to create watcher: {}", e)))?;

    watcher
        .watch(&watch_dir, RecursiveMode::NonRecursive)
        .map_err(|e| Error::config(format!("Failed to watch {}: {}", watch_dir.display(), e)))?;

    let mut pending: Vec<u8> = Vec::new();

    loop {
        tokio::select! {
            _ = tx.closed() => break,
            event = tokio::time::timeout(POLL_INTERVAL, watch_rx.recv()) => match event {
                Ok(None) => break,
                Ok(Some(Err(e))) => debug!("Watch error: {}", e),
                Ok(Some(Ok(_))) | Err(_) => {}
            },
        }

        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };

        let current_id = file_id(&meta);
        if meta.len() < position || current_id != id {
            debug!("{} was rotated, reading from the start", path.display());
            position = 0;
            pending.clear();
            id = current_id;
        }
        if meta.len() == position {
            continue;
        }

        let mut file = tokio::fs::File::open(&path).await?;
        file.seek(SeekFrom::Start(position)).await?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await?;
        position += buf.len() as u64;
        pending.extend_from_slice(&buf);

        while let Some(end) = pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = pending.drain(..=end).collect();
            let Some(entry) = parse_line(&line) else {
                continue;
            };
            if tx.send(entry).await.is_err() {
                return Ok(());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotator::LogRotator;
    use chrono::Utc;
    use std::io::Write;
    use tempfile::TempDir;
    use tidelog_core::{LogLevel, RotationConfig};

    fn entry(message: &str) -> LogEntry {
        LogEntry::new(Utc::now(), LogLevel::Info, "test", message)
    }

    fn write_entries(path: &Path, count: usize) {
        let mut file = File::create(path).unwrap();
        for i in 1..=count {
            let line = entry(&format!("entry {} with some longer content here", i))
                .to_line()
                .unwrap();
            file.write_all(line.as_bytes()).unwrap();
        }
    }

    #[test]
    fn test_tail_nonexistent_file() {
        let tail = LogTail::new("/nonexistent/app.log");
        assert!(tail.tail(10).unwrap().is_empty());
        assert!(!tail.exists());
        assert_eq!(tail.size().unwrap(), 0);
    }

    #[test]
    fn test_tail_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        File::create(&path).unwrap();

        assert!(LogTail::new(path).tail(10).unwrap().is_empty());
    }

    #[test]
    fn test_tail_last_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        write_entries(&path, 20);

        let entries = LogTail::new(path).tail(5).unwrap();
        assert_eq!(entries.len(), 5);
        assert!(entries[0].message.starts_with("entry 16 "));
        assert!(entries[4].message.starts_with("entry 20 "));
    }

    #[test]
    fn test_tail_spans_chunks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        write_entries(&path, 400);
        assert!(std::fs::metadata(&path).unwrap().len() > TAIL_CHUNK * 2);

        let tail = LogTail::new(path);
        let entries = tail.tail(150).unwrap();
        assert_eq!(entries.len(), 150);
        assert!(entries[0].message.starts_with("entry 251 "));
        assert!(entries[149].message.starts_with("entry 400 "));

        assert_eq!(tail.tail(1000).unwrap().len(), 400);
    }

    #[test]
    fn test_tail_skips_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let mut file = File::create(&path).unwrap();
        file.write_all(entry("one").to_line().unwrap().as_bytes()).unwrap();
        file.write_all(b"not json\n\n").unwrap();
        file.write_all(entry("two").to_line().unwrap().as_bytes()).unwrap();

        let messages: Vec<String> = LogTail::new(path)
            .tail(3)
            .unwrap()
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_follow_across_rotation() {
        let dir = TempDir::new().unwrap();
        let rotator = LogRotator::open(dir.path(), "app", RotationConfig::default())
            .await
            .unwrap();
        rotator.write_log(&entry("before")).await.unwrap();

        let mut rx = LogTail::new(rotator.current_path()).follow().unwrap();

        rotator.write_log(&entry("first")).await.unwrap();
        let got = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.message, "first");

        rotator.rotate().await.unwrap();
        rotator.write_log(&entry("second")).await.unwrap();
        let got = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.message, "second");
    }
}
