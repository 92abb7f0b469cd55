//! Query filters over log entries

use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{LogEntry, LogLevel};

/// Filter criteria for querying logs.
///
/// Every field is optional; an empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    /// Exact level match
    pub level: Option<LogLevel>,
    /// Name glob where `*` matches any run of characters
    pub name: Option<String>,
    /// Earliest timestamp (inclusive)
    pub start: Option<DateTime<Utc>>,
    /// Latest timestamp (inclusive)
    pub end: Option<DateTime<Utc>>,
    /// Keep only the most recent N entries after other filters apply
    pub limit: Option<usize>,
}

impl LogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_name(mut self, pattern: impl Into<String>) -> Self {
        self.name = Some(pattern.into());
        self
    }

    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn has_time_range(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    /// Compile the name glob so the filter can be applied repeatedly
    pub fn compile(&self) -> Result<EntryMatcher> {
        let name = match &self.name {
            Some(pattern) => Some(NamePattern::compile(pattern)?),
            None => None,
        };
        Ok(EntryMatcher {
            level: self.level,
            name,
            start: self.start,
            end: self.end,
        })
    }
}

/// A [`LogFilter`] with its name pattern compiled. `limit` is applied by the caller.
#[derive(Debug, Clone)]
pub struct EntryMatcher {
    level: Option<LogLevel>,
    name: Option<NamePattern>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl EntryMatcher {
    pub fn matches(&self, entry: &LogEntry) -> bool {
        if let Some(level) = self.level {
            if entry.level != level {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if !name.matches(&entry.name) {
                return false;
            }
        }
        self.in_range(entry.timestamp)
    }

    /// Inclusive time bounds check
    pub fn in_range(&self, timestamp: DateTime<Utc>) -> bool {
        if let Some(start) = self.start {
            if timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if timestamp > end {
                return false;
            }
        }
        true
    }
}

/// Name glob compiled to an anchored regex.
///
/// Only `*` is special; every other character matches literally.
#[derive(Debug, Clone)]
pub struct NamePattern {
    source: String,
    regex: Regex,
}

impl NamePattern {
    pub fn compile(pattern: &str) -> Result<Self> {
        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("^{}$", body))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Compile a user search pattern
pub fn search_regex(pattern: &str, case_insensitive: bool) -> Result<Regex> {
    Ok(RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()?)
}

/// Apply `limit` to a chronologically ordered list, keeping the most recent entries
pub fn take_recent(mut entries: Vec<LogEntry>, limit: Option<usize>) -> Vec<LogEntry> {
    if let Some(limit) = limit {
        if entries.len() > limit {
            entries.drain(..entries.len() - limit);
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn entry(level: LogLevel, name: &str, minute: u32) -> LogEntry {
        LogEntry::new(
            Utc.with_ymd_and_hms(2024, 5, 10, 8, minute, 0).unwrap(),
            level,
            name,
            "msg",
        )
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let matcher = LogFilter::new().compile().unwrap();
        assert!(matcher.matches(&entry(LogLevel::Debug, "x", 0)));
        assert!(matcher.matches(&entry(LogLevel::Error, "y:z", 59)));
    }

    #[test]
    fn test_level_exact_match() {
        let matcher = LogFilter::new().with_level(LogLevel::Error).compile().unwrap();
        assert!(matcher.matches(&entry(LogLevel::Error, "a", 0)));
        assert!(!matcher.matches(&entry(LogLevel::Warning, "a", 0)));
        assert!(!matcher.matches(&entry(LogLevel::Debug, "a", 0)));
    }

    #[test]
    fn test_name_glob() {
        let matcher = LogFilter::new().with_name("parser:*").compile().unwrap();
        assert!(matcher.matches(&entry(LogLevel::Info, "parser:lexer", 0)));
        assert!(matcher.matches(&entry(LogLevel::Info, "parser:token", 0)));
        assert!(!matcher.matches(&entry(LogLevel::Info, "server", 0)));
        assert!(!matcher.matches(&entry(LogLevel::Info, "myparser:lexer", 0)));
    }

    #[test]
    fn test_name_glob_escapes_metacharacters() {
        let pattern = NamePattern::compile("a.b(c)+*").unwrap();
        assert!(pattern.matches("a.b(c)+"));
        assert!(pattern.matches("a.b(c)+tail"));
        assert!(!pattern.matches("axb(c)+"));
        assert!(!pattern.matches("a.bcc"));
    }

    #[test]
    fn test_name_glob_exact_without_star() {
        let pattern = NamePattern::compile("server").unwrap();
        assert!(pattern.matches("server"));
        assert!(!pattern.matches("server:http"));
        assert_eq!(pattern.as_str(), "server");
    }

    #[test]
    fn test_time_range_inclusive() {
        let start = Utc.with_ymd_and_hms(2024, 5, 10, 8, 10, 0).unwrap();
        let end = start + Duration::minutes(10);
        let matcher = LogFilter::new()
            .with_start(start)
            .with_end(end)
            .compile()
            .unwrap();

        assert!(!matcher.matches(&entry(LogLevel::Info, "a", 9)));
        assert!(matcher.matches(&entry(LogLevel::Info, "a", 10)));
        assert!(matcher.matches(&entry(LogLevel::Info, "a", 20)));
        assert!(!matcher.matches(&entry(LogLevel::Info, "a", 21)));
    }

    #[test]
    fn test_take_recent() {
        let entries: Vec<_> = (0..5).map(|m| entry(LogLevel::Info, "a", m)).collect();
        let recent = take_recent(entries.clone(), Some(2));
        assert_eq!(recent, entries[3..].to_vec());
        assert_eq!(take_recent(entries.clone(), None).len(), 5);
        assert_eq!(take_recent(entries, Some(10)).len(), 5);
    }

    #[test]
    fn test_search_regex_case() {
        let sensitive = search_regex("Timeout", false).unwrap();
        let insensitive = search_regex("Timeout", true).unwrap();
        assert!(!sensitive.is_match("connection timeout"));
        assert!(insensitive.is_match("connection timeout"));
        assert!(search_regex("(", false).is_err());
    }

    proptest! {
        #[test]
        fn prop_literal_pattern_matches_itself(name in "[ -~]{0,24}") {
            let literal = name.replace('*', "");
            let pattern = NamePattern::compile(&literal).unwrap();
            prop_assert!(pattern.matches(&literal));
        }

        #[test]
        fn prop_prefix_star_matches_any_suffix(prefix in "[a-z:.]{1,10}", suffix in "[ -~]{0,10}") {
            let pattern = NamePattern::compile(&format!("{}*", prefix)).unwrap();
            let candidate = format!("{}{}", prefix, suffix);
            prop_assert!(pattern.matches(&candidate));
        }
    }
}
