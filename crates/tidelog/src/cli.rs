//! CLI argument definitions

use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tidelog_core::{LogFilter, LogLevel};

#[derive(Parser)]
#[command(name = "tidelog")]
#[command(version, about = "Structured logs with rotation, compression and retention")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub stream: StreamArgs,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output in JSON format instead of text
    #[arg(long, global = true)]
    pub json: bool,
}

/// Which stream to operate on
#[derive(Args, Debug, Clone, Default)]
pub struct StreamArgs {
    /// Config file (.toml, .yaml, .yml or .json). Defaults to tidelog.* in the current directory
    #[arg(short, long, global = true, env = "TIDELOG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log directory, overrides the config file
    #[arg(long, global = true, env = "TIDELOG_DIR")]
    pub dir: Option<PathBuf>,

    /// Stream base name, overrides the config file
    #[arg(long, global = true)]
    pub base: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Append an entry ("-" reads one message per line from stdin)
    Write(WriteArgs),

    /// Show entries, oldest first
    Show(FilterArgs),

    /// Search messages and names with a regex
    Search(SearchArgs),

    /// Remove matching entries from the current and rotated files
    Clear(ClearArgs),

    /// Rotate the current file now
    Rotate,

    /// Export entries as jsonl, json or text
    Export(ExportArgs),

    /// Print the last entries of the current file
    Tail(TailArgs),

    /// Show the current file, schedule and rotated files
    Status,
}

#[derive(Args)]
pub struct WriteArgs {
    /// Message, may contain {} or {N} placeholders
    pub message: String,

    /// Severity: debug, info, success, warning, error
    #[arg(short, long, default_value = "info")]
    pub level: LogLevel,

    /// Source name, e.g. parser:lexer
    #[arg(short, long, default_value = "cli")]
    pub name: String,

    /// Placeholder argument (repeatable). Parsed as JSON, otherwise kept as a string
    #[arg(long = "arg")]
    pub args: Vec<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only this level
    #[arg(short, long)]
    pub level: Option<LogLevel>,

    /// Name glob, `*` matches any run of characters
    #[arg(short, long)]
    pub name: Option<String>,

    /// Earliest entry: RFC 3339, YYYY-MM-DD, or an age such as 30m, 2h, 1d
    #[arg(long, value_parser = parse_time)]
    pub since: Option<DateTime<Utc>>,

    /// Latest entry, same formats as --since
    #[arg(long, value_parser = parse_time)]
    pub until: Option<DateTime<Utc>>,

    /// Keep only the most recent N matches
    #[arg(long)]
    pub limit: Option<usize>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> LogFilter {
        LogFilter {
            level: self.level,
            name: self.name.clone(),
            start: self.since,
            end: self.until,
            limit: self.limit,
        }
    }

    /// True when no field narrows the selection
    pub fn is_empty(&self) -> bool {
        self.level.is_none() && self.name.is_none() && self.since.is_none() && self.until.is_none()
    }
}

#[derive(Args)]
pub struct SearchArgs {
    /// Regular expression matched against message and name
    pub pattern: String,

    /// Case-insensitive match
    #[arg(short = 'i', long)]
    pub ignore_case: bool,

    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Args)]
pub struct ClearArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Clear every entry when no filter is given
    #[arg(long)]
    pub all: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ExportFormat {
    /// One JSON entry per line
    Jsonl,
    /// A JSON array
    Json,
    /// Plain formatted lines
    Text,
}

#[derive(Args)]
pub struct ExportArgs {
    #[arg(long, value_enum, default_value = "jsonl")]
    pub format: ExportFormat,

    /// Output file, stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Args)]
pub struct TailArgs {
    /// Number of entries to show
    #[arg(short = 'n', long, default_value = "15")]
    pub lines: usize,

    /// Keep printing new entries
    #[arg(short, long)]
    pub follow: bool,
}

/// Parse an absolute time or an age relative to now
fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    let secs = parse_duration(s)
        .map_err(|e| format!("{} (expected RFC 3339, YYYY-MM-DD or an age like 2h)", e))?;
    let age = i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| format!("Duration too large: {}", s))?;
    Utc::now()
        .checked_sub_signed(age)
        .ok_or_else(|| format!("Duration too large: {}", s))
}

/// Parse duration strings like "1h", "30m", "2d", "24h30m" into seconds
fn parse_duration(s: &str) -> Result<u64, String> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return Err("Empty duration string".to_string());
    }

    let mut total_secs: u64 = 0;
    let mut current_num = String::new();

    for c in s.chars() {
        if c.is_ascii_digit() {
            current_num.push(c);
            continue;
        }
        if current_num.is_empty() {
            return Err(format!("Invalid duration format: {}", s));
        }
        let num: u64 = current_num
            .parse()
            .map_err(|_| format!("Invalid number in duration: {}", current_num))?;
        current_num.clear();

        let multiplier = match c {
            's' => 1,
            'm' => 60,
            'h' => 3600,
            'd' => 86400,
            'w' => 604800,
            _ => return Err(format!("Unknown duration unit: {}", c)),
        };
        total_secs = num
            .checked_mul(multiplier)
            .and_then(|secs| total_secs.checked_add(secs))
            .ok_or_else(|| format!("Duration too large: {}", s))?;
    }

    // a trailing bare number counts as seconds
    if !current_num.is_empty() {
        let num: u64 = current_num
            .parse()
            .map_err(|_| format!("Invalid number in duration: {}", current_num))?;
        total_secs = total_secs
            .checked_add(num)
            .ok_or_else(|| format!("Duration too large: {}", s))?;
    }

    if total_secs == 0 {
        return Err("Duration must be greater than 0".to_string());
    }

    Ok(total_secs)
}
