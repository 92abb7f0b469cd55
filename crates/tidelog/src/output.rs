//! Console output formatting

use colored::Colorize;
use regex::Regex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};
use tidelog_core::{Frequency, LogEntry, LogLevel, RotationConfig};
use tidelog_rotation::{RotatedFileInfo, RotatorStatus};

/// Global flag for JSON output mode
static JSON_MODE: AtomicBool = AtomicBool::new(false);

/// Enable or disable JSON output mode
pub fn set_json_mode(enabled: bool) {
    JSON_MODE.store(enabled, Ordering::SeqCst);
}

/// Check if JSON output mode is enabled
pub fn is_json_mode() -> bool {
    JSON_MODE.load(Ordering::SeqCst)
}

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

fn format_level(level: LogLevel) -> String {
    let label = format!("{:<7}", level.as_str().to_uppercase());
    match level {
        LogLevel::Debug => label.bright_black().to_string(),
        LogLevel::Info => label.blue().to_string(),
        LogLevel::Success => label.green().to_string(),
        LogLevel::Warning => label.yellow().to_string(),
        LogLevel::Error => label.red().bold().to_string(),
    }
}

/// Uncolored single-line form, used for text export
pub fn plain_line(entry: &LogEntry) -> String {
    format!(
        "{} {:<7} [{}] {}",
        entry.timestamp.format(TIME_FORMAT),
        entry.level.as_str().to_uppercase(),
        entry.name,
        entry.render()
    )
}

fn format_entry(entry: &LogEntry, highlight: Option<&Regex>) -> String {
    let message = entry.render();
    let message = match highlight {
        Some(regex) => regex
            .replace_all(&message, |caps: &regex::Captures| caps[0].bold().underline().to_string())
            .into_owned(),
        None => message,
    };
    format!(
        "{} {} {} {}",
        entry.timestamp.format(TIME_FORMAT).to_string().dimmed(),
        format_level(entry.level),
        format!("[{}]", entry.name).cyan(),
        message
    )
}

pub fn print_entry(entry: &LogEntry) {
    if is_json_mode() {
        match serde_json::to_string(entry) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing to JSON: {}", e),
        }
        return;
    }
    println!("{}", format_entry(entry, None));
}

/// Print entries, emphasizing `highlight` matches in text mode
pub fn print_entries(entries: &[LogEntry], highlight: Option<&Regex>) {
    if is_json_mode() {
        match serde_json::to_string_pretty(entries) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing to JSON: {}", e),
        }
        return;
    }

    if entries.is_empty() {
        println!("{}", "No matching entries".dimmed());
        return;
    }
    for entry in entries {
        println!("{}", format_entry(entry, highlight));
    }
}

#[derive(Tabled)]
pub struct RotatedRow {
    #[tabled(rename = "#")]
    pub position: usize,
    #[tabled(rename = "file")]
    pub file: String,
    #[tabled(rename = "size")]
    pub size: String,
    #[tabled(rename = "gzip")]
    pub compressed: String,
}

impl RotatedRow {
    fn new(position: usize, info: &RotatedFileInfo) -> Self {
        RotatedRow {
            position,
            file: info
                .path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| info.path.display().to_string()),
            size: format_bytes(info.size),
            compressed: if info.compressed { "yes".green().to_string() } else { "-".to_string() },
        }
    }
}

/// JSON form of `status`
#[derive(Serialize)]
pub struct StatusJson<'a> {
    #[serde(flatten)]
    pub status: &'a RotatorStatus,
    pub config: &'a RotationConfig,
}

fn describe_policy(config: &RotationConfig) -> String {
    let mut parts = vec![format!("size >= {}", format_bytes(config.max_size))];
    let at = format!("{:02}:{:02} UTC", config.rotate_hour, config.rotate_minute);
    match config.frequency {
        Frequency::None => {}
        Frequency::Daily => parts.push(format!("daily at {}", at)),
        Frequency::Weekly => parts.push(format!(
            "weekly on {} at {}",
            weekday_name(config.rotate_day_of_week),
            at
        )),
        Frequency::Monthly => parts.push(format!(
            "monthly on day {} at {}",
            config.rotate_day_of_month, at
        )),
    }
    parts.join(" or ")
}

fn weekday_name(day: u32) -> &'static str {
    match day {
        0 => "Sunday",
        1 => "Monday",
        2 => "Tuesday",
        3 => "Wednesday",
        4 => "Thursday",
        5 => "Friday",
        _ => "Saturday",
    }
}

pub fn print_status(status: &RotatorStatus, config: &RotationConfig) {
    if is_json_mode() {
        match serde_json::to_string_pretty(&StatusJson { status, config }) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing to JSON: {}", e),
        }
        return;
    }

    println!("{}", "─".repeat(50));
    println!("  {} │ {}", "Current".bold(), status.current_path.display());
    println!("  {} │ {}", "Size".bold(), format_bytes(status.current_size));
    println!("  {} │ {}", "Rotates".bold(), describe_policy(config));
    if let Some(next) = status.next_rotation {
        println!("  {} │ {}", "Next".bold(), next.format("%Y-%m-%d %H:%M UTC"));
    }
    println!(
        "  {} │ {}{}",
        "Keep".bold(),
        config.max_files,
        if config.compress { ", gzip" } else { "" }
    );
    println!("{}", "─".repeat(50));

    if status.rotated.is_empty() {
        println!("No rotated files");
        return;
    }

    let rows: Vec<RotatedRow> = status
        .rotated
        .iter()
        .enumerate()
        .map(|(i, info)| RotatedRow::new(i + 1, info))
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(0)).with(Alignment::right()))
        .with(Modify::new(Columns::single(2)).with(Alignment::right()))
        .to_string();

    println!("{}", table);
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.1}G", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.1}M", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.0}K", bytes as f64 / 1024.0)
    } else {
        format!("{}B", bytes)
    }
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

/// JSON wrapper for command results
#[derive(Serialize)]
pub struct ResponseJson<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Print a success message, as a JSON response in JSON mode
pub fn print_success_json<T: Serialize>(message: &str, data: Option<T>) {
    if is_json_mode() {
        let response = ResponseJson {
            success: true,
            message: Some(message.to_string()),
            data,
        };
        if let Ok(json) = serde_json::to_string_pretty(&response) {
            println!("{}", json);
        }
    } else {
        print_success(message);
    }
}
