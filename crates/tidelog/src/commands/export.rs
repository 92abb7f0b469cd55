//! Export command implementation

use anyhow::{Context, Result};
use tidelog_core::LogEntry;

use crate::cli::{ExportArgs, ExportFormat, StreamArgs};
use crate::output::{plain_line, print_success_json};

pub async fn execute(stream: &StreamArgs, args: ExportArgs) -> Result<()> {
    let (manager, _) = super::open_manager(stream).await?;
    let entries = manager.get_logs(&args.filter.to_filter()).await?;
    let body = render(&entries, args.format)?;

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, body)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            print_success_json(
                &format!("Exported {} entries to {}", entries.len(), path.display()),
                Some(serde_json::json!({ "exported": entries.len(), "path": path })),
            );
        }
        None => print!("{}", body),
    }
    Ok(())
}

fn render(entries: &[LogEntry], format: ExportFormat) -> Result<String> {
    let mut out = String::new();
    match format {
        ExportFormat::Jsonl => {
            for entry in entries {
                out.push_str(&entry.to_line()?);
            }
        }
        ExportFormat::Json => {
            out = serde_json::to_string_pretty(entries)?;
            out.push('\n');
        }
        ExportFormat::Text => {
            for entry in entries {
                out.push_str(&plain_line(entry));
                out.push('\n');
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tidelog_core::LogLevel;

    fn entries() -> Vec<LogEntry> {
        let at = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        vec![
            LogEntry::new(at, LogLevel::Info, "app", "started"),
            LogEntry::new(at, LogLevel::Error, "db", "lost connection"),
        ]
    }

    #[test]
    fn test_render_jsonl() {
        let out = render(&entries(), ExportFormat::Jsonl).unwrap();
        let parsed: Vec<LogEntry> = out.lines().map(|l| LogEntry::from_line(l).unwrap()).collect();
        assert_eq!(parsed, entries());
    }

    #[test]
    fn test_render_json_array() {
        let out = render(&entries(), ExportFormat::Json).unwrap();
        let parsed: Vec<LogEntry> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].name, "db");
    }

    #[test]
    fn test_render_text() {
        let out = render(&entries(), ExportFormat::Text).unwrap();
        assert_eq!(
            out,
            "2024-06-10 12:00:00.000 INFO    [app] started\n\
             2024-06-10 12:00:00.000 ERROR   [db] lost connection\n"
        );
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&[], ExportFormat::Jsonl).unwrap(), "");
        assert_eq!(render(&[], ExportFormat::Json).unwrap(), "[]\n");
    }
}
