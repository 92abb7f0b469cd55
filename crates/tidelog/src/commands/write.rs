//! Write command implementation

use anyhow::Result;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::{StreamArgs, WriteArgs};
use crate::output::print_success_json;

pub async fn execute(stream: &StreamArgs, args: WriteArgs) -> Result<()> {
    let (manager, _) = super::open_manager(stream).await?;
    let values: Vec<Value> = args.args.iter().map(|raw| parse_arg(raw)).collect();

    let mut written = 0usize;
    if args.message == "-" {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            manager
                .log(args.level, &args.name, &line, values.clone())
                .await?;
            written += 1;
        }
    } else {
        manager
            .log(args.level, &args.name, &args.message, values)
            .await?;
        written = 1;
    }

    print_success_json(
        &format!(
            "Wrote {} {} entr{} to {}",
            written,
            args.level,
            if written == 1 { "y" } else { "ies" },
            manager.rotator().current_path().display()
        ),
        Some(serde_json::json!({ "written": written })),
    );
    Ok(())
}

/// JSON when it parses, otherwise the raw string
fn parse_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
