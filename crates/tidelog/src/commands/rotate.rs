//! Rotate command implementation

use anyhow::Result;

use crate::cli::StreamArgs;
use crate::output::{is_json_mode, print_info, print_success_json};

pub async fn execute(stream: &StreamArgs) -> Result<()> {
    let (manager, _) = super::open_manager(stream).await?;

    match manager.rotate().await? {
        Some(path) => print_success_json(
            &format!("Rotated to {}", path.display()),
            Some(serde_json::json!({ "rotated": path })),
        ),
        None if is_json_mode() => print_success_json(
            "Current log is empty",
            Some(serde_json::json!({ "rotated": null })),
        ),
        None => print_info("Current log is empty, nothing to rotate"),
    }
    Ok(())
}
