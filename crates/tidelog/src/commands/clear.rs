//! Clear command implementation - removes matching entries from disk

use anyhow::{bail, Result};

use crate::cli::{ClearArgs, StreamArgs};
use crate::output::print_success_json;

pub async fn execute(stream: &StreamArgs, args: ClearArgs) -> Result<()> {
    if args.filter.is_empty() && !args.all {
        bail!("Refusing to clear every entry, pass a filter or --all");
    }

    let (manager, _) = super::open_manager(stream).await?;
    let removed = manager.clear(&args.filter.to_filter()).await?;

    print_success_json(
        &format!("Cleared {} entr{}", removed, if removed == 1 { "y" } else { "ies" }),
        Some(serde_json::json!({ "removed": removed })),
    );
    Ok(())
}
