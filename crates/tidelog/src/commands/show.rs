//! Show command implementation

use anyhow::Result;

use crate::cli::{FilterArgs, StreamArgs};
use crate::output::print_entries;

pub async fn execute(stream: &StreamArgs, args: FilterArgs) -> Result<()> {
    let (manager, _) = super::open_manager(stream).await?;
    let entries = manager.get_logs(&args.to_filter()).await?;
    print_entries(&entries, None);
    Ok(())
}
