//! Search command implementation

use anyhow::Result;
use tidelog_core::search_regex;

use crate::cli::{SearchArgs, StreamArgs};
use crate::output::print_entries;

pub async fn execute(stream: &StreamArgs, args: SearchArgs) -> Result<()> {
    let regex = search_regex(&args.pattern, args.ignore_case)?;
    let (manager, _) = super::open_manager(stream).await?;

    let entries = manager
        .search(&args.pattern, args.ignore_case, &args.filter.to_filter())
        .await?;
    print_entries(&entries, Some(&regex));
    Ok(())
}
