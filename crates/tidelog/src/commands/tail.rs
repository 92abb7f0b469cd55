//! Tail command implementation

use anyhow::Result;
use tidelog_core::current_log_path;
use tidelog_rotation::LogTail;

use crate::cli::{StreamArgs, TailArgs};
use crate::output::{print_entries, print_entry};

pub async fn execute(stream: &StreamArgs, args: TailArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let settings = super::load_settings(stream, &cwd)?;
    let path = current_log_path(
        &settings.stream.resolved_directory(),
        &settings.stream.base_name,
    );

    let tail = LogTail::new(path);
    let entries = tail.tail(args.lines)?;
    if !args.follow {
        print_entries(&entries, None);
        return Ok(());
    }

    for entry in &entries {
        print_entry(entry);
    }
    let mut rx = tail.follow()?;
    loop {
        tokio::select! {
            entry = rx.recv() => match entry {
                Some(entry) => print_entry(&entry),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}
