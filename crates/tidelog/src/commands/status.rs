//! Status command implementation

use anyhow::Result;

use crate::cli::StreamArgs;
use crate::output::print_status;

pub async fn execute(stream: &StreamArgs) -> Result<()> {
    let (manager, settings) = super::open_manager(stream).await?;
    let status = manager.rotator().status().await?;
    print_status(&status, &settings.rotation);
    Ok(())
}
