//! `list-cloud`: archives at the configured remote

use crate::config::Config;
use crate::display::format_remote_archives;
use crate::error::VaultResult;
use crate::tools::Toolset;

pub fn handle_list_cloud_command(config: &Config) -> VaultResult<()> {
    let toolset = Toolset::system(config);
    let entries = toolset.remote.list(&config.rclone_remote)?;

    println!("Archives at {}", config.rclone_remote);
    println!("{}", format_remote_archives(&entries));

    Ok(())
}
