//! `config`: show where settings come from and what they resolve to

use crate::config::{Config, VaultPaths};
use crate::error::VaultResult;

pub fn handle_config_command(paths: &VaultPaths, config: &Config) -> VaultResult<()> {
    println!("wsl-vault Configuration");
    println!("=======================");
    println!("Config file:      {}", paths.config_file().display());
    println!("Backup directory: {}", config.backup_dir.display());
    println!("Run log:          {}", config.log_file().display());
    println!("Restore staging:  {}", config.restore_dir().display());
    println!("Instances:        {}", config.instances_dir().display());
    println!();
    println!("Settings:");
    match config.distro_filter() {
        Some(name) => println!("  Distribution:    {}", name),
        None => println!("  Distribution:    (default distribution)"),
    }
    println!("  Remote:          {}", config.rclone_remote);
    println!("  Keep local:      {} days", config.retention_local);
    println!("  Keep remote:     {} days", config.retention_cloud);
    println!("  Upload retries:  {}", config.upload_retries);
    println!();
    println!("Tools:");
    println!("  wsl:    {}", config.tools.wsl);
    println!("  zstd:   {}", config.tools.zstd);
    println!("  rclone: {}", config.tools.rclone);

    Ok(())
}
