//! `status`: freshness of the newest local archive

use chrono::Utc;
use colored::Colorize;

use crate::backup::{check_status, BackupStatus, Freshness};
use crate::config::Config;
use crate::display::{format_age, format_size};
use crate::error::VaultResult;
use crate::journal::RunLog;

pub fn handle_status_command(config: &Config) -> VaultResult<()> {
    match check_status(&config.backup_dir, Utc::now())? {
        BackupStatus::Empty => {
            println!("No backups found in {}", config.backup_dir.display());
        }
        BackupStatus::Latest {
            archive,
            age,
            freshness,
        } => {
            let badge = match freshness {
                Freshness::Fresh => freshness.to_string().green().bold(),
                Freshness::Overdue => freshness.to_string().red().bold(),
            };
            println!("Latest backup: {}", archive.file_name);
            println!("  Size:  {}", format_size(archive.size_bytes));
            println!("  Taken: {}", archive.modified.format("%Y-%m-%d %H:%M:%S UTC"));
            println!("  Age:   {} {}", format_age(age), badge);
        }
    }

    let log = RunLog::new(config.log_file());
    if let Some(entry) = log.read_recent(1)?.into_iter().next() {
        println!();
        println!("Last log entry: {}", entry);
    }

    Ok(())
}
