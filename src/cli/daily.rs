//! `daily`: one full backup run

use colored::Colorize;

use crate::backup::BackupPipeline;
use crate::config::Config;
use crate::display::{format_duration, format_size, ConsoleReporter};
use crate::error::VaultResult;
use crate::journal::RunLog;
use crate::tools::Toolset;

/// Run the pipeline with the system tools
///
/// The first failing stage's error is returned so the process exits non-zero.
pub fn handle_daily_command(config: &Config) -> VaultResult<()> {
    let toolset = Toolset::system(config);
    let log = RunLog::new(config.log_file());

    println!("{}", "WSL backup".bold());
    println!("Backup directory: {}", config.backup_dir.display());
    println!("Remote:           {}", config.rclone_remote);
    println!();

    let mut reporter = ConsoleReporter::new();
    let result = BackupPipeline::new(config, toolset.tools(), &log).run(&mut reporter);

    println!();
    if let Some(failure) = result.failure {
        println!(
            "{} after {}; details in {}",
            format!("Backup failed at {}", failure.stage).red().bold(),
            format_duration(result.elapsed),
            log.path().display()
        );
        return Err(failure.error);
    }

    if let Some(archive) = &result.archive {
        println!("{} {}", "Backup complete:".green().bold(), archive.file_name());
    }
    println!(
        "  {} -> {} ({:.2}x) in {}",
        format_size(result.raw_size),
        format_size(result.compressed_size),
        result.ratio,
        format_duration(result.elapsed)
    );

    if let Some(report) = &result.retention {
        if let Some(reason) = &report.cloud_error {
            println!("  {} cloud retention: {}", "warning:".yellow().bold(), reason);
        }
        for (path, reason) in &report.local.skipped {
            println!(
                "  {} could not delete {}: {}",
                "warning:".yellow().bold(),
                path.display(),
                reason
            );
        }
    }

    Ok(())
}
