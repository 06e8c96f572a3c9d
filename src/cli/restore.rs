//! `restore-latest`: import the newest remote archive under a new name

use colored::Colorize;

use crate::backup::RestoreOrchestrator;
use crate::config::Config;
use crate::display::ConsoleReporter;
use crate::error::VaultResult;
use crate::journal::RunLog;
use crate::tools::Toolset;

pub fn handle_restore_command(config: &Config) -> VaultResult<()> {
    let toolset = Toolset::system(config);
    let log = RunLog::new(config.log_file());

    println!("{}", "WSL restore".bold());
    println!("Remote: {}", config.rclone_remote);
    println!();

    let mut reporter = ConsoleReporter::new();
    let outcome = RestoreOrchestrator::new(config, toolset.tools(), &log)
        .restore_latest(&mut reporter)?;

    println!();
    println!(
        "{} {} imported as {}",
        "Restore complete:".green().bold(),
        outcome.archive.file_name,
        outcome.restored_name.bold()
    );
    println!("  Install directory: {}", outcome.install_dir.display());
    if outcome.reused_download {
        println!("  Reused the complete local copy in {}", config.restore_dir().display());
    }
    println!("  Start it with: wsl -d {}", outcome.restored_name);

    Ok(())
}
