use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use wsl_vault::cli::{
    handle_config_command, handle_daily_command, handle_list_cloud_command,
    handle_restore_command, handle_status_command,
};
use wsl_vault::config::{Config, VaultPaths};

#[derive(Parser)]
#[command(
    name = "wsl-vault",
    version,
    about = "Disaster-recovery backups for WSL distributions",
    long_about = "wsl-vault exports a WSL distribution, compresses it with zstd, \
                  uploads it with rclone and verifies the remote copy before \
                  pruning old archives. It can restore the newest archive as a \
                  new distribution."
)]
struct Cli {
    /// Path to the config file (JSON, or YAML by extension)
    #[arg(long, global = true, env = "WSL_VAULT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Export, compress, upload, verify and prune
    Daily,

    /// Show the newest local archive and whether it is overdue
    Status,

    /// List archives at the configured remote
    ListCloud,

    /// Import the newest remote archive as <distro>-restored
    RestoreLatest,

    /// Show the resolved config file and settings
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("WSL_VAULT_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let paths = VaultPaths::resolve(cli.config)?;
    let config = Config::load(paths.config_file())?;

    match command {
        Commands::Daily => handle_daily_command(&config)?,
        Commands::Status => handle_status_command(&config)?,
        Commands::ListCloud => handle_list_cloud_command(&config)?,
        Commands::RestoreLatest => handle_restore_command(&config)?,
        Commands::Config => handle_config_command(&paths, &config)?,
    }

    Ok(())
}
