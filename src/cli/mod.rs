//! CLI command handlers
//!
//! This module contains the implementation of CLI commands, bridging the
//! clap argument parsing with the backup pipeline and restore orchestrator.

pub mod config;
pub mod daily;
pub mod list_cloud;
pub mod restore;
pub mod status;

pub use config::handle_config_command;
pub use daily::handle_daily_command;
pub use list_cloud::handle_list_cloud_command;
pub use restore::handle_restore_command;
pub use status::handle_status_command;
