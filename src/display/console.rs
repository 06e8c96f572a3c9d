//! Colored stage lines and the export spinner

use std::io::{self, IsTerminal};
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::backup::export::ExportProgress;
use crate::backup::{PipelineObserver, RestoreObserver, RestoreState, Stage};
use crate::error::VaultError;

use super::format::{format_rate, format_size};

/// `  ok  Export     4.2 GB`
pub fn success_line(label: &str, detail: &str) -> String {
    format!("  {}  {:<14}{}", "ok".green().bold(), label, detail)
}

/// `  !!  Retention  could not delete ...`
pub fn warning_line(label: &str, detail: &str) -> String {
    format!("  {}  {:<14}{}", "!!".yellow().bold(), label, detail)
}

/// `  xx  Upload     UploadFailed: ...`
pub fn failure_line(label: &str, error: &VaultError) -> String {
    format!(
        "  {}  {:<14}{}: {}",
        "xx".red().bold(),
        label,
        error.kind().red(),
        error
    )
}

/// Prints pipeline and restore events to the terminal
///
/// The spinner is only drawn when stderr is a terminal.
pub struct ConsoleReporter {
    spinner: Option<ProgressBar>,
    interactive: bool,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self {
            spinner: None,
            interactive: io::stderr().is_terminal(),
        }
    }

    fn start_spinner(&mut self, message: String) {
        if !self.interactive {
            return;
        }
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("  {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(120));
        bar.set_message(message);
        self.spinner = Some(bar);
    }

    fn clear_spinner(&mut self) {
        if let Some(bar) = self.spinner.take() {
            bar.finish_and_clear();
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineObserver for ConsoleReporter {
    fn stage_started(&mut self, stage: Stage) {
        self.start_spinner(format!("{}...", stage));
    }

    fn export_progress(&mut self, progress: &ExportProgress) {
        if let Some(bar) = &self.spinner {
            bar.set_message(format!(
                "Export  {} written, {}",
                format_size(progress.bytes_written),
                format_rate(progress.throughput())
            ));
        }
    }

    fn stage_finished(&mut self, stage: Stage, detail: &str) {
        self.clear_spinner();
        let label = stage.to_string();
        if stage == Stage::Retention && detail.ends_with("(with warnings)") {
            println!("{}", warning_line(&label, detail));
        } else {
            println!("{}", success_line(&label, detail));
        }
    }

    fn stage_failed(&mut self, stage: Stage, error: &VaultError) {
        self.clear_spinner();
        eprintln!("{}", failure_line(&stage.to_string(), error));
    }
}

impl RestoreObserver for ConsoleReporter {
    fn state_changed(&mut self, state: RestoreState, detail: &str) {
        self.clear_spinner();
        if state == RestoreState::Complete {
            println!("{}", success_line(&state.to_string(), detail));
        } else {
            self.start_spinner(format!("{} {}", state, detail));
            if !self.interactive {
                println!("  ..  {:<14}{}", state.to_string(), detail);
            }
        }
    }

    fn failed(&mut self, state: RestoreState, error: &VaultError) {
        self.clear_spinner();
        eprintln!("{}", failure_line(&state.to_string(), error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_carry_label_and_detail() {
        colored::control::set_override(false);

        assert_eq!(success_line("Export", "4.0 GB"), "  ok  Export        4.0 GB");
        let line = failure_line("Upload", &VaultError::UploadFailed("timeout".into()));
        assert!(line.contains("UploadFailed"));
        assert!(line.contains("timeout"));
        assert!(warning_line("Retention", "cloud sweep failed").starts_with("  !!"));
    }
}
