//! Output formatting utilities
//!
//! Progress indicators and status glyphs shared by the CLI commands.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Output shaping derived from the global CLI flags
#[derive(Debug, Clone, Copy)]
pub struct OutputMode {
    /// Suppress everything except errors
    pub quiet: bool,

    /// Print machine-readable JSON instead of human output
    pub json: bool,
}

impl OutputMode {
    /// True when human-readable progress output is wanted
    pub fn human(&self) -> bool {
        !self.quiet && !self.json
    }
}

/// Create a spinner with a message
pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.blue} {msg}")
            .expect("Invalid spinner template"),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Status message symbols
pub mod status {
    /// Success symbol
    pub const SUCCESS: &str = "✓";
    /// Error symbol
    pub const ERROR: &str = "✗";
    /// Warning symbol
    pub const WARNING: &str = "⚠";
    /// Info symbol
    pub const INFO: &str = "ℹ";
}
