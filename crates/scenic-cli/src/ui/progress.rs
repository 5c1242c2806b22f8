//! Progress indicators for long-running CLI operations.
//!
//! Wraps `indicatif` spinners and bars. Progress is disabled when stdout is
//! not a TTY, when `--quiet` is set, and always under `--json`.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use super::color::ColorMode;

/// Progress feedback mode based on output context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    /// Interactive TTY: show animated spinners and progress bars
    Interactive,
    /// Non-TTY or quiet: suppress progress, show only final results
    Quiet,
    /// Machine-readable: no progress at all (for --json)
    Silent,
}

impl ProgressMode {
    /// Detect the appropriate mode from environment and flags.
    pub fn detect(quiet: bool, json: bool, color_mode: ColorMode) -> Self {
        if json {
            Self::Silent
        } else if quiet || !atty::is(atty::Stream::Stdout) {
            Self::Quiet
        } else if color_mode.is_enabled() || atty::is(atty::Stream::Stdout) {
            Self::Interactive
        } else {
            Self::Quiet
        }
    }

    /// Check if progress should be shown.
    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Interactive)
    }
}

/// Spinner tick characters (Braille-based).
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Progress bar characters.
const BAR_CHARS: &str = "█░";

/// A progress indicator that wraps indicatif.
///
/// Supports both spinner (indeterminate) and bar (determinate) modes.
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    /// Create a spinner for indeterminate operations.
    pub fn spinner(message: &str, mode: ProgressMode) -> Self {
        let bar = if mode.is_interactive() {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .tick_chars(SPINNER_CHARS)
                    .template("{spinner:.cyan} {msg} ({elapsed})")
                    .expect("valid template"),
            );
            pb.set_message(message.to_string());
            pb.enable_steady_tick(Duration::from_millis(80));
            pb
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }

    /// Create a determinate bar with a known total.
    pub fn bar(total: u64, message: &str, mode: ProgressMode) -> Self {
        let bar = if mode.is_interactive() {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{msg} [{bar:30.cyan}] {pos}/{len} ({elapsed})")
                    .expect("valid template")
                    .progress_chars(BAR_CHARS),
            );
            pb.set_message(message.to_string());
            pb
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }

    /// Update the position of a determinate bar.
    pub fn set_position(&self, position: u64) {
        self.bar.set_position(position);
    }

    /// Replace the displayed message.
    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Finish and clear the indicator.
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_under_json() {
        assert_eq!(
            ProgressMode::detect(false, true, ColorMode::Always),
            ProgressMode::Silent
        );
    }

    #[test]
    fn test_quiet_flag_wins() {
        assert_eq!(
            ProgressMode::detect(true, false, ColorMode::Always),
            ProgressMode::Quiet
        );
    }

    #[test]
    fn test_hidden_progress_is_inert() {
        let progress = Progress::bar(10, "working", ProgressMode::Quiet);
        progress.set_position(5);
        progress.finish_and_clear();
    }
}
