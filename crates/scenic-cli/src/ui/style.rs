//! Message styling for CLI output.
//!
//! Provides consistent prefixes, colors, and formatting for all CLI messages.
//!
//! ## Message Types
//!
//! | Prefix | Meaning | Color |
//! |--------|---------|-------|
//! | `[ok]` | Success | Green |
//! | `[err]` | Error | Red |
//! | `[warn]` | Warning | Yellow |
//! | `[info]` | Information | Blue |
//! | `[hint]` | Suggestion | Cyan |

use owo_colors::OwoColorize;

use super::color::ColorMode;

/// Message severity/type for CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Success - operation completed successfully
    Ok,
    /// Error - operation failed, cannot continue
    Err,
    /// Warning - operation succeeded with caveats
    Warn,
    /// Information - neutral status or progress update
    Info,
    /// Hint - actionable next step or tip
    Hint,
}

impl MessageType {
    /// Returns the prefix text for this message type.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Ok => "[ok]",
            Self::Err => "[err]",
            Self::Warn => "[warn]",
            Self::Info => "[info]",
            Self::Hint => "[hint]",
        }
    }
}

/// Main styling interface for CLI output.
#[derive(Debug, Clone)]
pub struct Style {
    color_mode: ColorMode,
}

impl Default for Style {
    fn default() -> Self {
        Self::new(ColorMode::Auto)
    }
}

impl Style {
    /// Create a Style instance with an explicit color mode.
    pub fn new(color_mode: ColorMode) -> Self {
        Self { color_mode }
    }

    /// Check if colors are enabled.
    pub fn colors_enabled(&self) -> bool {
        self.color_mode.is_enabled()
    }

    /// Get the current color mode.
    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    /// Format a simple message with a type prefix.
    pub fn message(&self, msg_type: MessageType, text: &str) -> String {
        let prefix = msg_type.prefix();
        if self.colors_enabled() {
            let colored_prefix = match msg_type {
                MessageType::Ok => prefix.green().to_string(),
                MessageType::Err => prefix.red().to_string(),
                MessageType::Warn => prefix.yellow().to_string(),
                MessageType::Info => prefix.blue().to_string(),
                MessageType::Hint => prefix.cyan().to_string(),
            };
            format!("{colored_prefix} {text}")
        } else {
            format!("{prefix} {text}")
        }
    }

    /// Format an indented detail line under a message (`  Label: text`).
    pub fn message_detail(&self, label: &str, text: &str) -> String {
        if self.colors_enabled() {
            format!("  {}: {text}", label.dimmed())
        } else {
            format!("  {label}: {text}")
        }
    }

    /// Format an error with optional detail and remediation hint.
    pub fn error_with_context(
        &self,
        message: &str,
        detail: Option<&str>,
        hint: Option<&str>,
    ) -> String {
        let mut out = self.message(MessageType::Err, message);
        if let Some(detail) = detail {
            out.push('\n');
            out.push_str(&self.message_detail("Cause", detail));
        }
        if let Some(hint) = hint {
            out.push('\n');
            out.push_str(&self.message(MessageType::Hint, hint));
        }
        out
    }

    /// Emphasize a path or identifier inline.
    pub fn emphasize(&self, text: &str) -> String {
        if self.colors_enabled() {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_message() {
        let style = Style::new(ColorMode::Never);
        assert_eq!(style.message(MessageType::Ok, "Done"), "[ok] Done");
        assert_eq!(style.message(MessageType::Err, "Nope"), "[err] Nope");
    }

    #[test]
    fn test_message_detail() {
        let style = Style::new(ColorMode::Never);
        assert_eq!(style.message_detail("Items", "42"), "  Items: 42");
    }

    #[test]
    fn test_error_with_context() {
        let style = Style::new(ColorMode::Never);
        let out = style.error_with_context("Failed", Some("cause"), Some("try again"));
        assert_eq!(out, "[err] Failed\n  Cause: cause\n[hint] try again");
    }

    #[test]
    fn test_colored_message_contains_text() {
        let style = Style::new(ColorMode::Always);
        let out = style.message(MessageType::Ok, "Done");
        assert!(out.contains("Done"));
        assert!(out.contains("[ok]"));
    }
}
