//! Terminal color support detection and formatting.
//!
//! Colors are on when both output streams are terminals, unless `NO_COLOR`
//! is set. `CLICOLOR_FORCE` turns them on regardless.

use std::env;
use std::io::{self, IsTerminal};

/// Color support detection and formatting
#[derive(Debug, Clone, Copy)]
pub struct ColorSupport {
    enabled: bool,
}

impl ColorSupport {
    /// Detect color support automatically
    pub fn detect() -> Self {
        Self {
            enabled: Self::should_use_colors(),
        }
    }

    /// Force disable colors
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    fn should_use_colors() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var_os("CLICOLOR_FORCE").is_some_and(|value| value != "0") {
            return true;
        }

        io::stderr().is_terminal() && io::stdout().is_terminal()
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }

    pub fn green(&self, text: &str) -> String {
        self.paint("32", text)
    }

    pub fn yellow(&self, text: &str) -> String {
        self.paint("33", text)
    }

    pub fn red(&self, text: &str) -> String {
        self.paint("31", text)
    }

    pub fn cyan(&self, text: &str) -> String {
        self.paint("36", text)
    }

    pub fn bold(&self, text: &str) -> String {
        self.paint("1", text)
    }

    /// Format text as dim/gray
    pub fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_is_plain() {
        let colors = ColorSupport::disabled();
        assert_eq!(colors.red("error"), "error");
        assert_eq!(colors.bold("foo"), "foo");
    }

    #[test]
    fn test_enabled_wraps_escape_codes() {
        let colors = ColorSupport { enabled: true };
        assert_eq!(colors.green("ok"), "\x1b[32mok\x1b[0m");
        assert_eq!(colors.dim("x"), "\x1b[2mx\x1b[0m");
    }
}
