//! Terminal output formatting and utilities.
//!
//! Results go to stdout; status messages, warnings and progress go to
//! stderr so results can be piped.

pub mod colors;
pub mod errors;
pub mod progress;

/// Output handler for consistent terminal formatting
pub struct OutputHandler {
    colors: colors::ColorSupport,
    quiet: bool,
}

impl OutputHandler {
    pub fn new() -> Self {
        Self {
            colors: colors::ColorSupport::detect(),
            quiet: false,
        }
    }

    /// Handler that prints results but no status messages
    pub fn quiet() -> Self {
        Self {
            colors: colors::ColorSupport::disabled(),
            quiet: true,
        }
    }

    pub fn colors(&self) -> &colors::ColorSupport {
        &self.colors
    }

    /// Print a result line on stdout
    pub fn result(&self, message: &str) {
        println!("{}", message);
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if !self.quiet {
            eprintln!("{}", self.colors.dim(message));
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if !self.quiet {
            eprintln!("{} {}", self.colors.green("✓"), message);
        }
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", self.colors.yellow("⚠"), message);
    }

    /// A progress bar, drawn only when status output is on
    pub fn progress(&self) -> progress::ProgressBar {
        progress::ProgressBar::new(!self.quiet)
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}
