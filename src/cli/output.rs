//! Terminal output and progress display.

use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};

/// Progress bar resolution; session progress is a fraction of this.
pub const PROGRESS_SCALE: u64 = 100;

/// Status message prefixes
pub mod status {
    pub const SUCCESS: &str = "✓";
    pub const ERROR: &str = "✗";
    pub const WARNING: &str = "⚠";
    pub const INFO: &str = "ℹ";
}

/// Writes user-facing messages honouring verbose and quiet modes.
///
/// Quiet mode is used for `--json`, where stdout must only carry the result.
#[derive(Debug, Clone)]
pub struct OutputManager {
    verbose: bool,
    quiet: bool,
}

impl OutputManager {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose && !self.quiet
    }

    /// Plain line on stdout, even in quiet mode.
    pub fn println(&self, message: &str) -> io::Result<()> {
        writeln!(io::stdout().lock(), "{}", message)
    }

    pub fn verbose(&self, message: &str) -> io::Result<()> {
        if !self.is_verbose() {
            return Ok(());
        }
        writeln!(io::stdout().lock(), "  {}", message)
    }

    pub fn info(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln!(io::stdout().lock(), "{} {}", status::INFO, message)
    }

    pub fn success(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln!(io::stdout().lock(), "{} {}", status::SUCCESS, message)
    }

    /// Warnings go to stderr and are never silenced.
    pub fn warn(&self, message: &str) -> io::Result<()> {
        writeln!(io::stderr().lock(), "{} {}", status::WARNING, message)
    }

    pub fn error(&self, message: &str) -> io::Result<()> {
        writeln!(io::stderr().lock(), "{} {}", status::ERROR, message)
    }

    pub fn section(&self, title: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let mut out = io::stdout().lock();
        writeln!(out)?;
        writeln!(out, "{}", title)?;
        writeln!(out, "{}", "─".repeat(title.chars().count()))
    }

    pub fn indent(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln!(io::stdout().lock(), "    {}", message)
    }

    /// Progress bar for a build, hidden in quiet mode.
    pub fn build_bar(&self) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(PROGRESS_SCALE);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
        {
            pb.set_style(style.progress_chars("█▓▒░"));
        }
        pb.enable_steady_tick(std::time::Duration::from_millis(120));
        pb
    }
}

/// Progress fraction to bar position.
pub fn bar_position(progress: f64) -> u64 {
    (progress.clamp(0.0, 1.0) * PROGRESS_SCALE as f64).round() as u64
}
