//! Styled terminal output for batchcryptor.
//!
//! Status lines go to stdout, errors to stderr. Quiet mode suppresses
//! everything but errors.

use console::style;

use crate::parallel::BatchSummary;

/// Output handler for consistent CLI formatting
pub struct Output {
    verbose: bool,
    quiet: bool,
}

impl Output {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("✔").green(), message);
        }
    }

    /// Errors are always shown, even in quiet mode
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✖").red(), message);
    }

    pub fn warning(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("⚠").yellow(), message);
        }
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("ℹ").blue(), message);
        }
    }

    /// Only printed in verbose mode
    pub fn verbose(&self, message: &str) {
        if self.verbose && !self.quiet {
            println!("{} {}", style("ℹ").dim(), style(message).dim());
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn table_row(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {:<12} {}", style(key).dim(), value);
        }
    }

    /// End-of-batch counts.
    pub fn summary(&self, summary: &BatchSummary) {
        if self.quiet {
            return;
        }
        println!("\n{}", style("Summary").bold().underlined());
        self.table_row("total", &summary.total.to_string());
        self.table_row("processed", &style(summary.processed).green().to_string());
        self.table_row("skipped", &style(summary.skipped).dim().to_string());
        let failed = if summary.failed > 0 {
            style(summary.failed).red().bold().to_string()
        } else {
            summary.failed.to_string()
        };
        self.table_row("failed", &failed);
    }
}
