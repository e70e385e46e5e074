//! Terminal UI utilities: a batch progress bar and styled status lines.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar for determinate progress.
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    /// Create a progress bar. Hidden when `hidden` is set (`--silent`).
    pub fn new(total: u64, message: &str, hidden: bool) -> Self {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(total)
        };
        if let Ok(progress_style) =
            ProgressStyle::default_bar().template("{msg} [{bar:30.cyan/dim}] {pos}/{len}")
        {
            bar.set_style(progress_style.progress_chars("━╸━"));
        }
        bar.set_message(message.to_string());
        Self { bar }
    }

    pub fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    /// Print a line above the bar without tearing it.
    pub fn println(&self, message: &str) {
        self.bar.println(message);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

// ============================================================================
// Styled output helpers
// ============================================================================

/// Print a success message to stderr.
pub fn success(message: &str) {
    eprintln!("{} {}", style("✓").green().bold(), message);
}

/// Print an error message to stderr.
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Print a warning message to stderr.
pub fn warning(message: &str) {
    eprintln!("{} {}", style("!").yellow().bold(), message);
}

/// Line for one batch pair: check mark or cross plus name and detail.
pub fn status_line(ok: bool, name: &str, detail: &str) -> String {
    let mark = if ok {
        style("✓").green().bold()
    } else {
        style("✗").red().bold()
    };
    format!("{mark} {name} {}", style(detail).dim())
}

/// Print a path output (like "-> /path/to/file").
pub fn path_output(path: &std::path::Path) {
    eprintln!("  {} {}", style("→").dim(), style(path.display()).dim());
}
