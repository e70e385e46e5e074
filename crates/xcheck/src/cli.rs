//! CLI definitions and argument types.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use xcheck::ReportFormat;

/// Exit code for success (sessions match).
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for a divergence or length mismatch.
pub const EXIT_DIVERGED: i32 = 1;
/// Exit code for unreadable or malformed input.
pub const EXIT_INPUT_ERROR: i32 = 2;

#[derive(Parser)]
#[command(name = "xcheck")]
#[command(about = "Cross-check oracle - compares recorded executions event by event")]
#[command(version)]
pub struct Cli {
    /// Show metrics summary after execution
    #[arg(long, global = true)]
    pub metrics: bool,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output (only show warnings and errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compare two sessions and report the first divergence
    Compare {
        /// Reference session (session file or fakechecks log)
        #[arg(value_name = "EXPECTED")]
        expected: PathBuf,

        /// Session under test
        #[arg(value_name = "ACTUAL")]
        actual: PathBuf,

        /// Matched events to show before the divergence
        #[arg(long, default_value = "8")]
        context: usize,

        /// Site map file for readable names
        #[arg(long, value_name = "FILE")]
        sites: Option<PathBuf>,

        /// Report format
        #[arg(long, value_enum, default_value = "text")]
        format: FormatArg,
    },
    /// Print the events of a session
    Dump {
        /// Session file or fakechecks log
        #[arg(value_name = "SESSION")]
        session: PathBuf,

        /// Print at most N events
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Site map file for readable names
        #[arg(long, value_name = "FILE")]
        sites: Option<PathBuf>,
    },
    /// Convert a fakechecks log or session file to a session file
    Convert {
        /// Input file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output session file
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// zstd-compress the record stream
        #[arg(long)]
        compress: bool,
    },
    /// Compare same-named sessions of two directories in parallel
    Batch {
        /// Directory of reference sessions
        #[arg(value_name = "EXPECTED_DIR")]
        expected_dir: PathBuf,

        /// Directory of sessions under test
        #[arg(value_name = "ACTUAL_DIR")]
        actual_dir: PathBuf,

        /// Number of parallel jobs (0 = auto)
        #[arg(short = 'j', long, default_value = "0")]
        jobs: usize,

        /// Matched events to keep before each divergence
        #[arg(long, default_value = "8")]
        context: usize,
    },
}

/// Report format argument.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FormatArg {
    /// Plain text
    Text,
    /// Markdown with a table of events
    Markdown,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Markdown => Self::Markdown,
        }
    }
}
