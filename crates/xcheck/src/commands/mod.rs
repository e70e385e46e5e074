//! Command implementations.
//!
//! Each submodule handles one CLI command and returns the process exit code.

mod batch;
mod compare;
mod convert;
mod dump;

use std::path::Path;

use tracing::error;
use xcheck::SiteMap;

use crate::cli::{Cli, Commands, EXIT_INPUT_ERROR};
use crate::terminal;

/// Dispatch CLI command to the appropriate handler.
pub fn run_command(cli: &Cli) -> i32 {
    match &cli.command {
        Commands::Compare {
            expected,
            actual,
            context,
            sites,
            format,
        } => compare::cmd_compare(expected, actual, *context, sites.as_deref(), (*format).into()),
        Commands::Dump {
            session,
            limit,
            sites,
        } => dump::cmd_dump(session, *limit, sites.as_deref()),
        Commands::Convert {
            input,
            output,
            compress,
        } => convert::cmd_convert(input, output, *compress),
        Commands::Batch {
            expected_dir,
            actual_dir,
            jobs,
            context,
        } => batch::cmd_batch(expected_dir, actual_dir, *jobs, *context, cli.silent),
    }
}

/// Load the optional site map, reporting failures as input errors.
fn load_sites(path: Option<&Path>) -> Result<SiteMap, i32> {
    let Some(path) = path else {
        return Ok(SiteMap::new());
    };
    SiteMap::load(path).map_err(|err| {
        error!(path = %path.display(), error = %err, "failed to load site map");
        terminal::error(&format!("site map {}: {err}", path.display()));
        EXIT_INPUT_ERROR
    })
}

/// Load a session or fakechecks log, reporting failures as input errors.
fn load_input(path: &Path) -> Result<xcheck_runtime::Session, i32> {
    xcheck::load_any(path).map_err(|err| {
        error!(path = %path.display(), error = %err, "failed to load session");
        terminal::error(&format!("{}: {err}", path.display()));
        EXIT_INPUT_ERROR
    })
}
