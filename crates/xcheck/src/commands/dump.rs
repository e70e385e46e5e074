//! Dump command.

use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::{error, info};

use super::{load_input, load_sites};
use crate::cli::{EXIT_INPUT_ERROR, EXIT_SUCCESS};

/// Handle the `dump` command.
pub fn cmd_dump(session: &Path, limit: Option<usize>, sites: Option<&Path>) -> i32 {
    let sites = match load_sites(sites) {
        Ok(sites) => sites,
        Err(code) => return code,
    };
    let events = match load_input(session) {
        Ok(events) => events,
        Err(code) => return code,
    };
    info!(path = %session.display(), events = events.len(), "dumping");

    let mut out = BufWriter::new(io::stdout().lock());
    let shown = limit.unwrap_or(usize::MAX);
    let result = events.iter().take(shown).try_for_each(|e| {
        writeln!(
            out,
            "{:>8}  {:<9} {:<24} {:#018x}",
            e.sequence,
            e.kind.name(),
            sites.label(e.site_id),
            e.payload_hash
        )
    });
    if let Err(err) = result.and_then(|()| out.flush()) {
        // A closed pipe (e.g. `| head`) is not an input error.
        if err.kind() != io::ErrorKind::BrokenPipe {
            error!(error = %err, "failed to write events");
            return EXIT_INPUT_ERROR;
        }
    }
    EXIT_SUCCESS
}
