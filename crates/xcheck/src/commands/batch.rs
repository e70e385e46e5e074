//! Batch command.

use std::path::Path;

use tracing::{error, info};
use xcheck::CompareConfig;
use xcheck::batch::{BatchOutcome, pair_sessions, run_batch};

use crate::cli::{EXIT_DIVERGED, EXIT_INPUT_ERROR, EXIT_SUCCESS};
use crate::terminal::{self, Progress};

fn describe(outcome: &BatchOutcome) -> String {
    match &outcome.result {
        Ok(verdict) => verdict.report().map_or_else(
            || "match".to_string(),
            |r| format!("{} at sequence {} ({})", verdict.label(), r.first_mismatched_sequence, r.kind),
        ),
        Err(err) => err.to_string(),
    }
}

/// Handle the `batch` command.
pub fn cmd_batch(
    expected_dir: &Path,
    actual_dir: &Path,
    jobs: usize,
    context: usize,
    silent: bool,
) -> i32 {
    let pairs = match pair_sessions(expected_dir, actual_dir) {
        Ok(pairs) => pairs,
        Err(err) => {
            error!(error = %err, "failed to list session directories");
            terminal::error(&err.to_string());
            return EXIT_INPUT_ERROR;
        }
    };
    info!(pairs = pairs.len(), jobs, "batch comparison");

    let progress = Progress::new(pairs.len() as u64, "comparing", silent);
    let config = CompareConfig::default().with_context(context);
    let outcomes = run_batch(&pairs, &config, jobs, |outcome| {
        if !outcome.is_match() {
            progress.println(&terminal::status_line(false, &outcome.name, &describe(outcome)));
        }
        progress.inc(1);
    });
    progress.finish();

    let outcomes = match outcomes {
        Ok(outcomes) => outcomes,
        Err(err) => {
            error!(error = %err, "batch failed");
            return EXIT_INPUT_ERROR;
        }
    };

    let failed = outcomes.iter().filter(|o| !o.is_match()).count();
    if failed == 0 {
        terminal::success(&format!("{} pairs match", outcomes.len()));
        EXIT_SUCCESS
    } else {
        terminal::warning(&format!("{failed} of {} pairs differ", outcomes.len()));
        EXIT_DIVERGED
    }
}
