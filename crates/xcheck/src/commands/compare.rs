//! Compare command.

use std::path::Path;
use std::time::Instant;

use tracing::info;
use xcheck::metrics::record_comparison;
use xcheck::report::{ReportFormat, render};
use xcheck::{CompareConfig, compare};

use super::{load_input, load_sites};
use crate::cli::{EXIT_DIVERGED, EXIT_SUCCESS};

/// Handle the `compare` command.
pub fn cmd_compare(
    expected: &Path,
    actual: &Path,
    context: usize,
    sites: Option<&Path>,
    format: ReportFormat,
) -> i32 {
    let sites = match load_sites(sites) {
        Ok(sites) => sites,
        Err(code) => return code,
    };
    let (expected_session, actual_session) = match (load_input(expected), load_input(actual)) {
        (Ok(e), Ok(a)) => (e, a),
        (Err(code), _) | (_, Err(code)) => return code,
    };
    info!(
        expected = %expected.display(),
        actual = %actual.display(),
        expected_events = expected_session.len(),
        actual_events = actual_session.len(),
        "comparing"
    );

    let start = Instant::now();
    let config = CompareConfig::default().with_context(context);
    let verdict = compare(&expected_session, &actual_session, &config);
    record_comparison(&verdict, expected_session.len(), start.elapsed().as_secs_f64());

    print!("{}", render(&verdict, expected_session.len(), &sites, format));

    if verdict.is_match() {
        info!(events = expected_session.len(), "sessions match");
        EXIT_SUCCESS
    } else {
        info!(verdict = verdict.label(), "sessions differ");
        EXIT_DIVERGED
    }
}
