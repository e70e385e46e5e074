//! Parallel comparison of many session pairs.
//!
//! Files are paired by name across an expected and an actual directory.
//! Each pair is compared single-threaded; pairs run in parallel on a rayon
//! pool.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::metrics::record_comparison;
use crate::oracle::{CompareConfig, Verdict, compare};
use crate::textlog::load_any;
use crate::{Error, Result};

/// One expected/actual pair, either side possibly missing.
#[derive(Debug, Clone)]
pub struct SessionPair {
    pub name: String,
    pub expected: Option<PathBuf>,
    pub actual: Option<PathBuf>,
}

/// Result of comparing one pair.
#[derive(Debug)]
pub struct BatchOutcome {
    pub name: String,
    pub result: Result<Verdict>,
}

impl BatchOutcome {
    #[must_use]
    pub fn is_match(&self) -> bool {
        matches!(self.result, Ok(Verdict::Match))
    }
}

fn file_names(dir: &Path) -> Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.insert(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

/// Pair same-named files of two directories, sorted by name.
///
/// # Errors
///
/// Returns an error if either directory cannot be listed.
pub fn pair_sessions(expected_dir: &Path, actual_dir: &Path) -> Result<Vec<SessionPair>> {
    let expected = file_names(expected_dir)?;
    let actual = file_names(actual_dir)?;
    Ok(expected
        .union(&actual)
        .map(|name| SessionPair {
            name: name.clone(),
            expected: expected.contains(name).then(|| expected_dir.join(name)),
            actual: actual.contains(name).then(|| actual_dir.join(name)),
        })
        .collect())
}

/// Compare one pair.
///
/// # Errors
///
/// Returns [`Error::MissingPair`] if one side is absent, or a load error.
pub fn compare_pair(pair: &SessionPair, config: &CompareConfig) -> Result<Verdict> {
    let (expected, actual) = match (&pair.expected, &pair.actual) {
        (Some(e), Some(a)) => (e, a),
        (Some(only), None) | (None, Some(only)) => return Err(Error::MissingPair(only.clone())),
        (None, None) => return Err(Error::MissingPair(PathBuf::from(&pair.name))),
    };
    let start = Instant::now();
    let expected = load_any(expected)?;
    let actual = load_any(actual)?;
    let verdict = compare(&expected, &actual, config);
    record_comparison(&verdict, expected.len(), start.elapsed().as_secs_f64());
    debug!(name = %pair.name, verdict = verdict.label(), "pair compared");
    Ok(verdict)
}

/// Compare all pairs on `jobs` threads (0 = one per CPU).
///
/// `on_done` is called from worker threads after each pair.
///
/// # Errors
///
/// Returns an error only if the thread pool cannot be built; per-pair
/// failures are reported in the outcomes.
pub fn run_batch(
    pairs: &[SessionPair],
    config: &CompareConfig,
    jobs: usize,
    on_done: impl Fn(&BatchOutcome) + Sync,
) -> Result<Vec<BatchOutcome>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| Error::Io(std::io::Error::other(e)))?;

    let outcomes = pool.install(|| {
        pairs
            .par_iter()
            .map(|pair| {
                let outcome = BatchOutcome {
                    name: pair.name.clone(),
                    result: compare_pair(pair, config),
                };
                if let Err(err) = &outcome.result {
                    warn!(name = %pair.name, error = %err, "pair failed");
                }
                on_done(&outcome);
                outcome
            })
            .collect()
    });
    Ok(outcomes)
}
