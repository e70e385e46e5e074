//! Metrics collection and reporting using metrics-rs.
//!
//! The runtime records ledger counters; the oracle records comparison
//! outcomes. With `--metrics` the CLI installs [`CliRecorder`] and prints a
//! summary on exit.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::{
    Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit, counter,
    describe_counter, describe_histogram, histogram,
};
use parking_lot::RwLock;

use crate::oracle::Verdict;

// ============================================================================
// Metric descriptions
// ============================================================================

/// Register metric descriptions. Call once at startup.
pub fn init() {
    describe_counter!(
        "xcheck_events_recorded_total",
        Unit::Count,
        "Events recorded into finished sessions"
    );
    describe_counter!(
        "xcheck_protocol_violations_total",
        Unit::Count,
        "Records or ends issued after a session ended"
    );
    describe_counter!(
        "xcheck_comparisons_total",
        Unit::Count,
        "Session comparisons by verdict"
    );
    describe_counter!(
        "xcheck_events_compared_total",
        Unit::Count,
        "Expected events walked by the oracle, by verdict"
    );
    describe_histogram!(
        "xcheck_compare_duration_seconds",
        Unit::Seconds,
        "Wall-clock time per comparison"
    );
}

// ============================================================================
// Metric recording functions
// ============================================================================

/// Verdict labels in summary order.
const VERDICT_LABELS: [&str; 3] = ["match", "diverged", "length_mismatch"];

/// Record the outcome of one comparison.
pub fn record_comparison(verdict: &Verdict, events: usize, secs: f64) {
    let labels = [("verdict", verdict.label())];
    counter!("xcheck_comparisons_total", &labels).increment(1);
    counter!("xcheck_events_compared_total", &labels).increment(events as u64);
    histogram!("xcheck_compare_duration_seconds").record(secs);
}

// ============================================================================
// CLI Recorder for terminal output
// ============================================================================

#[derive(Default)]
struct CounterStorage {
    values: RwLock<HashMap<String, u64>>,
}

#[derive(Default)]
struct HistogramStorage {
    values: RwLock<HashMap<String, Vec<f64>>>,
}

struct CliCounter {
    key: String,
    storage: Arc<CounterStorage>,
}

impl metrics::CounterFn for CliCounter {
    fn increment(&self, value: u64) {
        let mut values = self.storage.values.write();
        *values.entry(self.key.clone()).or_insert(0) += value;
    }

    fn absolute(&self, value: u64) {
        self.storage.values.write().insert(self.key.clone(), value);
    }
}

struct CliHistogram {
    key: String,
    storage: Arc<HistogramStorage>,
}

impl metrics::HistogramFn for CliHistogram {
    fn record(&self, value: f64) {
        let mut values = self.storage.values.write();
        values.entry(self.key.clone()).or_default().push(value);
    }
}

/// Recorder that keeps counters and histograms in memory for a terminal
/// summary. Gauges are not collected.
#[derive(Default)]
pub struct CliRecorder {
    counters: Arc<CounterStorage>,
    histograms: Arc<HistogramStorage>,
}

impl CliRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install as the global recorder. `None` if one is already installed.
    #[must_use]
    pub fn install(self) -> Option<CliRecorderHandle> {
        let handle = self.handle();
        metrics::set_global_recorder(self).ok()?;
        Some(handle)
    }

    /// Handle onto this recorder's storage.
    #[must_use]
    pub fn handle(&self) -> CliRecorderHandle {
        CliRecorderHandle {
            counters: Arc::clone(&self.counters),
            histograms: Arc::clone(&self.histograms),
        }
    }
}

fn key_to_string(key: &Key) -> String {
    let name = key.name();
    let labels = key.labels();
    if labels.len() == 0 {
        name.to_string()
    } else {
        let label_str: Vec<String> = labels
            .map(|l| format!("{}={}", l.key(), l.value()))
            .collect();
        format!("{}{{{}}}", name, label_str.join(","))
    }
}

impl Recorder for CliRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(Arc::new(CliCounter {
            key: key_to_string(key),
            storage: Arc::clone(&self.counters),
        }))
    }

    fn register_gauge(&self, _key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(Arc::new(CliHistogram {
            key: key_to_string(key),
            storage: Arc::clone(&self.histograms),
        }))
    }
}

/// Read access to metrics collected by a [`CliRecorder`].
pub struct CliRecorderHandle {
    counters: Arc<CounterStorage>,
    histograms: Arc<HistogramStorage>,
}

impl CliRecorderHandle {
    #[must_use]
    pub fn get_counter(&self, key: &str) -> Option<u64> {
        self.counters.values.read().get(key).copied()
    }

    #[must_use]
    pub fn get_histogram(&self, key: &str) -> Option<Vec<f64>> {
        self.histograms.values.read().get(key).cloned()
    }

    /// Render comparison and ledger metrics as markdown-ish text.
    #[must_use]
    pub fn summary(&self) -> String {
        let counters = self.counters.values.read();
        let histograms = self.histograms.values.read();

        if counters.is_empty() && histograms.is_empty() {
            return "No metrics collected.\n".to_string();
        }
        let counter = |key: &str| counters.get(key).copied().unwrap_or(0);

        let mut out = String::from("\n## Metrics Summary\n\n");

        let compared: Vec<_> = VERDICT_LABELS
            .iter()
            .map(|label| {
                let sessions = counter(&format!("xcheck_comparisons_total{{verdict={label}}}"));
                let events = counter(&format!("xcheck_events_compared_total{{verdict={label}}}"));
                (label, sessions, events)
            })
            .filter(|(_, sessions, _)| *sessions > 0)
            .collect();
        if !compared.is_empty() {
            out.push_str("### Comparisons\n");
            for (label, sessions, events) in compared {
                out.push_str(&format!("  {label}: {sessions} ({events} events)\n"));
            }
            if let Some((count, min, max, avg)) = histograms
                .get("xcheck_compare_duration_seconds")
                .map(Vec::as_slice)
                .and_then(stats)
            {
                out.push_str(&format!(
                    "  time: count={count}, min={min:.6}s, max={max:.6}s, avg={avg:.6}s\n"
                ));
            }
            out.push('\n');
        }

        let recorded = counter("xcheck_events_recorded_total");
        let violations = counter("xcheck_protocol_violations_total");
        if recorded > 0 || violations > 0 {
            out.push_str("### Runtime\n");
            out.push_str(&format!("  events recorded: {recorded}\n"));
            out.push_str(&format!("  protocol violations: {violations}\n"));
            out.push('\n');
        }
        out
    }

    pub fn print_summary(&self) {
        print!("{}", self.summary());
    }
}

/// Count, min, max and mean of a non-empty sample.
fn stats(values: &[f64]) -> Option<(usize, f64, f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    Some((values.len(), min, max, avg))
}

#[cfg(test)]
mod tests {
    use metrics::{Label, gauge, with_local_recorder};
    use xcheck_runtime::{EventKind, Session, SiteId};

    use super::*;
    use crate::oracle::{CompareConfig, compare};

    #[test]
    fn test_key_to_string() {
        let key = Key::from_name("test_metric");
        assert_eq!(key_to_string(&key), "test_metric");

        let key = Key::from_parts("test_metric", vec![Label::new("verdict", "match")]);
        assert_eq!(key_to_string(&key), "test_metric{verdict=match}");
    }

    #[test]
    fn test_verdict_labels_cover_every_verdict() {
        let site = SiteId::from_raw(1);
        let a = Session::from_checks([(site, EventKind::Entry, 1), (site, EventKind::Exit, 2)]);
        let b = Session::from_checks([(site, EventKind::Entry, 1), (site, EventKind::Exit, 3)]);
        let short = Session::from_checks([(site, EventKind::Entry, 1)]);
        let config = CompareConfig::default();
        for actual in [&a, &b, &short] {
            let label = compare(&a, actual, &config).label();
            assert!(VERDICT_LABELS.contains(&label));
        }
    }

    #[test]
    fn test_record_comparison_counts_by_verdict() {
        let recorder = CliRecorder::new();
        let handle = recorder.handle();
        with_local_recorder(&recorder, || {
            record_comparison(&Verdict::Match, 10, 0.5);
            record_comparison(&Verdict::Match, 5, 0.25);
            gauge!("ignored").set(1.0);
        });
        assert_eq!(
            handle.get_counter("xcheck_comparisons_total{verdict=match}"),
            Some(2)
        );
        assert_eq!(
            handle.get_counter("xcheck_events_compared_total{verdict=match}"),
            Some(15)
        );
        assert_eq!(
            handle
                .get_histogram("xcheck_compare_duration_seconds")
                .map(|v| v.len()),
            Some(2)
        );

        let summary = handle.summary();
        assert!(summary.contains("### Comparisons"));
        assert!(summary.contains("match: 2 (15 events)"));
        assert!(!summary.contains("### Runtime"));
    }

    #[test]
    fn test_summary_reports_ledger_counters() {
        let recorder = CliRecorder::new();
        let handle = recorder.handle();
        assert_eq!(handle.summary(), "No metrics collected.\n");

        with_local_recorder(&recorder, || {
            counter!("xcheck_events_recorded_total").increment(7);
            counter!("xcheck_protocol_violations_total").increment(1);
        });
        let summary = handle.summary();
        assert!(summary.contains("events recorded: 7"));
        assert!(summary.contains("protocol violations: 1"));
        assert!(!summary.contains("### Comparisons"));
    }
}
