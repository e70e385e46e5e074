use std::collections::VecDeque;

use xcheck_runtime::{Event, Session};

use super::{CompareConfig, CompareState, DivergenceKind, DivergenceReport, Verdict};

/// Compare two finished sessions.
///
/// Pure function of its inputs; stops at the first mismatch.
#[must_use]
pub fn compare(expected: &Session, actual: &Session, config: &CompareConfig) -> Verdict {
    let mut run = Comparison::new(config);
    for event in actual {
        if run.step(expected.events(), event).is_terminal() {
            break;
        }
    }
    run.finish(expected.events())
}

/// Incremental comparison against a reference stream.
///
/// Feed actual events in sequence order with [`step`](Self::step), then call
/// [`finish`](Self::finish) once the actual stream has ended.
#[derive(Debug)]
pub struct Comparison {
    next: usize,
    context: VecDeque<Event>,
    context_len: usize,
    state: CompareState,
    verdict: Option<Verdict>,
}

impl Comparison {
    #[must_use]
    pub fn new(config: &CompareConfig) -> Self {
        Self {
            next: 0,
            context: VecDeque::with_capacity(config.context),
            context_len: config.context,
            state: CompareState::Start,
            verdict: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> CompareState {
        self.state
    }

    /// Number of actual events matched so far.
    #[must_use]
    pub const fn matched(&self) -> usize {
        self.next
    }

    /// Verdict, once a divergence is known.
    #[must_use]
    pub const fn verdict(&self) -> Option<&Verdict> {
        self.verdict.as_ref()
    }

    /// Compare the next actual event. Ignored once the run is terminal.
    pub fn step(&mut self, expected: &[Event], actual: &Event) -> CompareState {
        if self.state.is_terminal() {
            return self.state;
        }
        self.state = CompareState::Comparing;

        let Some(exp) = expected.get(self.next) else {
            let report = DivergenceReport {
                first_mismatched_sequence: actual.sequence,
                last_common_sequence: expected.last().map(|e| e.sequence),
                kind: DivergenceKind::ActualTail,
                expected: None,
                actual: Some(*actual),
                context: self.context.iter().copied().collect(),
            };
            return self.conclude(Verdict::LengthMismatch(report));
        };

        if let Some(kind) = first_difference(exp, actual) {
            let report = DivergenceReport {
                first_mismatched_sequence: exp.sequence,
                last_common_sequence: self.last_matched(expected),
                kind,
                expected: Some(*exp),
                actual: Some(*actual),
                context: self.context.iter().copied().collect(),
            };
            return self.conclude(Verdict::Diverged(report));
        }

        if self.context_len > 0 {
            if self.context.len() == self.context_len {
                self.context.pop_front();
            }
            self.context.push_back(*exp);
        }
        self.next += 1;
        self.state
    }

    /// Conclude the run after the last actual event.
    #[must_use]
    pub fn finish(mut self, expected: &[Event]) -> Verdict {
        if let Some(verdict) = self.verdict.take() {
            return verdict;
        }
        match expected.get(self.next) {
            None => Verdict::Match,
            Some(exp) => Verdict::LengthMismatch(DivergenceReport {
                first_mismatched_sequence: exp.sequence,
                last_common_sequence: self.last_matched(expected),
                kind: DivergenceKind::ExpectedTail,
                expected: Some(*exp),
                actual: None,
                context: self.context.into_iter().collect(),
            }),
        }
    }

    fn last_matched(&self, expected: &[Event]) -> Option<u64> {
        self.next
            .checked_sub(1)
            .and_then(|i| expected.get(i))
            .map(|e| e.sequence)
    }

    fn conclude(&mut self, verdict: Verdict) -> CompareState {
        self.state = verdict.state();
        self.verdict = Some(verdict);
        self.state
    }
}

/// First field in which two events differ. Sequence is checked first since
/// a missing event misaligns everything after it.
fn first_difference(expected: &Event, actual: &Event) -> Option<DivergenceKind> {
    if expected.sequence != actual.sequence {
        Some(DivergenceKind::Sequence)
    } else if expected.site_id != actual.site_id {
        Some(DivergenceKind::Site)
    } else if expected.kind != actual.kind {
        Some(DivergenceKind::Kind)
    } else if expected.payload_hash != actual.payload_hash {
        Some(DivergenceKind::Payload)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use xcheck_runtime::{EventKind, SiteId};

    use super::*;

    fn session(checks: &[(u64, EventKind, u64)]) -> Session {
        Session::from_checks(
            checks
                .iter()
                .map(|&(site, kind, hash)| (SiteId::from_raw(site), kind, hash)),
        )
    }

    fn stream_a() -> Session {
        session(&[(1, EventKind::Entry, 0xaa), (1, EventKind::Exit, 0xbb)])
    }

    #[test]
    fn test_identical_sessions_match() {
        let a = stream_a();
        assert_eq!(compare(&a, &a.clone(), &CompareConfig::default()), Verdict::Match);
    }

    #[test]
    fn test_empty_sessions_match() {
        let empty = Session::default();
        assert_eq!(
            compare(&empty, &empty, &CompareConfig::default()),
            Verdict::Match
        );
    }

    #[test]
    fn test_payload_divergence_at_sequence_one() {
        let a = stream_a();
        let b = session(&[(1, EventKind::Entry, 0xaa), (1, EventKind::Exit, 0xcc)]);

        let verdict = compare(&a, &b, &CompareConfig::default());
        let Verdict::Diverged(report) = verdict else {
            panic!("expected divergence, got {verdict:?}");
        };
        assert_eq!(report.kind, DivergenceKind::Payload);
        assert_eq!(report.first_mismatched_sequence, 1);
        assert_eq!(report.last_common_sequence, Some(0));
        assert_eq!(report.expected.map(|e| e.payload_hash), Some(0xbb));
        assert_eq!(report.actual.map(|e| e.payload_hash), Some(0xcc));
        assert_eq!(report.context.len(), 1);
    }

    #[test]
    fn test_truncated_actual_is_length_mismatch() {
        let a = stream_a();
        let b = session(&[(1, EventKind::Entry, 0xaa)]);

        let verdict = compare(&a, &b, &CompareConfig::default());
        assert_eq!(verdict.state(), CompareState::LengthMismatch);
        let report = verdict.report().unwrap();
        assert_eq!(report.kind, DivergenceKind::ExpectedTail);
        assert_eq!(report.first_mismatched_sequence, 1);
        assert_eq!(report.last_common_sequence, Some(0));
        assert_eq!(report.actual, None);
    }

    #[test]
    fn test_extra_actual_events_are_length_mismatch() {
        let a = session(&[(1, EventKind::Entry, 0xaa)]);
        let b = stream_a();

        let report = compare(&a, &b, &CompareConfig::default())
            .report()
            .cloned()
            .unwrap();
        assert_eq!(report.kind, DivergenceKind::ActualTail);
        assert_eq!(report.first_mismatched_sequence, 1);
        assert_eq!(report.last_common_sequence, Some(0));
        assert_eq!(report.expected, None);
    }

    #[test]
    fn test_empty_actual_against_nonempty() {
        let report = compare(&stream_a(), &Session::default(), &CompareConfig::default())
            .report()
            .cloned()
            .unwrap();
        assert_eq!(report.first_mismatched_sequence, 0);
        assert_eq!(report.last_common_sequence, None);
    }

    #[test]
    fn test_first_differing_field_is_named() {
        let a = stream_a();
        let by_site = session(&[(2, EventKind::Entry, 0xaa), (1, EventKind::Exit, 0xbb)]);
        let by_kind = session(&[(1, EventKind::Value, 0xaa), (1, EventKind::Exit, 0xbb)]);
        let config = CompareConfig::default();

        assert_eq!(
            compare(&a, &by_site, &config).report().map(|r| r.kind),
            Some(DivergenceKind::Site)
        );
        assert_eq!(
            compare(&a, &by_kind, &config).report().map(|r| r.kind),
            Some(DivergenceKind::Kind)
        );
    }

    #[test]
    fn test_only_first_divergence_is_reported() {
        let a = session(&[
            (1, EventKind::Entry, 1),
            (1, EventKind::Value, 2),
            (1, EventKind::Value, 3),
        ]);
        let b = session(&[
            (1, EventKind::Entry, 1),
            (1, EventKind::Value, 20),
            (1, EventKind::Value, 30),
        ]);
        let report = compare(&a, &b, &CompareConfig::default())
            .report()
            .cloned()
            .unwrap();
        assert_eq!(report.first_mismatched_sequence, 1);
    }

    #[test]
    fn test_context_is_bounded() {
        let checks: Vec<_> = (0..20).map(|i| (1, EventKind::LoopIter, i)).collect();
        let a = session(&checks);
        let mut mutated = checks;
        mutated[15].2 = 999;
        let b = session(&mutated);

        let config = CompareConfig::default().with_context(3);
        let report = compare(&a, &b, &config).report().cloned().unwrap();
        let context: Vec<u64> = report.context.iter().map(|e| e.sequence).collect();
        assert_eq!(context, vec![12, 13, 14]);
    }

    #[test]
    fn test_terminal_state_is_sticky() {
        let a = stream_a();
        let b = session(&[(1, EventKind::Entry, 0xff), (1, EventKind::Exit, 0xbb)]);
        let mut run = Comparison::new(&CompareConfig::default());
        assert_eq!(run.state(), CompareState::Start);
        assert_eq!(run.step(a.events(), &b.events()[0]), CompareState::Diverged);
        assert_eq!(run.step(a.events(), &b.events()[1]), CompareState::Diverged);
        assert_eq!(
            run.finish(a.events()).report().map(|r| r.first_mismatched_sequence),
            Some(0)
        );
    }
}
