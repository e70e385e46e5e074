//! Online comparison of a running session against a reference stream.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use tracing::warn;
use xcheck_runtime::{
    CrossCheckSink, Event, EventKind, RuntimeError, Session, SessionHandle, SiteId,
};

use super::{CompareConfig, CompareState, Comparison, Verdict};

/// Default bound on events held back waiting for an earlier sequence.
pub const DEFAULT_REORDER_WINDOW: usize = 1 << 16;

struct LiveInner {
    run: Comparison,
    /// Events that arrived ahead of the next expected sequence.
    pending: BTreeMap<u64, Event>,
    next_sequence: u64,
    reported: bool,
}

/// Compares events as they are recorded, possibly from many threads.
///
/// Events may arrive in any order; they are held in a bounded reorder buffer
/// until every earlier sequence has been seen, then compared in order. The
/// first divergence is available from [`verdict`](Self::verdict) as soon as it
/// is known.
pub struct LiveComparator {
    expected: Session,
    window: usize,
    inner: Mutex<LiveInner>,
}

impl LiveComparator {
    #[must_use]
    pub fn new(expected: Session, config: &CompareConfig) -> Self {
        Self {
            expected,
            window: DEFAULT_REORDER_WINDOW,
            inner: Mutex::new(LiveInner {
                run: Comparison::new(config),
                pending: BTreeMap::new(),
                next_sequence: 0,
                reported: false,
            }),
        }
    }

    /// Bound the reorder buffer to `window` events.
    #[must_use]
    pub const fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Feed one recorded event.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::ResourceExhausted`] if the reorder buffer is full.
    /// - [`RuntimeError::ProtocolViolation`] if the sequence was already seen.
    pub fn observe(&self, event: Event) -> Result<CompareState, RuntimeError> {
        let mut inner = self.inner.lock();
        if inner.run.state().is_terminal() {
            return Ok(inner.run.state());
        }
        if event.sequence < inner.next_sequence || inner.pending.contains_key(&event.sequence) {
            return Err(RuntimeError::ProtocolViolation("duplicate sequence number"));
        }

        if event.sequence == inner.next_sequence {
            self.advance(&mut inner, event);
            while !inner.run.state().is_terminal() {
                let next = inner.next_sequence;
                let Some(ready) = inner.pending.remove(&next) else {
                    break;
                };
                self.advance(&mut inner, ready);
            }
        } else {
            if inner.pending.len() >= self.window {
                return Err(RuntimeError::ResourceExhausted {
                    requested: inner.pending.len() + 1,
                });
            }
            inner.pending.insert(event.sequence, event);
        }

        let state = inner.run.state();
        if state.is_terminal() {
            inner.pending.clear();
            if !inner.reported {
                inner.reported = true;
                if let Some(report) = inner.run.verdict().and_then(Verdict::report) {
                    warn!(
                        sequence = report.first_mismatched_sequence,
                        kind = %report.kind,
                        "live cross-check diverged"
                    );
                }
            }
        }
        Ok(state)
    }

    fn advance(&self, inner: &mut LiveInner, event: Event) {
        inner.run.step(self.expected.events(), &event);
        inner.next_sequence = event.sequence + 1;
    }

    #[must_use]
    pub fn state(&self) -> CompareState {
        self.inner.lock().run.state()
    }

    /// The divergence verdict, once one is known.
    #[must_use]
    pub fn verdict(&self) -> Option<Verdict> {
        self.inner.lock().run.verdict().cloned()
    }

    /// Final verdict once the actual stream has ended.
    ///
    /// A sequence that never arrived is reported against the first event
    /// held back behind it.
    #[must_use]
    pub fn finish(self) -> Verdict {
        let LiveInner {
            mut run, pending, ..
        } = self.inner.into_inner();
        if let Some(stray) = pending.into_values().next() {
            run.step(self.expected.events(), &stray);
        }
        run.finish(self.expected.events())
    }
}

/// Sink that records into a session and checks every event live.
pub struct LiveCheckSink {
    handle: SessionHandle,
    comparator: LiveComparator,
}

impl LiveCheckSink {
    #[must_use]
    pub const fn new(handle: SessionHandle, comparator: LiveComparator) -> Self {
        Self { handle, comparator }
    }

    #[must_use]
    pub const fn comparator(&self) -> &LiveComparator {
        &self.comparator
    }

    #[must_use]
    pub const fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// Final verdict. Ends the session first if it is still open.
    ///
    /// # Errors
    ///
    /// Returns an error if the session has to be ended here and that fails.
    pub fn into_verdict(self) -> Result<Verdict, RuntimeError> {
        if !self.handle.is_ended() {
            self.handle.end_session()?;
        }
        Ok(self.comparator.finish())
    }
}

impl CrossCheckSink for LiveCheckSink {
    fn check(
        &self,
        site_id: SiteId,
        kind: EventKind,
        payload_hash: u64,
    ) -> Result<u64, RuntimeError> {
        let sequence = self.handle.record(site_id, kind, payload_hash)?;
        self.comparator
            .observe(Event::new(site_id, kind, sequence, payload_hash))?;
        Ok(sequence)
    }

    fn finish(&self) -> Result<Option<Session>, RuntimeError> {
        self.handle.end_session().map(Some)
    }

    fn violations(&self) -> u64 {
        self.handle.violations()
    }
}
