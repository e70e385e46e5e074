//! Destinations for cross-check events.

use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;
use tracing::warn;

use crate::{EventKind, Result, RuntimeError, Session, SessionHandle, SiteId};

/// Something instrumented code can send checks to.
///
/// Implemented by the real ledger ([`SessionHandle`]), the printing stand-in
/// ([`FakeChecks`](crate::FakeChecks)) and [`NoopSink`].
pub trait CrossCheckSink: Send + Sync {
    /// Emit one check and return its sequence number.
    ///
    /// # Errors
    ///
    /// Implementation specific; see [`SessionHandle::record`].
    fn check(&self, site_id: SiteId, kind: EventKind, payload_hash: u64) -> Result<u64>;

    /// Stop accepting checks. Sinks that keep events return the session.
    ///
    /// # Errors
    ///
    /// Implementation specific; see [`SessionHandle::end_session`].
    fn finish(&self) -> Result<Option<Session>>;

    /// Number of protocol violations reported so far.
    fn violations(&self) -> u64 {
        0
    }
}

/// Protocol violation count of one sink.
///
/// Every report is logged and counted in `xcheck_protocol_violations_total`.
#[derive(Debug, Default)]
pub struct ViolationCounter(AtomicU64);

impl ViolationCounter {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Record a violation and return the error for the caller.
    #[must_use]
    pub fn report(&self, reason: &'static str) -> RuntimeError {
        let total = self.0.fetch_add(1, Ordering::Relaxed) + 1;
        counter!("xcheck_protocol_violations_total").increment(1);
        warn!(reason, total, "cross-check protocol violation");
        RuntimeError::ProtocolViolation(reason)
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

impl CrossCheckSink for SessionHandle {
    fn check(&self, site_id: SiteId, kind: EventKind, payload_hash: u64) -> Result<u64> {
        self.record(site_id, kind, payload_hash)
    }

    fn finish(&self) -> Result<Option<Session>> {
        self.end_session().map(Some)
    }

    fn violations(&self) -> u64 {
        Self::violations(self)
    }
}

/// Sink that discards every check. Sequence numbers are always 0.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl CrossCheckSink for NoopSink {
    fn check(&self, _site_id: SiteId, _kind: EventKind, _payload_hash: u64) -> Result<u64> {
        Ok(0)
    }

    fn finish(&self) -> Result<Option<Session>> {
        Ok(None)
    }
}
