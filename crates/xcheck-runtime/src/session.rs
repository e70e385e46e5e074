//! Session ledger.
//!
//! A [`SessionHandle`] is the live, process-wide ledger that instrumented
//! code records into; [`SessionHandle::end_session`] turns it into an
//! immutable [`Session`].
//!
//! # Ordering
//!
//! Sequence numbers come from one shared atomic counter, so they form a
//! total order across threads without a reconciliation step. Events are
//! stored in per-thread shards to keep lock contention low; the shards are
//! merged by sequence when the session ends.
//!
//! The counter is only advanced while holding a shard lock, after storage for
//! the event has been reserved and after the closed flag was checked. Ending
//! the session sets the flag before draining the shards, so every sequence
//! number handed out ends up in the finished session and numbering is gapless.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use metrics::counter;
use parking_lot::Mutex;
use tracing::debug;
use xcheck_hash::{CrossCheckHash, checksum, hash_bytes};

use crate::sink::ViolationCounter;
use crate::{Event, EventKind, Result, RuntimeConfig, RuntimeError, SiteId};

/// Round-robin source for per-thread shard slots.
static NEXT_SHARD_SLOT: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static SHARD_SLOT: Cell<Option<usize>> = const { Cell::new(None) };
}

fn shard_slot() -> usize {
    SHARD_SLOT.with(|slot| {
        slot.get().unwrap_or_else(|| {
            let assigned = NEXT_SHARD_SLOT.fetch_add(1, Ordering::Relaxed);
            slot.set(Some(assigned));
            assigned
        })
    })
}

/// Allocate the ledger for one execution.
///
/// # Errors
///
/// Returns [`RuntimeError::InvalidConfig`] for an invalid configuration and
/// [`RuntimeError::ResourceExhausted`] if the initial event storage cannot be
/// reserved.
pub fn begin_session(config: RuntimeConfig) -> Result<SessionHandle> {
    config.validate()?;

    let mut shards = Vec::new();
    shards
        .try_reserve_exact(config.shards)
        .map_err(|_| RuntimeError::ResourceExhausted {
            requested: config.shards,
        })?;
    for _ in 0..config.shards {
        let mut events = Vec::new();
        events
            .try_reserve(config.initial_capacity)
            .map_err(|_| RuntimeError::ResourceExhausted {
                requested: config.initial_capacity,
            })?;
        shards.push(Mutex::new(events));
    }

    debug!(
        shards = config.shards,
        capacity = config.initial_capacity,
        "session started"
    );

    Ok(SessionHandle {
        shards: shards.into_boxed_slice(),
        next_sequence: AtomicU64::new(0),
        closed: AtomicBool::new(false),
        violations: ViolationCounter::new(),
        config,
    })
}

/// Live cross-check ledger. Shared by reference between recording threads.
pub struct SessionHandle {
    shards: Box<[Mutex<Vec<Event>>]>,
    next_sequence: AtomicU64,
    closed: AtomicBool,
    violations: ViolationCounter,
    config: RuntimeConfig,
}

impl SessionHandle {
    /// Append an event and return its sequence number.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::ProtocolViolation`] after [`end_session`](Self::end_session);
    ///   existing events are left untouched.
    /// - [`RuntimeError::ResourceExhausted`] if the event cannot be stored.
    ///   No sequence number is consumed in that case.
    pub fn record(&self, site_id: SiteId, kind: EventKind, payload_hash: u64) -> Result<u64> {
        let shard = &self.shards[shard_slot() % self.shards.len()];
        let mut events = shard.lock();

        if self.closed.load(Ordering::Acquire) {
            drop(events);
            return Err(self.violations.report("record called after end_session"));
        }

        events
            .try_reserve(1)
            .map_err(|_| RuntimeError::ResourceExhausted {
                requested: events.len() + 1,
            })?;

        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        events.push(Event::new(site_id, kind, sequence, payload_hash));
        Ok(sequence)
    }

    /// Record the checksum of a value.
    ///
    /// # Errors
    ///
    /// Same as [`record`](Self::record).
    pub fn record_value<T: CrossCheckHash + ?Sized>(
        &self,
        site_id: SiteId,
        kind: EventKind,
        value: &T,
    ) -> Result<u64> {
        self.record(site_id, kind, checksum(value))
    }

    /// Record the checksum of raw payload bytes.
    ///
    /// # Errors
    ///
    /// Same as [`record`](Self::record).
    pub fn record_bytes(&self, site_id: SiteId, kind: EventKind, payload: &[u8]) -> Result<u64> {
        self.record(site_id, kind, hash_bytes(payload))
    }

    /// Finalize the ledger and return the recorded events in sequence order.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::ProtocolViolation`] if the session was already ended.
    /// - [`RuntimeError::ResourceExhausted`] if the merged event list cannot
    ///   be allocated.
    pub fn end_session(&self) -> Result<Session> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(self.violations.report("end_session called twice"));
        }

        let mut drained = Vec::with_capacity(self.shards.len());
        for shard in &self.shards {
            drained.push(std::mem::take(&mut *shard.lock()));
        }

        let total: usize = drained.iter().map(Vec::len).sum();
        let mut events = Vec::new();
        events
            .try_reserve_exact(total)
            .map_err(|_| RuntimeError::ResourceExhausted { requested: total })?;
        for shard in drained {
            events.extend(shard);
        }
        // Each shard is already sorted, so this is a cheap run merge.
        events.sort_by_key(|event| event.sequence);

        debug_assert!(
            events
                .iter()
                .enumerate()
                .all(|(i, e)| e.sequence == i as u64)
        );

        counter!("xcheck_events_recorded_total").increment(total as u64);
        debug!(events = total, "session ended");

        Ok(Session { events })
    }

    /// Number of sequence numbers handed out so far.
    #[must_use]
    pub fn recorded(&self) -> u64 {
        self.next_sequence.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of protocol violations reported so far.
    #[must_use]
    pub fn violations(&self) -> u64 {
        self.violations.count()
    }

    #[must_use]
    pub const fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}

/// Immutable, gapless, sequence-ordered event log of one execution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    events: Vec<Event>,
}

impl Session {
    /// Build a session from events that must already be numbered `0..n`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::NonContiguousSequence`] at the first event
    /// whose sequence is not its index.
    pub fn from_events(events: Vec<Event>) -> Result<Self> {
        for (index, event) in events.iter().enumerate() {
            let expected = index as u64;
            if event.sequence != expected {
                return Err(RuntimeError::NonContiguousSequence {
                    expected,
                    found: event.sequence,
                });
            }
        }
        Ok(Self { events })
    }

    /// Events already checked to be numbered `0..n`.
    pub(crate) const fn from_validated(events: Vec<Event>) -> Self {
        Self { events }
    }

    /// Build a session by numbering `(site, kind, hash)` triples in order.
    pub fn from_checks(checks: impl IntoIterator<Item = (SiteId, EventKind, u64)>) -> Self {
        let events = checks
            .into_iter()
            .enumerate()
            .map(|(i, (site, kind, hash))| Event::new(site, kind, i as u64, hash))
            .collect();
        Self { events }
    }

    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    #[must_use]
    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Event with the given sequence number.
    #[must_use]
    pub fn get(&self, sequence: u64) -> Option<&Event> {
        usize::try_from(sequence)
            .ok()
            .and_then(|index| self.events.get(index))
    }

    /// Sequence number of the last event.
    #[must_use]
    pub fn last_sequence(&self) -> Option<u64> {
        self.events.last().map(|event| event.sequence)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }
}

impl<'a> IntoIterator for &'a Session {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> RuntimeConfig {
        RuntimeConfig::default().with_shards(2).with_capacity(4)
    }

    #[test]
    fn test_record_assigns_sequences_in_order() {
        let handle = begin_session(small_config()).unwrap();
        let site = SiteId::from_name("f");
        assert_eq!(handle.record(site, EventKind::Entry, 1).unwrap(), 0);
        assert_eq!(handle.record(site, EventKind::Exit, 2).unwrap(), 1);
        assert_eq!(handle.recorded(), 2);

        let session = handle.end_session().unwrap();
        assert_eq!(session.len(), 2);
        assert_eq!(session.events()[0].kind, EventKind::Entry);
        assert_eq!(session.events()[1].payload_hash, 2);
        assert_eq!(session.last_sequence(), Some(1));
    }

    #[test]
    fn test_record_after_end_is_reported() {
        let handle = begin_session(small_config()).unwrap();
        let site = SiteId::from_raw(1);
        handle.record(site, EventKind::Entry, 0xaa).unwrap();
        let session = handle.end_session().unwrap();

        let err = handle.record(site, EventKind::Exit, 0xbb).unwrap_err();
        assert!(matches!(err, RuntimeError::ProtocolViolation(_)));
        assert_eq!(handle.violations(), 1);
        // The finished session is unaffected.
        assert_eq!(session.len(), 1);
        assert_eq!(handle.recorded(), 1);
    }

    #[test]
    fn test_double_end_is_reported() {
        let handle = begin_session(small_config()).unwrap();
        handle.end_session().unwrap();
        assert!(matches!(
            handle.end_session(),
            Err(RuntimeError::ProtocolViolation(_))
        ));
        assert!(handle.is_ended());
    }

    #[test]
    fn test_empty_session() {
        let handle = begin_session(small_config()).unwrap();
        let session = handle.end_session().unwrap();
        assert!(session.is_empty());
        assert_eq!(session.last_sequence(), None);
    }

    #[test]
    fn test_zero_shards_rejected() {
        let config = RuntimeConfig::default().with_shards(0);
        assert!(matches!(
            begin_session(config),
            Err(RuntimeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_record_value_uses_checksum() {
        let handle = begin_session(small_config()).unwrap();
        let site = SiteId::from_name("g");
        handle.record_value(site, EventKind::Arg, &42u32).unwrap();
        handle.record_bytes(site, EventKind::Value, b"xyz").unwrap();
        let session = handle.end_session().unwrap();
        assert_eq!(session.events()[0].payload_hash, checksum(&42u32));
        assert_eq!(session.events()[1].payload_hash, hash_bytes(b"xyz"));
    }

    #[test]
    fn test_from_events_rejects_gaps() {
        let site = SiteId::from_raw(1);
        let events = vec![
            Event::new(site, EventKind::Entry, 0, 1),
            Event::new(site, EventKind::Exit, 2, 2),
        ];
        assert!(matches!(
            Session::from_events(events),
            Err(RuntimeError::NonContiguousSequence {
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn test_from_checks_numbers_events() {
        let site = SiteId::from_raw(9);
        let session = Session::from_checks([
            (site, EventKind::Entry, 0xaa),
            (site, EventKind::Exit, 0xbb),
        ]);
        assert_eq!(session.get(1).map(|e| e.payload_hash), Some(0xbb));
        assert_eq!(session.get(2), None);
    }
}
