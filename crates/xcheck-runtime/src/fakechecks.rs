//! Printing stand-in for the ledger.
//!
//! Each check becomes one line `XCHECK(<tag>):<site>/0x<hash>` so a reference
//! build can be run without the real runtime and its output compared later.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use crate::sink::ViolationCounter;
use crate::{CrossCheckSink, EventKind, Result, Session, SiteId};

/// Format one fakechecks log line (without newline).
#[must_use]
pub fn format_check(site_id: SiteId, kind: EventKind, payload_hash: u64) -> String {
    format!(
        "XCHECK({}):{}/0x{:016x}",
        kind.tag(),
        site_id.raw(),
        payload_hash
    )
}

/// Sink that writes every check as a text line.
pub struct FakeChecks<W: Write + Send> {
    out: Mutex<W>,
    next_sequence: AtomicU64,
    closed: AtomicBool,
    violations: ViolationCounter,
}

impl FakeChecks<io::Stderr> {
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl FakeChecks<BufWriter<File>> {
    /// Write checks to a freshly created file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write + Send> FakeChecks<W> {
    pub const fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            next_sequence: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            violations: ViolationCounter::new(),
        }
    }

    /// Number of checks written so far.
    pub fn written(&self) -> u64 {
        self.next_sequence.load(Ordering::Relaxed)
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write + Send> CrossCheckSink for FakeChecks<W> {
    fn check(&self, site_id: SiteId, kind: EventKind, payload_hash: u64) -> Result<u64> {
        let mut out = self.out.lock();
        if self.closed.load(Ordering::Acquire) {
            return Err(self.violations.report("check after finish"));
        }
        writeln!(out, "{}", format_check(site_id, kind, payload_hash))?;
        Ok(self.next_sequence.fetch_add(1, Ordering::Relaxed))
    }

    fn finish(&self) -> Result<Option<Session>> {
        let mut out = self.out.lock();
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(self.violations.report("finish called twice"));
        }
        out.flush()?;
        Ok(None)
    }

    fn violations(&self) -> u64 {
        self.violations.count()
    }
}
