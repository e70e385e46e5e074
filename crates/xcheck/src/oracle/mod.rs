//! Comparison oracle.
//!
//! Walks two event streams in sequence order and reports the first point
//! where they disagree. Comparison is exact: a pair matches only when the
//! sequence, site, kind and payload hash are all equal.

mod offline;
mod live;

use std::fmt;

use xcheck_runtime::Event;

pub use offline::{Comparison, compare};
pub use live::{DEFAULT_REORDER_WINDOW, LiveCheckSink, LiveComparator};

/// Progress of one comparison run.
///
/// `Start → Comparing → {Match, Diverged, LengthMismatch}`. Terminal states
/// never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareState {
    Start,
    Comparing,
    Match,
    Diverged,
    LengthMismatch,
}

impl CompareState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Match | Self::Diverged | Self::LengthMismatch)
    }
}

/// Which field made the first pair differ, or which stream ran longer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivergenceKind {
    /// Sequence numbers are out of step (an event is missing).
    Sequence,
    /// Different instrumentation point.
    Site,
    /// Same site, different event kind.
    Kind,
    /// Same site and kind, different payload checksum.
    Payload,
    /// Expected stream has remaining events (actual ended early).
    ExpectedTail,
    /// Actual stream has remaining events (expected ended early).
    ActualTail,
}

impl fmt::Display for DivergenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequence => write!(f, "sequence mismatch"),
            Self::Site => write!(f, "site mismatch"),
            Self::Kind => write!(f, "event kind mismatch"),
            Self::Payload => write!(f, "payload hash mismatch"),
            Self::ExpectedTail => write!(f, "expected stream has extra tail"),
            Self::ActualTail => write!(f, "actual stream has extra tail"),
        }
    }
}

/// Where and how two streams diverged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivergenceReport {
    /// Sequence of the first mismatching pair, or of the first event present
    /// in only one stream.
    pub first_mismatched_sequence: u64,
    /// Last sequence both streams agree on (for a length mismatch, the last
    /// valid sequence of the shorter stream). `None` if nothing matched.
    pub last_common_sequence: Option<u64>,
    pub kind: DivergenceKind,
    pub expected: Option<Event>,
    pub actual: Option<Event>,
    /// Matched events immediately before the divergence, oldest first.
    pub context: Vec<Event>,
}

/// Outcome of comparing two streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Match,
    Diverged(DivergenceReport),
    LengthMismatch(DivergenceReport),
}

impl Verdict {
    #[must_use]
    pub const fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }

    #[must_use]
    pub const fn report(&self) -> Option<&DivergenceReport> {
        match self {
            Self::Match => None,
            Self::Diverged(report) | Self::LengthMismatch(report) => Some(report),
        }
    }

    /// Terminal state this verdict corresponds to.
    #[must_use]
    pub const fn state(&self) -> CompareState {
        match self {
            Self::Match => CompareState::Match,
            Self::Diverged(_) => CompareState::Diverged,
            Self::LengthMismatch(_) => CompareState::LengthMismatch,
        }
    }

    /// Short label used in logs, metrics and summaries.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::Diverged(_) => "diverged",
            Self::LengthMismatch(_) => "length_mismatch",
        }
    }
}

/// Comparison settings.
#[derive(Debug, Clone)]
pub struct CompareConfig {
    /// Number of matched events kept before a divergence for the report.
    pub context: usize,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self { context: 8 }
    }
}

impl CompareConfig {
    #[must_use]
    pub const fn with_context(mut self, context: usize) -> Self {
        self.context = context;
        self
    }
}
