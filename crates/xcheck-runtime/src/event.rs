//! Cross-check event types.

use std::fmt;

use xcheck_hash::djb2;

use crate::RuntimeError;

/// Identity of an instrumentation point (function plus call site).
///
/// The upper 32 bits carry the djb2 hash of the function name and the lower
/// 32 bits an optional per-function site index, so ids stay stable across
/// builds that keep the same function names.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SiteId(u64);

impl SiteId {
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Site id for a function identifier.
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        Self::from_name_index(name, 0)
    }

    /// Site id for the `index`-th instrumentation point inside `name`.
    #[must_use]
    pub const fn from_name_index(name: &str, index: u32) -> Self {
        Self::from_name_bytes(name.as_bytes(), index)
    }

    /// Like [`from_name_index`](Self::from_name_index) for names that are not
    /// UTF-8 (C identifiers handed over the ABI).
    #[must_use]
    pub const fn from_name_bytes(name: &[u8], index: u32) -> Self {
        Self(((djb2(name) as u64) << 32) | index as u64)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

impl fmt::LowerHex for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<u64> for SiteId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Kind of instrumentation point that produced an event.
///
/// The discriminant is the wire tag shared with instrumented code.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Unknown = 0,
    /// Function entry.
    Entry = 1,
    /// Function exit.
    Exit = 2,
    /// Function argument value.
    Arg = 3,
    /// Function return value.
    Return = 4,
    /// One loop iteration.
    LoopIter = 5,
    /// Designated value observation.
    Value = 6,
}

impl EventKind {
    pub const ALL: [Self; 7] = [
        Self::Unknown,
        Self::Entry,
        Self::Exit,
        Self::Arg,
        Self::Return,
        Self::LoopIter,
        Self::Value,
    ];

    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Unknown),
            1 => Some(Self::Entry),
            2 => Some(Self::Exit),
            3 => Some(Self::Arg),
            4 => Some(Self::Return),
            5 => Some(Self::LoopIter),
            6 => Some(Self::Value),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Entry => "entry",
            Self::Exit => "exit",
            Self::Arg => "arg",
            Self::Return => "return",
            Self::LoopIter => "loop-iter",
            Self::Value => "value",
        }
    }
}

impl TryFrom<u8> for EventKind {
    type Error = RuntimeError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Self::from_tag(tag).ok_or(RuntimeError::UnknownKind(tag))
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One cross-check event. Immutable once emitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Event {
    pub site_id: SiteId,
    pub kind: EventKind,
    /// Position in the session's total order.
    pub sequence: u64,
    pub payload_hash: u64,
}

impl Event {
    #[must_use]
    pub const fn new(site_id: SiteId, kind: EventKind, sequence: u64, payload_hash: u64) -> Self {
        Self {
            site_id,
            kind,
            sequence,
            payload_hash,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} site={} hash={:#018x}",
            self.sequence, self.kind, self.site_id, self.payload_hash
        )
    }
}
