use thiserror::Error;

/// Runtime library errors.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("event storage exhausted (needed room for {requested} events)")]
    ResourceExhausted { requested: usize },
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unknown event kind tag {0}")]
    UnknownKind(u8),
    #[error("non-contiguous sequence: expected {expected}, found {found}")]
    NonContiguousSequence { expected: u64, found: u64 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Session file encoding/decoding errors.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("bad magic {0:02x?}, not a session file")]
    BadMagic([u8; 4]),
    #[error("unsupported session format version {0}")]
    UnsupportedVersion(u32),
    #[error("unknown header flags {0:#x}")]
    UnknownFlags(u32),
    #[error("reserved header field is {0:#x}, expected 0")]
    NonZeroReserved(u32),
    #[error("record {index}: unknown event kind tag {tag}")]
    UnknownKind { index: u64, tag: u8 },
    #[error("record {index}: non-zero padding")]
    NonZeroPadding { index: u64 },
    #[error("truncated header: {found} of 24 bytes")]
    TruncatedHeader { found: usize },
    #[error("truncated session: header promises {expected} records, found {found}")]
    Truncated { expected: u64, found: u64 },
    #[error("trailing data after {count} records")]
    TrailingData { count: u64 },
    #[error("record {index}: expected sequence {index}, found {found}")]
    NonContiguousSequence { index: u64, found: u64 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
