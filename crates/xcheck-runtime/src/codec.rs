//! Session file format.
//!
//! ```text
//! header (24 bytes, little-endian)
//!   magic    [u8; 4]  "XCHK"
//!   version  u32      1
//!   flags    u32      bit 0: record stream is one zstd frame
//!   reserved u32      0
//!   count    u64      number of records
//! records (32 bytes each, raw or compressed)
//!   site_id u64 | kind u8 | 7 zero bytes | sequence u64 | payload_hash u64
//! ```

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;

use crate::{CodecError, Event, EventKind, Session, SiteId};

pub const MAGIC: [u8; 4] = *b"XCHK";
pub const VERSION: u32 = 1;
/// Header flag: the record stream is zstd-compressed.
pub const FLAG_ZSTD: u32 = 1;
pub const HEADER_SIZE: usize = 24;
pub const RECORD_SIZE: usize = 32;

const KNOWN_FLAGS: u32 = FLAG_ZSTD;
const ZSTD_LEVEL: i32 = 3;
/// Upper bound on records preallocated from an untrusted header count.
const MAX_PREALLOC_RECORDS: usize = 1 << 16;

/// On-disk record layout.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WireRecord {
    pub site_id: u64,
    pub kind: u8,
    pub padding: [u8; 7],
    pub sequence: u64,
    pub payload_hash: u64,
}

impl WireRecord {
    #[must_use]
    pub const fn from_event(event: &Event) -> Self {
        Self {
            site_id: event.site_id.raw(),
            kind: event.kind.tag(),
            padding: [0; 7],
            sequence: event.sequence,
            payload_hash: event.payload_hash,
        }
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        buf[0..8].copy_from_slice(&self.site_id.to_le_bytes());
        buf[8] = self.kind;
        buf[9..16].copy_from_slice(&self.padding);
        buf[16..24].copy_from_slice(&self.sequence.to_le_bytes());
        buf[24..32].copy_from_slice(&self.payload_hash.to_le_bytes());
        buf
    }

    #[must_use]
    pub fn from_bytes(buf: &[u8; RECORD_SIZE]) -> Self {
        let mut padding = [0u8; 7];
        padding.copy_from_slice(&buf[9..16]);
        Self {
            site_id: le_u64(&buf[0..8]),
            kind: buf[8],
            padding,
            sequence: le_u64(&buf[16..24]),
            payload_hash: le_u64(&buf[24..32]),
        }
    }

    /// Validate the record found at position `index` and convert it.
    ///
    /// # Errors
    ///
    /// Fails on an unknown kind tag, non-zero padding or a sequence that is
    /// not `index`.
    pub fn into_event(self, index: u64) -> Result<Event, CodecError> {
        let kind = EventKind::from_tag(self.kind).ok_or(CodecError::UnknownKind {
            index,
            tag: self.kind,
        })?;
        if self.padding != [0; 7] {
            return Err(CodecError::NonZeroPadding { index });
        }
        if self.sequence != index {
            return Err(CodecError::NonContiguousSequence {
                index,
                found: self.sequence,
            });
        }
        Ok(Event::new(
            SiteId::from_raw(self.site_id),
            kind,
            self.sequence,
            self.payload_hash,
        ))
    }
}

fn le_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

fn le_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}

/// Whether `bytes` start with the session file magic.
#[must_use]
pub fn is_session_file(bytes: &[u8]) -> bool {
    bytes.starts_with(&MAGIC)
}

/// Encode a session.
///
/// # Errors
///
/// Returns [`CodecError::Io`] if writing fails.
pub fn write_session<W: Write>(
    out: &mut W,
    session: &Session,
    compress: bool,
) -> Result<(), CodecError> {
    let flags = if compress { FLAG_ZSTD } else { 0 };

    out.write_all(&MAGIC)?;
    out.write_all(&VERSION.to_le_bytes())?;
    out.write_all(&flags.to_le_bytes())?;
    out.write_all(&0u32.to_le_bytes())?;
    out.write_all(&(session.len() as u64).to_le_bytes())?;

    if compress {
        let mut encoder = zstd::stream::Encoder::new(&mut *out, ZSTD_LEVEL)?;
        write_records(&mut encoder, session)?;
        encoder.finish()?;
    } else {
        write_records(out, session)?;
    }
    out.flush()?;
    Ok(())
}

fn write_records<W: Write>(out: &mut W, session: &Session) -> io::Result<()> {
    for event in session {
        out.write_all(&WireRecord::from_event(event).to_bytes())?;
    }
    Ok(())
}

/// Decode a session, validating the whole file.
///
/// # Errors
///
/// Returns a [`CodecError`] naming the first problem found.
pub fn read_session<R: Read>(mut input: R) -> Result<Session, CodecError> {
    let mut header = [0u8; HEADER_SIZE];
    read_header(&mut input, &mut header)?;

    let version = le_u32(&header[4..8]);
    if version != VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    let flags = le_u32(&header[8..12]);
    if flags & !KNOWN_FLAGS != 0 {
        return Err(CodecError::UnknownFlags(flags));
    }
    let reserved = le_u32(&header[12..16]);
    if reserved != 0 {
        return Err(CodecError::NonZeroReserved(reserved));
    }
    let count = le_u64(&header[16..24]);

    let events = if flags & FLAG_ZSTD != 0 {
        let mut decoder = zstd::stream::Decoder::new(input)?.single_frame();
        // Trailing bytes are checked both inside and after the frame.
        let events = read_records(&mut decoder, count)?;
        let mut rest = decoder.finish();
        ensure_drained(&mut rest, count)?;
        events
    } else {
        read_records(&mut input, count)?
    };

    debug!(
        events = events.len(),
        compressed = flags & FLAG_ZSTD != 0,
        "session decoded"
    );
    Ok(Session::from_validated(events))
}

fn read_header<R: Read>(
    input: &mut R,
    header: &mut [u8; HEADER_SIZE],
) -> Result<(), CodecError> {
    let mut filled = 0;
    while filled < HEADER_SIZE {
        match input.read(&mut header[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    if filled < 4 || header[0..4] != MAGIC {
        let mut magic = [0u8; 4];
        magic[..filled.min(4)].copy_from_slice(&header[..filled.min(4)]);
        return Err(CodecError::BadMagic(magic));
    }
    if filled < HEADER_SIZE {
        return Err(CodecError::TruncatedHeader { found: filled });
    }
    Ok(())
}

fn read_records<R: Read>(input: &mut R, count: u64) -> Result<Vec<Event>, CodecError> {
    let capacity = usize::try_from(count)
        .unwrap_or(usize::MAX)
        .min(MAX_PREALLOC_RECORDS);
    let mut events = Vec::with_capacity(capacity);

    let mut buf = [0u8; RECORD_SIZE];
    for index in 0..count {
        match input.read_exact(&mut buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(CodecError::Truncated {
                    expected: count,
                    found: index,
                });
            }
            Err(e) => return Err(e.into()),
        }
        events.push(WireRecord::from_bytes(&buf).into_event(index)?);
    }

    ensure_drained(input, count)?;
    Ok(events)
}

fn ensure_drained<R: Read>(input: &mut R, count: u64) -> Result<(), CodecError> {
    let mut byte = [0u8; 1];
    loop {
        match input.read(&mut byte) {
            Ok(0) => return Ok(()),
            Ok(_) => return Err(CodecError::TrailingData { count }),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
}

/// Write a session file.
///
/// # Errors
///
/// Returns [`CodecError::Io`] if the file cannot be written.
pub fn save_session(
    path: impl AsRef<Path>,
    session: &Session,
    compress: bool,
) -> Result<(), CodecError> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    write_session(&mut writer, session, compress)?;
    debug!(path = %path.display(), events = session.len(), compress, "session saved");
    Ok(())
}

/// Read a session file.
///
/// # Errors
///
/// Returns a [`CodecError`] if the file cannot be read or is malformed.
pub fn load_session(path: impl AsRef<Path>) -> Result<Session, CodecError> {
    let path = path.as_ref();
    let session = read_session(BufReader::new(File::open(path)?))?;
    debug!(path = %path.display(), events = session.len(), "session loaded");
    Ok(session)
}
