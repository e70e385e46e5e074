//! Fakechecks text logs.
//!
//! A fakechecks run prints one `XCHECK(<tag>):<site>/0x<hash>` line per check,
//! possibly interleaved with the program's own output. Sequences are assigned
//! by line order.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;
use xcheck_runtime::codec::{is_session_file, read_session};
use xcheck_runtime::{EventKind, Session, SiteId};

use crate::{Error, Result};

/// Marks a line as carrying a check.
const CHECK_PREFIX: &str = "XCHECK(";

static CHECK_PATTERN: OnceLock<Regex> = OnceLock::new();

/// # Panics
///
/// Never in practice; the pattern is a constant.
fn check_pattern() -> &'static Regex {
    CHECK_PATTERN.get_or_init(|| {
        Regex::new(
            r"^XCHECK\((\d+)\):(0[xX][0-9a-fA-F]+|\d+)/0[xX]([0-9a-fA-F]{1,16})(?:[^0-9A-Za-z_]|$)",
        )
        .unwrap()
    })
}

/// Parse one line. Lines without `XCHECK(` yield `Ok(None)`.
///
/// # Errors
///
/// Returns [`Error::Parse`] for a check line that is malformed, has an
/// unknown tag or an out-of-range number. Skipping such a line would shift
/// every later sequence.
pub fn parse_check(line: &str, line_no: usize) -> Result<Option<(SiteId, EventKind, u64)>> {
    let Some(start) = line.find(CHECK_PREFIX) else {
        return Ok(None);
    };
    let check = &line[start..];
    let parse_err = |message: String| Error::Parse {
        line: line_no,
        message,
    };
    let caps = check_pattern()
        .captures(check)
        .ok_or_else(|| parse_err(format!("malformed check `{}`", check.trim_end())))?;

    let tag: u8 = caps[1]
        .parse()
        .map_err(|_| parse_err(format!("tag {} out of range", &caps[1])))?;
    let kind =
        EventKind::from_tag(tag).ok_or_else(|| parse_err(format!("unknown event kind tag {tag}")))?;
    let site = parse_u64(&caps[2]).ok_or_else(|| parse_err(format!("bad site id {}", &caps[2])))?;
    let hash = u64::from_str_radix(&caps[3], 16)
        .map_err(|_| parse_err(format!("bad payload hash {}", &caps[3])))?;

    Ok(Some((SiteId::from_raw(site), kind, hash)))
}

/// Parse a decimal or `0x`-prefixed hexadecimal number.
pub(crate) fn parse_u64(text: &str) -> Option<u64> {
    text.strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .map_or_else(|| text.parse().ok(), |hex| u64::from_str_radix(hex, 16).ok())
}

/// Parse a whole fakechecks log.
///
/// # Errors
///
/// Returns an error if reading fails or a check line is malformed.
pub fn parse_text_log<R: BufRead>(reader: R) -> Result<Session> {
    let mut checks = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        if let Some(check) = parse_check(&line?, index + 1)? {
            checks.push(check);
        }
    }
    Ok(Session::from_checks(checks))
}

/// Load a session from either a session file or a fakechecks log.
///
/// The format is chosen by the leading magic bytes.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not parse.
pub fn load_any(path: &Path) -> Result<Session> {
    let mut head = Vec::with_capacity(4);
    File::open(path)?.take(4).read_to_end(&mut head)?;
    let session = if is_session_file(&head) {
        read_session(BufReader::new(File::open(path)?))?
    } else {
        parse_text_log(BufReader::new(File::open(path)?))?
    };
    debug!(path = %path.display(), events = session.len(), "input loaded");
    Ok(session)
}
