//! Cross-check runtime.
//!
//! Instrumented programs record [`Event`]s into a [`SessionHandle`] from any
//! number of threads. Ending the session yields a gapless, sequence-ordered
//! [`Session`] that can be written with the [`codec`] and compared offline.
//!
//! ```
//! use xcheck_runtime::{EventKind, RuntimeConfig, SiteId, begin_session};
//!
//! let handle = begin_session(RuntimeConfig::default().with_shards(2))?;
//! let site = SiteId::from_name("main");
//! handle.record(site, EventKind::Entry, 0xaa)?;
//! handle.record(site, EventKind::Exit, 0xbb)?;
//!
//! let session = handle.end_session()?;
//! assert_eq!(session.len(), 2);
//! # Ok::<(), xcheck_runtime::RuntimeError>(())
//! ```

pub mod codec;
mod config;
mod error;
mod event;
mod fakechecks;
pub mod ffi;
mod session;
mod sink;

pub use config::{
    DEFAULT_SHARD_CAPACITY, ENV_CAPACITY, ENV_COMPRESS, ENV_FAKE_OUTPUT, ENV_OUTPUT, ENV_SHARDS,
    RuntimeConfig,
};
pub use error::{CodecError, Result, RuntimeError};
pub use event::{Event, EventKind, SiteId};
pub use fakechecks::{FakeChecks, format_check};
pub use session::{Session, SessionHandle, begin_session};
pub use sink::{CrossCheckSink, NoopSink};
pub use xcheck_hash::{CrossCheckHash, checksum, hash_bytes};
