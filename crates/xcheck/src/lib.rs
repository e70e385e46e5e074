//! xcheck - cross-check comparison oracle.
//!
//! Loads two recorded executions (session files or fakechecks logs), walks
//! them in sequence order and reports the first divergence.
//!
//! ```
//! use xcheck::oracle::{CompareConfig, Verdict, compare};
//! use xcheck_runtime::{EventKind, Session, SiteId};
//!
//! let site = SiteId::from_name("main");
//! let a = Session::from_checks([(site, EventKind::Entry, 0xaa), (site, EventKind::Exit, 0xbb)]);
//! let b = Session::from_checks([(site, EventKind::Entry, 0xaa), (site, EventKind::Exit, 0xcc)]);
//!
//! let verdict = compare(&a, &b, &CompareConfig::default());
//! assert!(matches!(&verdict, Verdict::Diverged(r) if r.first_mismatched_sequence == 1));
//! ```

pub mod batch;
mod error;
pub mod metrics;
pub mod oracle;
pub mod report;
pub mod sitemap;
pub mod textlog;

pub use error::{Error, Result};
pub use oracle::{
    CompareConfig, CompareState, DivergenceKind, DivergenceReport, LiveCheckSink, LiveComparator,
    Verdict, compare,
};
pub use report::ReportFormat;
pub use sitemap::SiteMap;
pub use textlog::load_any;
