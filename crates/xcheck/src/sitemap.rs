//! Site id to name mapping for readable reports.
//!
//! One entry per line: `<site id> <name>`, where the id is decimal or
//! `0x`-prefixed hex. Blank lines and `#` comments are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rustc_hash::FxHashMap;
use xcheck_runtime::SiteId;

use crate::textlog::parse_u64;
use crate::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct SiteMap {
    names: FxHashMap<SiteId, String>,
}

impl SiteMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns [`Error::SiteMap`] for a malformed line.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let mut map = Self::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line_no = index + 1;
            let (id, name) = line
                .split_once(char::is_whitespace)
                .ok_or_else(|| Error::SiteMap {
                    line: line_no,
                    message: "expected `<site id> <name>`".to_string(),
                })?;
            let id = parse_u64(id).ok_or_else(|| Error::SiteMap {
                line: line_no,
                message: format!("bad site id {id:?}"),
            })?;
            map.insert(SiteId::from_raw(id), name.trim());
        }
        Ok(map)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        Self::parse(BufReader::new(File::open(path)?))
    }

    /// Map from function names, using the same ids instrumented code derives.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut map = Self::new();
        for name in names {
            map.insert(SiteId::from_name(name), name);
        }
        map
    }

    pub fn insert(&mut self, site: SiteId, name: impl Into<String>) {
        self.names.insert(site, name.into());
    }

    #[must_use]
    pub fn name(&self, site: SiteId) -> Option<&str> {
        self.names.get(&site).map(String::as_str)
    }

    /// Name if known, otherwise the hex id.
    #[must_use]
    pub fn label(&self, site: SiteId) -> String {
        self.name(site)
            .map_or_else(|| site.to_string(), str::to_string)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
