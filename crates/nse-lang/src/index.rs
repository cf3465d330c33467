//! Script index file support (`spec.md` §6 "Script index file").
//!
//! The index is produced by an external tool (out of scope, `spec.md` §1)
//! and consumed here as a flat sequence of `category -> filename` records,
//! stored as TOML — the same format `nse-config` uses for the scan
//! configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LoadReason, LoadResult};

/// One row of the script index: `spec.md` §6 `Entry{ category, filename }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub category: String,
    pub filename: String,
}

/// The full parsed index: an ordered sequence of entries. Order is
/// preserved because it determines result ordering per `spec.md` §4.2
/// step 7 ("order reflects index traversal then by-name resolution").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptIndex {
    #[serde(default)]
    pub entries: Vec<IndexEntry>,
}

impl ScriptIndex {
    /// All filenames indexed under a given category, in index order.
    pub fn filenames_in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.category == category)
            .map(|e| e.filename.as_str())
    }

    pub fn contains_category(&self, category: &str) -> bool {
        self.entries.iter().any(|e| e.category == category)
    }
}

/// Load a script index file. `path` is `api.script_dbpath` (`spec.md` §6).
///
/// Missing/corrupt index is a load error here; the caller (Selector,
/// `nse-runtime`) is responsible for the rebuild-once-then-retry policy
/// described in `spec.md` §4.2.
pub fn load_index(path: &Path) -> LoadResult<ScriptIndex> {
    use orion_error::prelude::*;

    let raw = std::fs::read_to_string(path)
        .owe(LoadReason::Parse)
        .position(path.display().to_string())?;

    toml::from_str(&raw)
        .owe(LoadReason::Parse)
        .position(path.display().to_string())
}
