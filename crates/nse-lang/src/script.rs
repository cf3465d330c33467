use std::path::PathBuf;
use std::sync::Arc;

use nse_core::Runlevel;

use crate::ast::Expr;

/// An immutable, load-once script descriptor (`spec.md` §3 "Script").
///
/// Shared read-only by every `Task` constructed from it (`Arc`), per the
/// Ownership note in `spec.md` §3: "a `Script` is shared (read-only) by
/// all its Tasks."
#[derive(Debug)]
pub struct Script {
    /// Absolute path to the script file.
    pub filename: PathBuf,
    pub basename: String,
    pub short_basename: String,
    pub id: String,
    pub categories: Vec<String>,
    pub author: Option<String>,
    pub license: Option<String>,
    pub description: String,
    pub runlevel: Runlevel,
    pub hostrule: Option<Expr>,
    pub portrule: Option<Expr>,
    pub action: Expr,
}

pub type ScriptRef = Arc<Script>;

impl Script {
    pub fn has_hostrule(&self) -> bool {
        self.hostrule.is_some()
    }

    pub fn has_portrule(&self) -> bool {
        self.portrule.is_some()
    }
}
