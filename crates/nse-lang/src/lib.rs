//! Script language: parser, expression evaluator, script loader (C2) and
//! script index loader, per `spec.md` §3-4 and `SPEC_FULL.md` §4.1/§4.1a.

pub mod ast;
pub mod error;
pub mod eval;
pub mod index;
pub mod loader;
pub mod parse_utils;
pub mod parser;
pub mod script;

pub use ast::{CmpOp, Expr, Field, FieldPath};
pub use error::{LoadError, LoadReason, LoadResult};
pub use eval::{eval, EvalContext};
pub use index::{load_index, IndexEntry, ScriptIndex};
pub use loader::load_script;
pub use parser::parse_script_fields;
pub use script::{Script, ScriptRef};
