//! Configuration surface: scan configuration (ambient CLI/TOML layer),
//! reserved-rule checking, and the Argument Preloader (C8, `spec.md`
//! §4.8).

pub mod error;
pub mod rules;
pub mod scan;
pub mod scriptargs;

pub use error::{ConfigError, ConfigReason, ConfigResult};
pub use rules::{is_reserved, reject_reserved, ALL_RULE, RESERVED_RULES};
pub use scan::ScanConfig;
pub use scriptargs::{parse_script_args, ScriptArgs};
