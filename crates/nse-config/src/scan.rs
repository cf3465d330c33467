//! Scan configuration: the knobs the host program (out of scope, `spec.md`
//! §1) would otherwise pass piecemeal through `api`/CLI flags, gathered
//! here into one TOML-loadable struct, with a raw/resolved split so
//! defaults and validation stay out of the wire format.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use orion_error::prelude::*;
use serde::Deserialize;

use crate::error::{ConfigReason, ConfigResult};

#[derive(Debug, Deserialize)]
struct ScanConfigRaw {
    script_dbpath: PathBuf,
    #[serde(default)]
    default: bool,
    #[serde(default)]
    scriptversion: bool,
    #[serde(default)]
    scriptargs: String,
    #[serde(default)]
    verbosity: i32,
    #[serde(default)]
    debugging: i32,
    #[serde(default)]
    rules: Vec<String>,
    #[serde(default = "default_host_timeout_ms")]
    host_timeout_ms: u64,
    #[serde(default = "default_tick_budget_ms")]
    tick_budget_ms: u64,
}

/// Per-host timeout default (`spec.md` §4.5/§4.6 "host timeout"). Chosen to
/// match the scale of the upstream scanner's own default script timeout.
fn default_host_timeout_ms() -> u64 {
    30_000
}

/// Outer-loop tick budget default (`spec.md` §4.5 step 1: "a short budget
/// (≈50 ms)").
fn default_tick_budget_ms() -> u64 {
    50
}

/// Resolved, validated scan configuration (`spec.md` §6 `api` fields plus
/// the CLI-surface rule list).
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub script_dbpath: PathBuf,
    pub default: bool,
    pub scriptversion: bool,
    pub scriptargs: String,
    pub verbosity: i32,
    pub debugging: i32,
    pub rules: Vec<String>,
    /// Per-host timeout, starting clock reset on every active resume
    /// (`spec.md` §4.5/§4.6).
    pub host_timeout_ms: u64,
    /// Outer-loop I/O pump budget (`spec.md` §4.5 step 1).
    pub tick_budget_ms: u64,
}

impl ScanConfig {
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .owe(ConfigReason::Parse)
            .position(path.display().to_string())?;
        content.parse()
    }
}

impl FromStr for ScanConfig {
    type Err = orion_error::StructError<ConfigReason>;

    fn from_str(toml_str: &str) -> ConfigResult<Self> {
        let raw: ScanConfigRaw = toml::from_str(toml_str).owe(ConfigReason::Parse)?;

        if raw.script_dbpath.as_os_str().is_empty() {
            return StructError::from(ConfigReason::Validation)
                .with_detail("script_dbpath must not be empty")
                .err();
        }
        if raw.verbosity < 0 {
            return StructError::from(ConfigReason::Validation)
                .with_detail("verbosity must be >= 0")
                .err();
        }
        if raw.debugging < 0 {
            return StructError::from(ConfigReason::Validation)
                .with_detail("debugging must be >= 0")
                .err();
        }
        if raw.host_timeout_ms == 0 {
            return StructError::from(ConfigReason::Validation)
                .with_detail("host_timeout_ms must be > 0")
                .err();
        }
        if raw.tick_budget_ms == 0 {
            return StructError::from(ConfigReason::Validation)
                .with_detail("tick_budget_ms must be > 0")
                .err();
        }

        Ok(ScanConfig {
            script_dbpath: raw.script_dbpath,
            default: raw.default,
            scriptversion: raw.scriptversion,
            scriptargs: raw.scriptargs,
            verbosity: raw.verbosity,
            debugging: raw.debugging,
            rules: raw.rules,
            host_timeout_ms: raw.host_timeout_ms,
            tick_budget_ms: raw.tick_budget_ms,
        })
    }
}
