use derive_more::From;
use orion_error::{ErrorCode, UvsReason};

use nse_config::ConfigReason;
use nse_core::CoreReason;
use nse_lang::LoadReason;

/// Runtime errors (`spec.md` §7). Only the *configuration-fatal* half of
/// the taxonomy reaches here as a `Result::Err` — task errors (predicate
/// or action failures) are logged and swallowed by the Scheduler per
/// `spec.md` §4.5/§7, never propagated.
#[derive(Debug, Clone, PartialEq, thiserror::Error, From)]
pub enum RuntimeReason {
    #[error("selector: reserved or unknown rule")]
    Select,
    #[error("selector: script index missing or corrupt")]
    Index,
    #[error("malformed --script-args")]
    ScriptArgs,
    #[error("{0}")]
    Config(ConfigReason),
    #[error("{0}")]
    Load(LoadReason),
    #[error("{0}")]
    Core(CoreReason),
    #[error("{0}")]
    Uvs(UvsReason),
}

impl ErrorCode for RuntimeReason {
    fn error_code(&self) -> i32 {
        match self {
            Self::Select => 5001,
            Self::Index => 5002,
            Self::ScriptArgs => 5003,
            Self::Config(c) => c.error_code(),
            Self::Load(l) => l.error_code(),
            Self::Core(c) => c.error_code(),
            Self::Uvs(u) => u.error_code(),
        }
    }
}

pub type RuntimeError = orion_error::StructError<RuntimeReason>;
pub type RuntimeResult<T> = Result<T, RuntimeError>;
