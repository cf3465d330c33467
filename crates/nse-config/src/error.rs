use derive_more::From;
use orion_error::{ErrorCode, UvsReason};

/// Configuration errors (`spec.md` §7 "Configuration error" — fatal to the
/// scan).
#[derive(Debug, Clone, PartialEq, thiserror::Error, From)]
pub enum ConfigReason {
    #[error("scan config parse error")]
    Parse,
    #[error("scan config validation error")]
    Validation,
    #[error("reserved rule used explicitly")]
    ReservedRule,
    #[error("malformed --script-args")]
    ScriptArgs,
    #[error("unknown rule")]
    UnknownRule,
    #[error("script index missing or corrupt")]
    Index,
    #[error("{0}")]
    Uvs(UvsReason),
}

impl ErrorCode for ConfigReason {
    fn error_code(&self) -> i32 {
        match self {
            Self::Parse => 4001,
            Self::Validation => 4002,
            Self::ReservedRule => 4003,
            Self::ScriptArgs => 4004,
            Self::UnknownRule => 4005,
            Self::Index => 4006,
            Self::Uvs(u) => u.error_code(),
        }
    }
}

pub type ConfigError = orion_error::StructError<ConfigReason>;
pub type ConfigResult<T> = Result<T, ConfigError>;
