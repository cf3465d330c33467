use derive_more::From;
use orion_error::{ErrorCode, UvsReason};

/// Script load errors (`spec.md` §7 "Load error" / §4.1 validation). Each
/// variant carries enough detail (via `StructError::with_detail`, see
/// `loader.rs`) to name the offending file and field, as the spec
/// requires ("a load-time error naming the file and the offending
/// field").
#[derive(Debug, Clone, PartialEq, thiserror::Error, From)]
pub enum LoadReason {
    #[error("script parse error")]
    Parse,
    #[error("script validation error")]
    Validation,
    #[error("{0}")]
    Uvs(UvsReason),
}

impl ErrorCode for LoadReason {
    fn error_code(&self) -> i32 {
        match self {
            Self::Parse => 3001,
            Self::Validation => 3002,
            Self::Uvs(u) => u.error_code(),
        }
    }
}

pub type LoadError = orion_error::StructError<LoadReason>;
pub type LoadResult<T> = Result<T, LoadError>;
