use derive_more::From;
use orion_error::{ErrorCode, UvsReason};

/// Failure reasons owned by `nse-core` itself.
///
/// The core crate is pure data model (host/port snapshots, the sanitizer,
/// shared value types) so its own error surface is small: today it only
/// wraps the universal "unclassified" reasons so downstream crates can
/// fold a `CoreError` into their own `StructError<Reason>` via `From`.
#[derive(Debug, Clone, PartialEq, thiserror::Error, From)]
pub enum CoreReason {
    #[error("{0}")]
    Uvs(UvsReason),
}

impl ErrorCode for CoreReason {
    fn error_code(&self) -> i32 {
        match self {
            Self::Uvs(u) => u.error_code(),
        }
    }
}

pub type CoreError = orion_error::StructError<CoreReason>;
pub type CoreResult<T> = Result<T, CoreError>;
