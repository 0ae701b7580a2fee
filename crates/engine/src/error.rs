//! Engine error kinds and their numeric status codes.

use core::{
    error::Error,
    fmt::{self, Display, Formatter},
};
use std::io;

/// Numeric status reported across the host boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCode {
    None = 0x2000_0000,
    InvalidEngineHandle = 0xE000_0001,
    CreateThreadFailed = 0xE000_0002,
    EngineAllocationFailed = 0xE000_0003,
    EngineAlreadyAllocated = 0xE000_0004,
    InvalidHandle = 0xE000_0005,
    ReferenceIncrementFailed = 0xE000_0006,
    ContextAllocationFailed = 0xE000_0007,
}

impl ErrorCode {
    #[inline]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::None)
    }
}

impl<T> From<&Result<T, EngineError>> for ErrorCode {
    fn from(res: &Result<T, EngineError>) -> Self {
        match res {
            Ok(_) => ErrorCode::None,
            Err(err) => err.code(),
        }
    }
}

/// Error returned by engine lifecycle operations.
#[derive(Debug)]
pub enum EngineError {
    /// An engine is already registered for the host module.
    AlreadyAllocated,

    /// The host module could not be resolved and pinned.
    ReferenceIncrementFailed(anyhow::Error),

    /// Custom context memory could not be allocated.
    ContextAllocationFailed,

    /// No engine is registered for the host module.
    InvalidHandle,

    /// A raw engine handle does not refer to a registered engine.
    InvalidEngineHandle,

    /// The worker thread could not be spawned.
    CreateThreadFailed(io::Error),
}

impl EngineError {
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::AlreadyAllocated => ErrorCode::EngineAlreadyAllocated,
            Self::ReferenceIncrementFailed(_) => ErrorCode::ReferenceIncrementFailed,
            Self::ContextAllocationFailed => ErrorCode::ContextAllocationFailed,
            Self::InvalidHandle => ErrorCode::InvalidHandle,
            Self::InvalidEngineHandle => ErrorCode::InvalidEngineHandle,
            Self::CreateThreadFailed(_) => ErrorCode::CreateThreadFailed,
        }
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyAllocated => write!(f, "engine already allocated for host module"),
            Self::ReferenceIncrementFailed(err) => {
                write!(f, "failed to pin host module: {err}")
            }
            Self::ContextAllocationFailed => write!(f, "custom context allocation failed"),
            Self::InvalidHandle => write!(f, "host module has no engine"),
            Self::InvalidEngineHandle => write!(f, "invalid engine handle"),
            Self::CreateThreadFailed(err) => write!(f, "failed to create worker thread: {err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ReferenceIncrementFailed(err) => Some(&**err),
            Self::CreateThreadFailed(err) => Some(err),
            _ => None,
        }
    }
}
