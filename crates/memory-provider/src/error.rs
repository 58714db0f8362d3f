//! Result taxonomy shared by every provider operation
//!
//! Uses thiserror for the error enum. Each [`ProviderError`] maps onto exactly
//! one [`ResultCode`], which is what callers switch on when they only care
//! about the outcome category.

use core::fmt;

use thiserror::Error;

use crate::provider::InterfaceVersion;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

// ============================================================================
// Result Codes
// ============================================================================

/// Outcome codes for provider operations
///
/// The known subset is closed. Backend-defined conditions travel as
/// [`ResultCode::Extension`] and are never interpreted by the dispatch layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    /// Operation completed
    Success,
    /// Host-side allocation of bookkeeping structures failed
    ErrorOutOfHostMemory,
    /// Consult the per-thread native error for details
    ErrorMemoryProviderSpecific,
    /// An argument was rejected
    ErrorInvalidArgument,
    /// Pointer, size or requested alignment violates alignment rules
    ErrorInvalidAlignment,
    /// The backend offers no mechanism for the operation
    ErrorNotSupported,
    /// Unclassified failure
    ErrorUnknown,
    /// Backend-defined code
    Extension(i32),
}

impl ResultCode {
    /// First raw value available to backend-defined codes.
    ///
    /// Raw values below this are reserved for the known subset.
    pub const EXTENSION_BASE: i32 = 0x1000;

    const RAW_UNKNOWN: i32 = 0x7fff_fffe;

    /// Raw integer form of the code
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::ErrorOutOfHostMemory => 1,
            Self::ErrorMemoryProviderSpecific => 3,
            Self::ErrorInvalidArgument => 4,
            Self::ErrorInvalidAlignment => 5,
            Self::ErrorNotSupported => 6,
            Self::ErrorUnknown => Self::RAW_UNKNOWN,
            Self::Extension(raw) => raw,
        }
    }

    /// Decode a raw integer; anything outside the known subset is an extension
    ///
    /// Raw values of the known subset always decode to their known code, so
    /// `Extension(5)` round-trips as [`ResultCode::ErrorInvalidAlignment`].
    /// Backend-defined codes belong at or above [`Self::EXTENSION_BASE`].
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::Success,
            1 => Self::ErrorOutOfHostMemory,
            3 => Self::ErrorMemoryProviderSpecific,
            4 => Self::ErrorInvalidArgument,
            5 => Self::ErrorInvalidAlignment,
            6 => Self::ErrorNotSupported,
            Self::RAW_UNKNOWN => Self::ErrorUnknown,
            other => Self::Extension(other),
        }
    }

    /// Code of an operation result
    pub fn of<T>(result: &ProviderResult<T>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(error) => error.code(),
        }
    }

    /// Whether this is [`ResultCode::Success`]
    #[inline]
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Stable string form for logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "PROVIDER:SUCCESS",
            Self::ErrorOutOfHostMemory => "PROVIDER:OUT_OF_HOST_MEMORY",
            Self::ErrorMemoryProviderSpecific => "PROVIDER:SPECIFIC",
            Self::ErrorInvalidArgument => "PROVIDER:INVALID_ARGUMENT",
            Self::ErrorInvalidAlignment => "PROVIDER:INVALID_ALIGNMENT",
            Self::ErrorNotSupported => "PROVIDER:NOT_SUPPORTED",
            Self::ErrorUnknown => "PROVIDER:UNKNOWN",
            Self::Extension(_) => "PROVIDER:EXTENSION",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extension(raw) => write!(f, "{}({raw:#x})", self.as_str()),
            _ => f.write_str(self.as_str()),
        }
    }
}

// ============================================================================
// Provider Errors
// ============================================================================

/// Failure of a provider operation
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("out of host memory")]
    OutOfHostMemory,

    #[error("invalid alignment: {alignment}")]
    InvalidAlignment { alignment: usize },

    #[error("operation not supported: {operation}")]
    NotSupported { operation: &'static str },

    /// Sentinel: details live in the calling thread's native error slot
    #[error("memory provider specific error")]
    ProviderSpecific,

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("interface version mismatch: expected {expected}, provider reports {found}")]
    VersionMismatch {
        expected: InterfaceVersion,
        found: InterfaceVersion,
    },

    #[error("unknown provider error")]
    Unknown,

    #[error("backend error code {code:#x}")]
    Extension { code: i32 },
}

impl ProviderError {
    /// Result code for categorization
    #[must_use]
    pub const fn code(&self) -> ResultCode {
        match self {
            Self::OutOfHostMemory => ResultCode::ErrorOutOfHostMemory,
            Self::InvalidAlignment { .. } => ResultCode::ErrorInvalidAlignment,
            Self::NotSupported { .. } => ResultCode::ErrorNotSupported,
            Self::ProviderSpecific => ResultCode::ErrorMemoryProviderSpecific,
            Self::InvalidArgument { .. } | Self::VersionMismatch { .. } => {
                ResultCode::ErrorInvalidArgument
            }
            Self::Unknown => ResultCode::ErrorUnknown,
            Self::Extension { code } => ResultCode::Extension(*code),
        }
    }

    /// Check if retrying the same request may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::OutOfHostMemory)
    }

    /// Create invalid alignment error
    pub const fn invalid_alignment(alignment: usize) -> Self {
        Self::InvalidAlignment { alignment }
    }

    /// Create not supported error
    pub const fn not_supported(operation: &'static str) -> Self {
        Self::NotSupported { operation }
    }

    /// Create invalid argument error
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create a backend-defined error
    ///
    /// `code` must be at or above [`ResultCode::EXTENSION_BASE`]; lower
    /// values alias the known subset once converted to raw form. Checked in
    /// debug builds.
    pub const fn extension(code: i32) -> Self {
        debug_assert!(
            code >= ResultCode::EXTENSION_BASE,
            "extension codes start at ResultCode::EXTENSION_BASE"
        );
        Self::Extension { code }
    }
}

impl From<ProviderError> for ResultCode {
    fn from(error: ProviderError) -> Self {
        error.code()
    }
}
