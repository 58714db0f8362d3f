//! The provider operations table
//!
//! A backend implements [`MemoryProvider`] once. The implementing type is the
//! backend's private state: [`MemoryProvider::initialize`] produces it, every
//! dispatched operation borrows it, and [`MemoryProvider::finalize`] consumes
//! it. Callers never invoke these methods directly; they go through a
//! [`MemoryProviderHandle`](crate::MemoryProviderHandle).

use core::fmt;
use core::ptr::NonNull;
use std::borrow::Cow;

use crate::error::ProviderResult;

/// Interface version a provider was written against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceVersion {
    major: u16,
    minor: u16,
}

impl InterfaceVersion {
    /// Create a version from its parts
    #[inline]
    #[must_use]
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    /// Major component
    #[inline]
    #[must_use]
    pub const fn major(self) -> u16 {
        self.major
    }

    /// Minor component
    #[inline]
    #[must_use]
    pub const fn minor(self) -> u16 {
        self.minor
    }

    /// Packed `(major << 16) | minor` form
    #[inline]
    #[must_use]
    pub const fn packed(self) -> u32 {
        ((self.major as u32) << 16) | self.minor as u32
    }

    /// Inverse of [`InterfaceVersion::packed`]
    #[inline]
    #[must_use]
    pub const fn from_packed(packed: u32) -> Self {
        Self {
            major: (packed >> 16) as u16,
            minor: (packed & 0xffff) as u16,
        }
    }
}

impl fmt::Display for InterfaceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Interface version this dispatch layer was compiled with
pub const INTERFACE_VERSION: InterfaceVersion = InterfaceVersion::new(1, 0);

/// Provider-specific error detail (message + native code)
///
/// Retrieved out of band after an operation returned
/// [`ProviderError::ProviderSpecific`](crate::ProviderError::ProviderSpecific).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeError {
    message: Cow<'static, str>,
    code: i32,
}

impl NativeError {
    /// The empty value a thread sees before any provider-specific failure
    pub const EMPTY: Self = Self {
        message: Cow::Borrowed(""),
        code: 0,
    };

    /// Create a native error
    pub fn new(message: impl Into<Cow<'static, str>>, code: i32) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }

    /// Backend message
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Backend native code (errno, driver status, ...)
    #[inline]
    pub const fn code(&self) -> i32 {
        self.code
    }

    /// Whether this is the empty value
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.message.is_empty() && self.code == 0
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (native code {})", self.message, self.code)
    }
}

/// Capability set every memory backend implements
///
/// # Contract
///
/// - `VERSION` must name the interface the backend was written against;
///   handles refuse providers whose version differs from
///   [`INTERFACE_VERSION`].
/// - `finalize` has no error channel. A backend must already be quiescent
///   when it runs; allocations still outstanding become invalid.
/// - Before returning [`ProviderError::ProviderSpecific`] from any operation,
///   a backend must make the detail available through
///   [`MemoryProvider::last_native_error`] on the same thread.
/// - Synchronization of the backend's own state is the backend's job. The
///   handle is `Sync` exactly when the backend is.
///
/// [`ProviderError::ProviderSpecific`]: crate::ProviderError::ProviderSpecific
pub trait MemoryProvider: Sized {
    /// Backend construction parameters
    type Params;

    /// Interface version the backend implements
    const VERSION: InterfaceVersion;

    /// Construct the backend state
    fn initialize(params: Self::Params) -> ProviderResult<Self>;

    /// Tear the backend down
    fn finalize(self) {}

    /// Allocate `size` bytes aligned to at least `alignment`
    ///
    /// An `alignment` of zero selects the backend default.
    fn alloc(&self, size: usize, alignment: usize) -> ProviderResult<NonNull<u8>>;

    /// Return memory to the backend
    ///
    /// # Safety
    ///
    /// - `ptr` must come from [`MemoryProvider::alloc`] on this instance
    /// - `size` must equal the size passed to that `alloc`
    /// - the memory must not be used afterwards
    unsafe fn free(&self, ptr: NonNull<u8>, size: usize) -> ProviderResult<()>;

    /// Detail of the last provider-specific failure on the calling thread
    fn last_native_error(&self) -> NativeError;

    /// Advisory page size for allocations of `size` bytes
    fn recommended_page_size(&self, size: usize) -> ProviderResult<usize>;

    /// Minimum page size of the mapping containing `ptr`, or of the provider
    /// when `ptr` is `None`
    ///
    /// Must succeed with `None` even before anything was allocated.
    fn min_page_size(&self, ptr: Option<NonNull<u8>>) -> ProviderResult<usize>;

    /// Ask the backend to discard physical pages of a range, eventually
    ///
    /// Completion is not guaranteed on return. The range stays valid but its
    /// contents become unspecified.
    ///
    /// # Safety
    ///
    /// `ptr..ptr + size` must lie inside a live allocation of this instance
    /// and the caller must not rely on its contents afterwards.
    unsafe fn purge_lazy(&self, ptr: NonNull<u8>, size: usize) -> ProviderResult<()>;

    /// Discard physical pages of a range now; next access reads zeros
    ///
    /// # Safety
    ///
    /// Same requirements as [`MemoryProvider::purge_lazy`].
    unsafe fn purge_force(&self, ptr: NonNull<u8>, size: usize) -> ProviderResult<()>;

    /// Human-readable provider name
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }
}
