//! Dispatch of provider operations
//!
//! Every public operation forwards to the backend held by the handle and
//! observes the result. On any non-success the calling thread's diagnostic
//! state records the handle id; on a provider-specific failure the backend's
//! native error is copied into the thread's slot before the call returns.
//! Errors are returned exactly as the backend produced them.

use core::ptr::NonNull;

#[cfg(feature = "logging")]
use tracing::{debug, warn};

use crate::diagnostics;
use crate::error::{ProviderError, ProviderResult};
use crate::handle::MemoryProviderHandle;
use crate::page;
use crate::provider::{MemoryProvider, NativeError};
use crate::registry::ProviderId;

impl<P: MemoryProvider> MemoryProviderHandle<P> {
    /// Allocate `size` bytes aligned to at least `alignment`
    ///
    /// An `alignment` of zero selects the backend default.
    pub fn alloc(&self, size: usize, alignment: usize) -> ProviderResult<NonNull<u8>> {
        let result = self.state.alloc(size, alignment);
        if let (Ok(_), Some(stats)) = (&result, &self.stats) {
            stats.record_alloc(size);
        }
        self.observe("alloc", result)
    }

    /// Return memory to the provider
    ///
    /// # Safety
    ///
    /// - `ptr` must come from [`alloc`](Self::alloc) on this handle
    /// - `size` must equal the size requested from that `alloc`
    /// - the memory must not be used afterwards
    pub unsafe fn free(&self, ptr: NonNull<u8>, size: usize) -> ProviderResult<()> {
        // SAFETY: forwarded caller contract.
        let result = unsafe { self.state.free(ptr, size) };
        if let (Ok(()), Some(stats)) = (&result, &self.stats) {
            stats.record_free(size);
        }
        self.observe("free", result)
    }

    /// Native error of the last provider-specific failure on this thread
    ///
    /// Reads the calling thread's diagnostic slot, which is filled by whichever
    /// provider failed last, not necessarily this one.
    pub fn get_last_native_error(&self) -> NativeError {
        diagnostics::last_native_error()
    }

    /// Advisory page size for allocations of `size` bytes
    pub fn recommended_page_size(&self, size: usize) -> ProviderResult<usize> {
        let result = self.state.recommended_page_size(size);
        self.observe("recommended_page_size", result)
    }

    /// Minimum page size of the mapping containing `ptr`, or of the provider
    pub fn min_page_size(&self, ptr: Option<NonNull<u8>>) -> ProviderResult<usize> {
        let result = self.state.min_page_size(ptr);
        self.observe("min_page_size", result)
    }

    /// Discard physical backing of a range, possibly later
    ///
    /// Contents of the range are unspecified afterwards; they are not
    /// guaranteed to be zero. Fails with
    /// [`ProviderError::InvalidAlignment`] for a misaligned range and with
    /// [`ProviderError::NotSupported`] when the backend cannot purge.
    ///
    /// # Safety
    ///
    /// `ptr..ptr + size` must lie inside a live allocation of this handle and
    /// the caller must not rely on its contents afterwards.
    pub unsafe fn purge_lazy(&self, ptr: NonNull<u8>, size: usize) -> ProviderResult<()> {
        let result = self.check_purge_range(ptr, size).and_then(|()| {
            // SAFETY: forwarded caller contract.
            unsafe { self.state.purge_lazy(ptr, size) }
        });
        if let (Ok(()), Some(stats)) = (&result, &self.stats) {
            stats.record_purge(false);
        }
        self.observe("purge_lazy", result)
    }

    /// Discard physical backing of a range now
    ///
    /// On success the next read of any byte in the range observes zero.
    /// Failure modes match [`purge_lazy`](Self::purge_lazy).
    ///
    /// # Safety
    ///
    /// Same requirements as [`purge_lazy`](Self::purge_lazy).
    pub unsafe fn purge_force(&self, ptr: NonNull<u8>, size: usize) -> ProviderResult<()> {
        let result = self.check_purge_range(ptr, size).and_then(|()| {
            // SAFETY: forwarded caller contract.
            unsafe { self.state.purge_force(ptr, size) }
        });
        if let (Ok(()), Some(stats)) = (&result, &self.stats) {
            stats.record_purge(true);
        }
        self.observe("purge_force", result)
    }

    /// Backend-reported provider name
    pub fn name(&self) -> &str {
        self.state.name()
    }

    /// Misaligned ranges fail here so they report `InvalidAlignment` even on
    /// backends that cannot purge at all. Granularity comes from the mapping
    /// containing `ptr`, or from the provider minimum when the backend cannot
    /// answer per mapping.
    fn check_purge_range(&self, ptr: NonNull<u8>, size: usize) -> ProviderResult<()> {
        if !self.config.validate_purge_alignment {
            return Ok(());
        }
        let page_size = match self.state.min_page_size(Some(ptr)) {
            Ok(page_size) if page_size > 0 => Some(page_size),
            _ => self
                .state
                .min_page_size(None)
                .ok()
                .filter(|&page_size| page_size > 0),
        };
        match page_size {
            Some(page_size) => page::check_range_aligned(ptr, size, page_size),
            // No usable granularity at all: the backend gets the range.
            None => Ok(()),
        }
    }

    fn observe<T>(&self, operation: &'static str, result: ProviderResult<T>) -> ProviderResult<T> {
        if let Err(error) = &result {
            self.record_failure(operation, error);
        }
        result
    }

    fn record_failure(&self, operation: &'static str, error: &ProviderError) {
        if matches!(error, ProviderError::ProviderSpecific) {
            diagnostics::record_native_error(self.state.last_native_error());
        }
        diagnostics::record_failure(self.id);

        if let Some(stats) = &self.stats {
            stats.record_failure();
        }

        #[cfg(feature = "logging")]
        if self.config.log_failures {
            if matches!(error, ProviderError::OutOfHostMemory) {
                warn!(provider = %self.id, name = self.label(), operation, %error, "memory provider operation failed");
            } else {
                debug!(provider = %self.id, name = self.label(), operation, %error, "memory provider operation failed");
            }
        }
        #[cfg(not(feature = "logging"))]
        let _ = operation;
    }
}

/// Object-safe dispatch surface
///
/// Lets a consumer hold handles of different backends side by side, e.g. as
/// `Vec<Box<dyn DynMemoryProvider>>`. Implemented for every handle whose
/// backend is `Send + Sync`.
pub trait DynMemoryProvider: Send + Sync {
    /// Handle id
    fn id(&self) -> ProviderId;

    /// See [`MemoryProviderHandle::alloc`]
    fn alloc(&self, size: usize, alignment: usize) -> ProviderResult<NonNull<u8>>;

    /// See [`MemoryProviderHandle::free`]
    ///
    /// # Safety
    ///
    /// Same requirements as [`MemoryProviderHandle::free`].
    unsafe fn free(&self, ptr: NonNull<u8>, size: usize) -> ProviderResult<()>;

    /// See [`MemoryProviderHandle::get_last_native_error`]
    fn get_last_native_error(&self) -> NativeError;

    /// See [`MemoryProviderHandle::recommended_page_size`]
    fn recommended_page_size(&self, size: usize) -> ProviderResult<usize>;

    /// See [`MemoryProviderHandle::min_page_size`]
    fn min_page_size(&self, ptr: Option<NonNull<u8>>) -> ProviderResult<usize>;

    /// See [`MemoryProviderHandle::purge_lazy`]
    ///
    /// # Safety
    ///
    /// Same requirements as [`MemoryProviderHandle::purge_lazy`].
    unsafe fn purge_lazy(&self, ptr: NonNull<u8>, size: usize) -> ProviderResult<()>;

    /// See [`MemoryProviderHandle::purge_force`]
    ///
    /// # Safety
    ///
    /// Same requirements as [`MemoryProviderHandle::purge_force`].
    unsafe fn purge_force(&self, ptr: NonNull<u8>, size: usize) -> ProviderResult<()>;

    /// See [`MemoryProviderHandle::name`]
    fn name(&self) -> &str;
}

impl<P> DynMemoryProvider for MemoryProviderHandle<P>
where
    P: MemoryProvider + Send + Sync,
{
    fn id(&self) -> ProviderId {
        Self::id(self)
    }

    fn alloc(&self, size: usize, alignment: usize) -> ProviderResult<NonNull<u8>> {
        Self::alloc(self, size, alignment)
    }

    unsafe fn free(&self, ptr: NonNull<u8>, size: usize) -> ProviderResult<()> {
        // SAFETY: forwarded caller contract.
        unsafe { Self::free(self, ptr, size) }
    }

    fn get_last_native_error(&self) -> NativeError {
        Self::get_last_native_error(self)
    }

    fn recommended_page_size(&self, size: usize) -> ProviderResult<usize> {
        Self::recommended_page_size(self, size)
    }

    fn min_page_size(&self, ptr: Option<NonNull<u8>>) -> ProviderResult<usize> {
        Self::min_page_size(self, ptr)
    }

    unsafe fn purge_lazy(&self, ptr: NonNull<u8>, size: usize) -> ProviderResult<()> {
        // SAFETY: forwarded caller contract.
        unsafe { Self::purge_lazy(self, ptr, size) }
    }

    unsafe fn purge_force(&self, ptr: NonNull<u8>, size: usize) -> ProviderResult<()> {
        // SAFETY: forwarded caller contract.
        unsafe { Self::purge_force(self, ptr, size) }
    }

    fn name(&self) -> &str {
        Self::name(self)
    }
}
