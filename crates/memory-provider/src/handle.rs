//! Provider handle lifecycle
//!
//! # Safety
//!
//! The backend state is held in `ManuallyDrop` so that `Drop` can move it
//! out and hand it to [`MemoryProvider::finalize`] by value:
//! - `state` is initialized in `create_with_config` and taken only in `drop`
//! - nothing reads `state` after `drop` takes it
//! - the handle is not `Clone`, so exactly one handle owns a given state

use core::mem::ManuallyDrop;

#[cfg(feature = "logging")]
use tracing::{debug, error};

use crate::config::ProviderConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::provider::{INTERFACE_VERSION, MemoryProvider};
use crate::registry::{ProviderId, ProviderInfo, ProviderRegistry};
use crate::stats::{DispatchStats, StatsSnapshot};

/// Owned handle to one live provider instance
///
/// Created with [`MemoryProviderHandle::create`], torn down with
/// [`MemoryProviderHandle::destroy`] or by dropping it. All dispatched
/// operations take `&self`; the handle is `Send`/`Sync` exactly when the
/// backend is.
///
/// # Example
///
/// ```rust,ignore
/// use nebula_memory_provider::MemoryProviderHandle;
///
/// let provider = MemoryProviderHandle::<OsProvider>::create(OsParams::default())?;
/// let ptr = provider.alloc(64 * 1024, 0)?;
/// unsafe { provider.free(ptr, 64 * 1024)? };
/// provider.destroy();
/// ```
pub struct MemoryProviderHandle<P: MemoryProvider> {
    pub(crate) state: ManuallyDrop<P>,
    pub(crate) id: ProviderId,
    pub(crate) config: ProviderConfig,
    pub(crate) stats: Option<DispatchStats>,
}

impl<P: MemoryProvider> MemoryProviderHandle<P> {
    /// Create a provider with the default configuration
    pub fn create(params: P::Params) -> ProviderResult<Self> {
        Self::create_with_config(params, ProviderConfig::default())
    }

    /// Create a provider
    ///
    /// Fails with [`ProviderError::VersionMismatch`] when the backend was
    /// written against another interface version; the backend is not
    /// constructed in that case. Backend construction errors are returned
    /// unchanged and leave nothing registered.
    pub fn create_with_config(params: P::Params, config: ProviderConfig) -> ProviderResult<Self> {
        check_version::<P>()?;

        let state = P::initialize(params)?;
        let handle = Self {
            state: ManuallyDrop::new(state),
            id: ProviderId::next(),
            stats: config.track_stats.then(DispatchStats::default),
            config,
        };

        ProviderRegistry::global().register(ProviderInfo {
            id: handle.id,
            name: handle.label().to_string(),
            backend: core::any::type_name::<P>(),
            version: P::VERSION,
        });

        #[cfg(feature = "logging")]
        debug!(
            provider = %handle.id,
            name = handle.label(),
            version = %P::VERSION,
            "memory provider created"
        );

        Ok(handle)
    }

    /// Deregister the handle and finalize the backend
    ///
    /// Allocations still outstanding from this provider become invalid.
    pub fn destroy(self) {
        drop(self);
    }

    /// Handle id, as reported by
    /// [`last_failed_provider`](crate::diagnostics::last_failed_provider)
    #[inline]
    pub fn id(&self) -> ProviderId {
        self.id
    }

    /// Backend state
    #[inline]
    pub fn state(&self) -> &P {
        &self.state
    }

    /// Mutable backend state
    #[inline]
    pub fn state_mut(&mut self) -> &mut P {
        &mut self.state
    }

    /// Handle configuration
    #[inline]
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Dispatch statistics, if tracking is enabled
    pub fn stats(&self) -> Option<StatsSnapshot> {
        self.stats.as_ref().map(DispatchStats::snapshot)
    }

    /// Configured label, falling back to the backend name
    pub fn label(&self) -> &str {
        self.config
            .label
            .as_deref()
            .unwrap_or_else(|| self.state.name())
    }
}

impl<P: MemoryProvider> Drop for MemoryProviderHandle<P> {
    fn drop(&mut self) {
        #[cfg(feature = "logging")]
        debug!(provider = %self.id, name = self.label(), "destroying memory provider");

        // Deregister first: the id must stop resolving even if finalize panics.
        ProviderRegistry::global().deregister(self.id);

        // SAFETY: `state` was initialized at creation and is taken exactly
        // once, here. The handle is never used again after drop.
        let state = unsafe { ManuallyDrop::take(&mut self.state) };
        state.finalize();
    }
}

impl<P: MemoryProvider> core::fmt::Debug for MemoryProviderHandle<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemoryProviderHandle")
            .field("id", &self.id)
            .field("name", &self.label())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn check_version<P: MemoryProvider>() -> ProviderResult<()> {
    if P::VERSION == INTERFACE_VERSION {
        return Ok(());
    }

    #[cfg(feature = "logging")]
    error!(
        backend = core::any::type_name::<P>(),
        expected = %INTERFACE_VERSION,
        found = %P::VERSION,
        "memory provider interface version mismatch"
    );

    Err(ProviderError::VersionMismatch {
        expected: INTERFACE_VERSION,
        found: P::VERSION,
    })
}
