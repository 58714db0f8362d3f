//! Registry of live provider handles
//!
//! Diagnostic state refers to handles by [`ProviderId`] rather than by
//! reference. An id resolves through the registry while its handle lives and
//! stops resolving once the handle is destroyed.

use core::fmt;
use core::num::NonZeroU64;
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use dashmap::DashMap;

use crate::provider::InterfaceVersion;

/// Unique identifier of a provider handle
///
/// Uses `NonZeroU64` so `Option<ProviderId>` is the same size as the id.
/// Ids are never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderId(NonZeroU64);

impl ProviderId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU64::MIN.saturating_add(n))
    }

    /// Raw id value
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "provider#{}", self.0)
    }
}

/// Snapshot of a registered provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInfo {
    /// Handle id
    pub id: ProviderId,
    /// Configured label, or the backend name at creation time
    pub name: String,
    /// Rust type of the backend
    pub backend: &'static str,
    /// Interface version the backend reported
    pub version: InterfaceVersion,
}

/// Registry of live providers
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: DashMap<ProviderId, ProviderInfo>,
}

static GLOBAL_REGISTRY: OnceLock<ProviderRegistry> = OnceLock::new();

impl ProviderRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry every handle registers with
    pub fn global() -> &'static Self {
        GLOBAL_REGISTRY.get_or_init(Self::new)
    }

    pub(crate) fn register(&self, info: ProviderInfo) {
        self.providers.insert(info.id, info);
    }

    pub(crate) fn deregister(&self, id: ProviderId) -> Option<ProviderInfo> {
        self.providers.remove(&id).map(|(_, info)| info)
    }

    /// Look up a live provider
    pub fn resolve(&self, id: ProviderId) -> Option<ProviderInfo> {
        self.providers.get(&id).map(|entry| entry.value().clone())
    }

    /// Whether `id` belongs to a live provider
    pub fn contains(&self, id: ProviderId) -> bool {
        self.providers.contains_key(&id)
    }

    /// Number of live providers
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no provider is live
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// All live providers, ordered by id
    pub fn list(&self) -> Vec<ProviderInfo> {
        let mut providers: Vec<_> = self
            .providers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        providers.sort_by_key(|info| info.id);
        providers
    }
}
