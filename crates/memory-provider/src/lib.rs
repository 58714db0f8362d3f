//! # nebula-memory-provider
//!
//! Pluggable memory providers for Nebula allocators.
//!
//! A pool, arena or cache asks a provider for raw memory without knowing
//! where it comes from. Backends (OS virtual memory, device memory, fixed
//! buffers) implement [`MemoryProvider`]; callers talk to a
//! [`MemoryProviderHandle`], which validates, forwards and observes every
//! operation.
//!
//! ## Architecture
//!
//! - [`error`] - result taxonomy ([`ProviderError`], [`ResultCode`])
//! - [`provider`] - the versioned operations table ([`MemoryProvider`])
//! - [`handle`] - handle lifecycle (create / destroy)
//! - [`dispatch`] - forwarding of operations, type-erased [`DynMemoryProvider`]
//! - [`diagnostics`] - per-thread last native error and last failed provider
//! - [`registry`] - resolution of [`ProviderId`]s to live providers
//!
//! ## Error channels
//!
//! Every operation returns a [`ProviderResult`]. When the error is
//! [`ProviderError::ProviderSpecific`], the backend's detail is available on
//! the same thread through [`diagnostics::last_native_error`] until the next
//! provider-specific failure on that thread overwrites it.
//!
//! ## Features
//!
//! - `logging` (default): lifecycle and failure events via `tracing`

#![cfg_attr(docsrs, feature(doc_cfg))]
// Backends hand out raw memory; the dispatch layer forwards unsafe contracts.
#![allow(unsafe_code)]

pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod error;
pub mod handle;
pub mod page;
pub mod provider;
pub mod registry;
pub mod stats;

pub use crate::config::ProviderConfig;
pub use crate::dispatch::DynMemoryProvider;
pub use crate::error::{ProviderError, ProviderResult, ResultCode};
pub use crate::handle::MemoryProviderHandle;
pub use crate::provider::{INTERFACE_VERSION, InterfaceVersion, MemoryProvider, NativeError};
pub use crate::registry::{ProviderId, ProviderInfo, ProviderRegistry};
pub use crate::stats::{DispatchStats, StatsSnapshot};

/// Id of the last provider that failed on the calling thread
///
/// Shorthand for [`diagnostics::last_failed_provider`].
pub fn last_failed_provider() -> Option<ProviderId> {
    diagnostics::last_failed_provider()
}

pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::config::ProviderConfig;
    pub use crate::diagnostics::{last_failed_provider, last_native_error};
    pub use crate::dispatch::DynMemoryProvider;
    pub use crate::error::{ProviderError, ProviderResult, ResultCode};
    pub use crate::handle::MemoryProviderHandle;
    pub use crate::provider::{INTERFACE_VERSION, InterfaceVersion, MemoryProvider, NativeError};
    pub use crate::registry::{ProviderId, ProviderRegistry};
}
