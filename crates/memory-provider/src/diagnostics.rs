//! Per-thread diagnostic state
//!
//! Each OS thread owns one slot holding:
//! - the native error of the last provider-specific failure on the thread
//! - the id of the last provider whose operation did not succeed
//!
//! The slot lives in `thread_local!` storage, so reads and writes never take
//! a lock and never observe another thread's values. Isolation is per OS
//! thread: async tasks sharing a worker thread share its slot, so read it
//! right after the failing call, before the next `.await`.

use core::cell::RefCell;

use crate::provider::NativeError;
use crate::registry::ProviderId;

#[derive(Debug)]
struct DiagnosticState {
    native_error: NativeError,
    last_failed: Option<ProviderId>,
}

thread_local! {
    static DIAGNOSTICS: RefCell<DiagnosticState> = const {
        RefCell::new(DiagnosticState {
            native_error: NativeError::EMPTY,
            last_failed: None,
        })
    };
}

/// Id of the last provider that returned a non-success result on this thread
///
/// The id does not keep the provider alive. Resolve it through
/// [`ProviderRegistry`](crate::ProviderRegistry) to find out whether the
/// handle still exists.
pub fn last_failed_provider() -> Option<ProviderId> {
    DIAGNOSTICS
        .try_with(|state| state.borrow().last_failed)
        .ok()
        .flatten()
}

/// Native error of the last provider-specific failure on this thread
///
/// Only meaningful right after an operation returned
/// [`ProviderError::ProviderSpecific`](crate::ProviderError::ProviderSpecific).
/// A thread that never saw one gets [`NativeError::EMPTY`].
pub fn last_native_error() -> NativeError {
    DIAGNOSTICS
        .try_with(|state| state.borrow().native_error.clone())
        .unwrap_or_default()
}

pub(crate) fn record_failure(id: ProviderId) {
    // Slot already destroyed during thread teardown: nothing left to report to.
    let _ = DIAGNOSTICS.try_with(|state| state.borrow_mut().last_failed = Some(id));
}

pub(crate) fn record_native_error(error: NativeError) {
    let _ = DIAGNOSTICS.try_with(|state| state.borrow_mut().native_error = error);
}
