//! Page granularity helpers
//!
//! Page sizes are not assumed to be powers of two; device backends may use
//! odd granularities.

use core::ptr::NonNull;

use crate::error::{ProviderError, ProviderResult};

/// Whether `value` is a multiple of `granularity`
///
/// A zero granularity aligns nothing.
#[inline]
#[must_use]
pub const fn is_aligned(value: usize, granularity: usize) -> bool {
    granularity != 0 && value % granularity == 0
}

/// Round `value` up to the next multiple of `granularity`
///
/// Returns `None` on overflow or a zero granularity.
#[inline]
#[must_use]
pub const fn align_up(value: usize, granularity: usize) -> Option<usize> {
    if granularity == 0 {
        return None;
    }
    match value % granularity {
        0 => Some(value),
        rem => value.checked_add(granularity - rem),
    }
}

/// Whether both the start address and the length of a range are page aligned
#[inline]
pub fn is_range_aligned(ptr: NonNull<u8>, size: usize, page_size: usize) -> bool {
    is_aligned(ptr.as_ptr() as usize, page_size) && is_aligned(size, page_size)
}

/// Reject a range whose start or length is not page aligned
pub fn check_range_aligned(ptr: NonNull<u8>, size: usize, page_size: usize) -> ProviderResult<()> {
    if is_range_aligned(ptr, size, page_size) {
        Ok(())
    } else {
        Err(ProviderError::invalid_alignment(page_size))
    }
}
