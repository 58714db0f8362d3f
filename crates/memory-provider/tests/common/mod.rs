//! Test backends shared by the integration tests.

#![allow(dead_code)]

use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::cell::RefCell;
use std::collections::HashMap;
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use nebula_memory_provider::page;
use nebula_memory_provider::prelude::*;
use parking_lot::Mutex;

pub const PAGE: usize = 4096;
pub const LARGE_PAGE: usize = 2 * 1024 * 1024;

/// Native code reported when a request exceeds the backend limit.
pub const NATIVE_ENOMEM: i32 = 12;
/// Native code reported for pointers the backend does not own.
pub const NATIVE_EINVAL: i32 = 22;

thread_local! {
    static LAST_NATIVE: RefCell<NativeError> = const { RefCell::new(NativeError::EMPTY) };
}

fn fail_native(message: impl Into<std::borrow::Cow<'static, str>>, code: i32) -> ProviderError {
    let error = NativeError::new(message, code);
    LAST_NATIVE.with(|slot| *slot.borrow_mut() = error);
    ProviderError::ProviderSpecific
}

fn read_native() -> NativeError {
    LAST_NATIVE.with(|slot| slot.borrow().clone())
}

/// Install a test subscriber once per test binary; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("nebula_memory_provider=debug"))
        .with_test_writer()
        .try_init();
}

// ---------------------------------------------------------------------------
// PageProvider: heap-backed, page-granular backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PageParams {
    pub page_size: usize,
    pub max_alloc: usize,
    pub supports_purge: bool,
    /// Answer `min_page_size(Some(_))`; otherwise only the provider minimum
    pub per_mapping_query: bool,
    pub fail_init: bool,
    pub finalized: Arc<AtomicUsize>,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page_size: PAGE,
            max_alloc: 64 * 1024 * 1024,
            supports_purge: true,
            per_mapping_query: true,
            fail_init: false,
            finalized: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Region {
    layout: Layout,
    requested: usize,
}

pub struct PageProvider {
    page_size: usize,
    max_alloc: usize,
    supports_purge: bool,
    per_mapping_query: bool,
    regions: Mutex<HashMap<usize, Region>>,
    finalized: Arc<AtomicUsize>,
}

impl PageProvider {
    pub fn live_regions(&self) -> usize {
        self.regions.lock().len()
    }

    fn owns_range(&self, ptr: NonNull<u8>, size: usize) -> bool {
        let start = ptr.as_ptr() as usize;
        let Some(end) = start.checked_add(size) else {
            return false;
        };
        self.regions
            .lock()
            .iter()
            .any(|(&base, region)| base <= start && end <= base + region.layout.size())
    }

    fn check_purge(&self, operation: &'static str, ptr: NonNull<u8>, size: usize) -> ProviderResult<()> {
        if !self.supports_purge {
            return Err(ProviderError::not_supported(operation));
        }
        page::check_range_aligned(ptr, size, self.page_size)?;
        if !self.owns_range(ptr, size) {
            return Err(fail_native("purge range outside any allocation", NATIVE_EINVAL));
        }
        Ok(())
    }
}

impl MemoryProvider for PageProvider {
    type Params = PageParams;
    const VERSION: InterfaceVersion = INTERFACE_VERSION;

    fn initialize(params: PageParams) -> ProviderResult<Self> {
        if params.fail_init {
            return Err(ProviderError::invalid_argument("backend refused parameters"));
        }
        if !params.page_size.is_power_of_two() {
            return Err(ProviderError::invalid_argument("page size must be a power of two"));
        }
        Ok(Self {
            page_size: params.page_size,
            max_alloc: params.max_alloc,
            supports_purge: params.supports_purge,
            per_mapping_query: params.per_mapping_query,
            regions: Mutex::new(HashMap::new()),
            finalized: params.finalized,
        })
    }

    fn finalize(self) {
        for (base, region) in self.regions.lock().drain() {
            // SAFETY: every region was produced by alloc_zeroed with this layout.
            unsafe { dealloc(base as *mut u8, region.layout) };
        }
        self.finalized.fetch_add(1, Ordering::SeqCst);
    }

    fn alloc(&self, size: usize, alignment: usize) -> ProviderResult<NonNull<u8>> {
        if alignment != 0 && !alignment.is_power_of_two() {
            return Err(ProviderError::invalid_alignment(alignment));
        }
        if size == 0 {
            return Err(ProviderError::invalid_argument("zero-sized allocation"));
        }
        if size > self.max_alloc {
            return Err(fail_native("allocation exceeds backend limit", NATIVE_ENOMEM));
        }

        let rounded = page::align_up(size, self.page_size).ok_or(ProviderError::OutOfHostMemory)?;
        let layout = Layout::from_size_align(rounded, alignment.max(self.page_size))
            .map_err(|_| ProviderError::invalid_alignment(alignment))?;

        // SAFETY: layout has a non-zero size.
        let ptr = NonNull::new(unsafe { alloc_zeroed(layout) }).ok_or(ProviderError::OutOfHostMemory)?;
        self.regions.lock().insert(
            ptr.as_ptr() as usize,
            Region {
                layout,
                requested: size,
            },
        );
        Ok(ptr)
    }

    unsafe fn free(&self, ptr: NonNull<u8>, size: usize) -> ProviderResult<()> {
        let mut regions = self.regions.lock();
        let base = ptr.as_ptr() as usize;
        let region = match regions.get(&base) {
            Some(region) => *region,
            None => return Err(fail_native("free of unknown pointer", NATIVE_EINVAL)),
        };
        if region.requested != size {
            return Err(ProviderError::invalid_argument(format!(
                "free size {size} does not match allocation size {}",
                region.requested
            )));
        }
        regions.remove(&base);
        // SAFETY: region was produced by alloc_zeroed with this layout and is
        // no longer tracked.
        unsafe { dealloc(ptr.as_ptr(), region.layout) };
        Ok(())
    }

    fn last_native_error(&self) -> NativeError {
        read_native()
    }

    fn recommended_page_size(&self, size: usize) -> ProviderResult<usize> {
        Ok(if size >= LARGE_PAGE { LARGE_PAGE } else { self.page_size })
    }

    fn min_page_size(&self, ptr: Option<NonNull<u8>>) -> ProviderResult<usize> {
        match ptr {
            None => Ok(self.page_size),
            Some(_) if !self.per_mapping_query => {
                Err(ProviderError::not_supported("min_page_size"))
            }
            Some(ptr) if self.owns_range(ptr, 0) => Ok(self.page_size),
            Some(_) => Err(fail_native("pointer outside any allocation", NATIVE_EINVAL)),
        }
    }

    unsafe fn purge_lazy(&self, ptr: NonNull<u8>, size: usize) -> ProviderResult<()> {
        self.check_purge("purge_lazy", ptr, size)?;
        // Contents become unspecified; make that visible instead of keeping them.
        // SAFETY: the range lies inside a live allocation (checked above).
        unsafe { ptr.as_ptr().write_bytes(0xDD, size) };
        Ok(())
    }

    unsafe fn purge_force(&self, ptr: NonNull<u8>, size: usize) -> ProviderResult<()> {
        self.check_purge("purge_force", ptr, size)?;
        // SAFETY: the range lies inside a live allocation (checked above).
        unsafe { ptr.as_ptr().write_bytes(0, size) };
        Ok(())
    }

    fn name(&self) -> &str {
        "page-provider"
    }
}

// ---------------------------------------------------------------------------
// FaultyProvider: every fallible operation fails with a native error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct FaultyParams {
    pub tag: &'static str,
    pub code: i32,
}

pub struct FaultyProvider {
    tag: &'static str,
    code: i32,
}

impl FaultyProvider {
    fn fail(&self, operation: &str) -> ProviderError {
        fail_native(format!("{} {operation} failed", self.tag), self.code)
    }
}

impl MemoryProvider for FaultyProvider {
    type Params = FaultyParams;
    const VERSION: InterfaceVersion = INTERFACE_VERSION;

    fn initialize(params: FaultyParams) -> ProviderResult<Self> {
        Ok(Self {
            tag: params.tag,
            code: params.code,
        })
    }

    fn alloc(&self, _size: usize, _alignment: usize) -> ProviderResult<NonNull<u8>> {
        Err(self.fail("alloc"))
    }

    unsafe fn free(&self, _ptr: NonNull<u8>, _size: usize) -> ProviderResult<()> {
        Err(self.fail("free"))
    }

    fn last_native_error(&self) -> NativeError {
        read_native()
    }

    fn recommended_page_size(&self, _size: usize) -> ProviderResult<usize> {
        Err(self.fail("recommended_page_size"))
    }

    fn min_page_size(&self, ptr: Option<NonNull<u8>>) -> ProviderResult<usize> {
        match ptr {
            None => Ok(PAGE),
            Some(_) => Err(self.fail("min_page_size")),
        }
    }

    unsafe fn purge_lazy(&self, _ptr: NonNull<u8>, _size: usize) -> ProviderResult<()> {
        Err(ProviderError::not_supported("purge_lazy"))
    }

    unsafe fn purge_force(&self, _ptr: NonNull<u8>, _size: usize) -> ProviderResult<()> {
        Err(ProviderError::not_supported("purge_force"))
    }

    fn name(&self) -> &str {
        self.tag
    }
}

// ---------------------------------------------------------------------------
// StaleProvider: written against an older interface
// ---------------------------------------------------------------------------

pub static STALE_INITIALIZED: AtomicUsize = AtomicUsize::new(0);

pub struct StaleProvider;

impl MemoryProvider for StaleProvider {
    type Params = ();
    const VERSION: InterfaceVersion = InterfaceVersion::new(0, 1);

    fn initialize((): ()) -> ProviderResult<Self> {
        STALE_INITIALIZED.fetch_add(1, Ordering::SeqCst);
        Ok(Self)
    }

    fn alloc(&self, _size: usize, _alignment: usize) -> ProviderResult<NonNull<u8>> {
        Err(ProviderError::Unknown)
    }

    unsafe fn free(&self, _ptr: NonNull<u8>, _size: usize) -> ProviderResult<()> {
        Err(ProviderError::Unknown)
    }

    fn last_native_error(&self) -> NativeError {
        NativeError::EMPTY
    }

    fn recommended_page_size(&self, _size: usize) -> ProviderResult<usize> {
        Ok(PAGE)
    }

    fn min_page_size(&self, _ptr: Option<NonNull<u8>>) -> ProviderResult<usize> {
        Ok(PAGE)
    }

    unsafe fn purge_lazy(&self, _ptr: NonNull<u8>, _size: usize) -> ProviderResult<()> {
        Err(ProviderError::Unknown)
    }

    unsafe fn purge_force(&self, _ptr: NonNull<u8>, _size: usize) -> ProviderResult<()> {
        Err(ProviderError::Unknown)
    }
}

/// Page-aligned address for backends that never touch the range
pub fn aligned_dangling() -> NonNull<u8> {
    NonNull::new(PAGE as *mut u8).expect("non-zero address")
}

pub fn page_provider() -> MemoryProviderHandle<PageProvider> {
    MemoryProviderHandle::create_with_config(PageParams::default(), ProviderConfig::debug())
        .expect("page provider")
}
