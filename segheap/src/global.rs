//! Optional `#[global_allocator]` wrapper.
//!
//! The core [`Arena`] is deliberately not `Send`/`Sync` (see the crate's
//! concurrency non-goals). This module adds a lock *outside* the core type
//! so a single binary can still point Rust's own `alloc` at it — the same
//! pairing `kernel-alloc`'s `static_heap` module (a `.bss`-resident array
//! plus a lazily initialized `SpinLock<FreeListAllocator>`) and
//! `kernel`'s `allocator/kernel_allocator.rs` (the `GlobalAlloc` impl
//! wrapping it) split across two files.

use crate::{Arena, FixedRegionProvider};
use core::alloc::{GlobalAlloc, Layout};
use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use kernel_sync::SpinLock;

/// A [`GlobalAlloc`] backed by an [`Arena`] over a `'static`, `HEAP_SIZE`-byte
/// array embedded in the allocator itself. The array and the arena are both
/// lazily initialized on first use.
///
/// Only alignments up to 8 bytes are honored (the arena's own alignment
/// guarantee, see the crate's non-goals); `layout.align()` above 8 is not
/// checked or enforced.
///
/// # Example
/// ```ignore
/// use segheap::StaticArenaAllocator;
///
/// #[global_allocator]
/// static ALLOCATOR: StaticArenaAllocator<{ 4 * 1024 * 1024 }> = StaticArenaAllocator::new();
/// ```
pub struct StaticArenaAllocator<const HEAP_SIZE: usize> {
    heap: UnsafeCell<MaybeUninit<[u8; HEAP_SIZE]>>,
    arena: SpinLock<Option<Arena<FixedRegionProvider<'static>>>>,
}

// Safety: all access to `heap` happens while holding `arena`'s lock, which
// serializes every read and write of the backing storage.
unsafe impl<const HEAP_SIZE: usize> Sync for StaticArenaAllocator<HEAP_SIZE> {}

impl<const HEAP_SIZE: usize> StaticArenaAllocator<HEAP_SIZE> {
    /// Build an allocator with its arena not yet constructed. Safe and
    /// cheap enough to use directly as a `static` initializer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            heap: UnsafeCell::new(MaybeUninit::uninit()),
            arena: SpinLock::new(None),
        }
    }

    /// Build the arena over this allocator's own backing array the first
    /// time it is needed.
    fn ensure_init(&self, slot: &mut Option<Arena<FixedRegionProvider<'static>>>) {
        if slot.is_some() {
            return;
        }
        let region: &'static mut [u8] = unsafe {
            let ptr = (*self.heap.get()).as_mut_ptr().cast::<u8>();
            core::slice::from_raw_parts_mut(ptr, HEAP_SIZE)
        };
        let provider = FixedRegionProvider::new(region);
        *slot = Arena::new(provider).ok();
    }
}

impl<const HEAP_SIZE: usize> Default for StaticArenaAllocator<HEAP_SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl<const HEAP_SIZE: usize> GlobalAlloc for StaticArenaAllocator<HEAP_SIZE> {
    /// # Safety
    /// See [`GlobalAlloc::alloc`]; `layout.align()` above 8 is not honored.
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.arena.with_lock(|slot| {
            self.ensure_init(slot);
            match slot {
                Some(arena) => unsafe { arena.allocate(layout.size()) },
                None => core::ptr::null_mut(),
            }
        })
    }

    /// # Safety
    /// See [`GlobalAlloc::dealloc`].
    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        self.arena.with_lock(|slot| {
            if let Some(arena) = slot {
                unsafe { arena.free(ptr) };
            }
        });
    }

    /// # Safety
    /// See [`GlobalAlloc::alloc_zeroed`]; `layout.align()` above 8 is not
    /// honored.
    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        self.arena.with_lock(|slot| {
            self.ensure_init(slot);
            match slot {
                Some(arena) => unsafe { arena.zero_allocate(1, layout.size()) },
                None => core::ptr::null_mut(),
            }
        })
    }

    /// # Safety
    /// See [`GlobalAlloc::realloc`]; `layout.align()` above 8 is not
    /// honored.
    unsafe fn realloc(&self, ptr: *mut u8, _layout: Layout, new_size: usize) -> *mut u8 {
        self.arena.with_lock(|slot| match slot {
            Some(arena) => unsafe { arena.reallocate(ptr, new_size) },
            None => core::ptr::null_mut(),
        })
    }
}
