//! The public allocator surface: a single arena backed by a
//! [`HeapProvider`], laid out as a class table followed by boundary-tag
//! blocks between prologue and epilogue sentinels.

use crate::error::InitError;
use crate::layout::{CLASS_TABLE_BYTES, DOUBLE_WORD, INITIAL_CHUNK_BYTES, MIN_BLOCK, OVERHEAD, WORD, align_up8};
use crate::provider::HeapProvider;
use crate::{block, class, coalesce, fit, free_list, place};
use core::ptr;

/// A segregated free-list, boundary-tag heap over a `P: HeapProvider`.
///
/// Construction performs the full layout described in the arena's data
/// model — class table, alignment pad, prologue, epilogue, and one seed
/// chunk — so an `Arena` is either fully initialized or does not exist.
/// `Arena` holds only raw pointers into provider-owned memory and the
/// provider itself; it is intentionally not `Send`/`Sync` (see the crate's
/// concurrency non-goals). An optional `#[global_allocator]` wrapper that
/// adds locking around an `Arena` lives behind the `global` feature.
pub struct Arena<P: HeapProvider> {
    provider: P,
    /// Start of the class table, i.e. the whole arena's base address.
    base: *mut u8,
    /// Payload pointer of the prologue block, used as the walk's starting
    /// point (by the checker) and as the anchor the very first real block
    /// sits next to.
    heap_listp: *mut u8,
}

impl<P: HeapProvider> Arena<P> {
    /// Build a new arena over `provider`, laying out the class table,
    /// prologue/epilogue sentinels, and a first free chunk.
    ///
    /// # Errors
    /// Returns [`InitError::HeapProviderRefused`] if `provider` cannot
    /// supply the minimum bytes an arena needs to come into existence.
    pub fn new(mut provider: P) -> Result<Self, InitError> {
        let prologue_bytes = CLASS_TABLE_BYTES + 4 * WORD;
        let base = provider
            .extend(prologue_bytes)
            .ok_or(InitError::HeapProviderRefused)?;

        // Class table: every slot starts empty.
        unsafe { ptr::write_bytes(base, 0, CLASS_TABLE_BYTES) };

        let pad = unsafe { base.add(CLASS_TABLE_BYTES) };
        let prologue_hdr = unsafe { base.add(CLASS_TABLE_BYTES + WORD) };
        let prologue_ftr = unsafe { base.add(CLASS_TABLE_BYTES + DOUBLE_WORD) };
        let epilogue_hdr = unsafe { base.add(CLASS_TABLE_BYTES + WORD + DOUBLE_WORD) };

        unsafe {
            write_raw_word(pad, 0);
            write_raw_word(prologue_hdr, block::pack(OVERHEAD, true));
            write_raw_word(prologue_ftr, block::pack(OVERHEAD, true));
            write_raw_word(epilogue_hdr, block::pack(0, true));
        }

        let heap_listp = unsafe { base.add(CLASS_TABLE_BYTES + DOUBLE_WORD) };
        let mut arena = Self {
            provider,
            base,
            heap_listp,
        };

        arena
            .extend_arena(INITIAL_CHUNK_BYTES)
            .ok_or(InitError::HeapProviderRefused)?;
        Ok(arena)
    }

    /// Grow the arena by at least `bytes`, rounding up to an even word
    /// count, and coalesce the new block with whatever free block (if any)
    /// already sat at the old epilogue's position.
    fn extend_arena(&mut self, bytes: usize) -> Option<*mut u8> {
        let words = bytes.div_ceil(WORD);
        let words = if words % 2 == 1 { words + 1 } else { words };
        let size = words * WORD;

        let bp = self.provider.extend(size)?;
        unsafe {
            // The new block's header overlays what used to be the epilogue
            // header; its footer sits at its own end, followed by a fresh
            // epilogue header at the new block's end, i.e. `header_of(bp +
            // size)`.
            block::write_header_footer(bp, size, false);
            write_raw_word(bp.add(size - WORD), block::pack(0, true));
            Some(coalesce::coalesce(self.base, bp))
        }
    }

    /// Allocate a region of at least `size` bytes, 8-byte aligned.
    ///
    /// Requesting `size == 0` is success, not failure: it returns null
    /// without touching the arena. Any other failure (the provider refuses
    /// to grow further) also returns null — out-of-memory is reported this
    /// way, not as a `Result`, matching this operation's tested contract.
    ///
    /// # Safety
    /// The arena must not be concurrently mutated by another call into this
    /// `Arena` (see the crate's concurrency non-goals).
    #[must_use]
    pub unsafe fn allocate(&mut self, size: usize) -> *mut u8 {
        if size == 0 {
            return ptr::null_mut();
        }

        let asize = core::cmp::max(MIN_BLOCK, align_up8(size + OVERHEAD));

        let bp = unsafe { fit::find_fit(self.base, asize) };
        if !bp.is_null() {
            unsafe { place::place(self.base, bp, asize) };
            return bp;
        }

        let extend_size = core::cmp::max(asize, INITIAL_CHUNK_BYTES);
        let Some(bp) = self.extend_arena(extend_size) else {
            log::warn!("allocate: heap provider could not grow by {extend_size} bytes");
            return ptr::null_mut();
        };
        unsafe { place::place(self.base, bp, asize) };
        bp
    }

    /// Free a region previously returned by [`Self::allocate`],
    /// [`Self::reallocate`], or [`Self::zero_allocate`].
    ///
    /// A null pointer is a no-op.
    ///
    /// # Safety
    /// `ptr` must be null, or exactly a pointer previously returned by one
    /// of this arena's allocation methods and not yet freed. Freeing an
    /// invalid, already-freed, or out-of-arena pointer is undefined
    /// behavior: this design does not keep a side-table of live
    /// allocations to validate against, which is exactly the O(1),
    /// boundary-tag-only design this crate exists to demonstrate.
    pub unsafe fn free(&mut self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        unsafe {
            let size = block::size_of_block(ptr);
            block::write_header_footer(ptr, size, false);
            coalesce::coalesce(self.base, ptr);
        }
    }

    /// Resize the allocation at `ptr` to `size` bytes, preserving
    /// `min(size, old_payload_size)` bytes of its existing contents.
    ///
    /// `size == 0` frees `ptr` and returns null. `ptr == null` behaves like
    /// [`Self::allocate`]. Otherwise this always allocates a fresh block,
    /// copies, and frees the old one — there is no in-place growth.
    ///
    /// # Safety
    /// Same pointer requirements as [`Self::free`] for a non-null `ptr`.
    #[must_use]
    pub unsafe fn reallocate(&mut self, ptr: *mut u8, size: usize) -> *mut u8 {
        if size == 0 {
            unsafe { self.free(ptr) };
            return ptr::null_mut();
        }
        if ptr.is_null() {
            return unsafe { self.allocate(size) };
        }

        let new_ptr = unsafe { self.allocate(size) };
        if new_ptr.is_null() {
            return ptr::null_mut();
        }

        let old_payload = unsafe { block::size_of_block(ptr) } - OVERHEAD;
        let copy_len = core::cmp::min(size, old_payload);
        unsafe {
            ptr::copy_nonoverlapping(ptr, new_ptr, copy_len);
            self.free(ptr);
        }
        new_ptr
    }

    /// Allocate storage for `nmemb` elements of `size` bytes each, zeroed.
    ///
    /// Returns null, without allocating anything, if `nmemb * size`
    /// overflows `usize` or if the underlying [`Self::allocate`] fails.
    ///
    /// # Safety
    /// The arena must not be concurrently mutated by another call into this
    /// `Arena`.
    #[must_use]
    pub unsafe fn zero_allocate(&mut self, nmemb: usize, size: usize) -> *mut u8 {
        let Some(bytes) = nmemb.checked_mul(size) else {
            log::warn!("zero_allocate: nmemb * size overflowed usize");
            return ptr::null_mut();
        };

        let p = unsafe { self.allocate(bytes) };
        if !p.is_null() {
            unsafe { ptr::write_bytes(p, 0, bytes) };
        }
        p
    }

    /// The current extent of the arena, as handed out by the
    /// [`HeapProvider`]. Useful for diagnostics and tests that want to
    /// confirm an operation did or did not grow the arena.
    #[must_use]
    pub fn heap_span(&self) -> (*const u8, *const u8) {
        (self.provider.heap_low(), self.provider.heap_high())
    }

    /// Walk the whole arena and every free list, checking the boundary-tag
    /// and free-list invariants. Returns `false` (after logging every
    /// violation found) on the first inconsistency; `verbose` additionally
    /// logs every block visited.
    ///
    /// This is a debugging aid, not part of the allocator's steady-state
    /// cost: it is `O(blocks + free-list entries)`.
    #[cfg(any(test, feature = "check"))]
    #[must_use]
    pub fn check(&self, verbose: bool) -> bool {
        let mut ok = true;

        unsafe {
            if block::size_of_block(self.heap_listp) != OVERHEAD
                || !block::is_allocated(self.heap_listp)
            {
                log::warn!("check: malformed prologue block");
                ok = false;
            }

            let mut bp = self.heap_listp;
            loop {
                let size = block::size_of_block(bp);
                if verbose {
                    log::trace!(
                        "check: block {bp:p} size={size} allocated={}",
                        block::is_allocated(bp)
                    );
                }
                if (bp as usize) % DOUBLE_WORD != 0 {
                    log::warn!("check: block {bp:p} is not 8-byte aligned");
                    ok = false;
                }
                if block::header_word(bp) != block::footer_word(bp) {
                    log::warn!("check: header/footer mismatch at block {bp:p}");
                    ok = false;
                }
                if size == 0 {
                    break;
                }
                bp = block::next_block(bp);
            }
            if !block::is_allocated(bp) {
                log::warn!("check: malformed epilogue block");
                ok = false;
            }

            // No two free blocks should ever sit next to each other.
            let mut cur = self.heap_listp;
            while block::size_of_block(cur) != 0 {
                let nxt = block::next_block(cur);
                if block::size_of_block(nxt) != 0
                    && !block::is_allocated(cur)
                    && !block::is_allocated(nxt)
                {
                    log::warn!("check: uncoalesced free neighbors at {cur:p} and {nxt:p}");
                    ok = false;
                }
                cur = nxt;
            }

            // Every block reachable from a free list must be free, sit in
            // the class its size maps to, and its prev link must point
            // back at whatever preceded it.
            for class in 0..class::NUM_CLASSES {
                let slot = class::slot(self.base, class);
                let mut bp = free_list::head(slot);
                let mut expected_prev: *mut u8 = ptr::null_mut();
                while !bp.is_null() {
                    if block::is_allocated(bp) {
                        log::warn!("check: allocated block {bp:p} present in free list {class}");
                        ok = false;
                    }
                    if class::class_of(block::size_of_block(bp)) != class {
                        log::warn!("check: block {bp:p} lives in the wrong size class list ({class})");
                        ok = false;
                    }
                    if free_list::prev(bp) != expected_prev {
                        log::warn!("check: broken prev link at block {bp:p}");
                        ok = false;
                    }
                    expected_prev = bp;
                    bp = free_list::next(bp);
                }
            }
        }

        ok
    }

    /// Count the free blocks currently reachable from the class table, by
    /// walking every list. Used by tests to observe coalescing outcomes
    /// without depending on exact class placement (which, for a freshly
    /// seeded arena, also reflects however much of the initial chunk is
    /// left over).
    #[cfg(test)]
    fn free_block_count(&self) -> usize {
        let mut count = 0;
        for class in 0..class::NUM_CLASSES {
            let slot = unsafe { class::slot(self.base, class) };
            let mut bp = unsafe { free_list::head(slot) };
            while !bp.is_null() {
                count += 1;
                bp = unsafe { free_list::next(bp) };
            }
        }
        count
    }
}

/// # Safety
/// `p` must be a valid, writable, 4-byte-aligned pointer.
unsafe fn write_raw_word(p: *mut u8, value: u32) {
    unsafe { ptr::write(p.cast::<u32>(), value) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::FixedRegionProvider;

    fn new_arena(capacity: usize) -> Arena<FixedRegionProvider<'static>> {
        let region: &'static mut [u8] = vec![0u8; capacity].leak();
        Arena::new(FixedRegionProvider::new(region)).expect("arena should initialize")
    }

    #[test]
    fn new_lays_out_prologue_and_epilogue() {
        let arena = new_arena(1 << 16);
        unsafe {
            assert_eq!(block::size_of_block(arena.heap_listp), OVERHEAD);
            assert!(block::is_allocated(arena.heap_listp));

            let first_block = block::next_block(arena.heap_listp);
            assert!(!block::is_allocated(first_block));
            assert_eq!(block::size_of_block(first_block), INITIAL_CHUNK_BYTES);
        }
        assert!(arena.check(true));
    }

    #[test]
    fn allocate_zero_returns_null_without_touching_the_arena() {
        let mut arena = new_arena(4096);
        let before = arena.heap_span();
        let p = unsafe { arena.allocate(0) };
        assert!(p.is_null());
        assert_eq!(arena.heap_span(), before);
    }

    #[test]
    fn allocate_one_byte_yields_a_minimum_block() {
        let mut arena = new_arena(4096);
        let p = unsafe { arena.allocate(1) };
        assert!(!p.is_null());
        unsafe {
            assert_eq!(block::size_of_block(p), MIN_BLOCK);
            assert!(block::is_allocated(p));
        }
        assert!(arena.check(true));
    }

    #[test]
    fn split_only_happens_when_the_remainder_meets_the_minimum() {
        let mut arena = new_arena(4096);
        // A request whose remainder would be exactly MIN_BLOCK splits...
        let p = unsafe { arena.allocate(INITIAL_CHUNK_BYTES - MIN_BLOCK - OVERHEAD) };
        assert!(!p.is_null());
        unsafe {
            let asize = align_up8((INITIAL_CHUNK_BYTES - MIN_BLOCK - OVERHEAD) + OVERHEAD);
            assert_eq!(block::size_of_block(p), asize);
            let remainder = block::next_block(p);
            assert!(!block::is_allocated(remainder));
            assert_eq!(block::size_of_block(remainder), MIN_BLOCK);
        }
        assert!(arena.check(true));
    }

    #[test]
    fn split_is_skipped_when_the_remainder_would_be_too_small() {
        let mut arena = new_arena(4096);
        // Consume the whole seed chunk in one go: no remainder possible.
        let p = unsafe { arena.allocate(INITIAL_CHUNK_BYTES - OVERHEAD) };
        assert!(!p.is_null());
        unsafe {
            assert_eq!(block::size_of_block(p), INITIAL_CHUNK_BYTES);
        }
        assert!(arena.check(true));
    }

    #[test]
    fn freed_block_is_reused_lifo() {
        let mut arena = new_arena(1 << 16);
        let p = unsafe { arena.allocate(4000) };
        assert!(!p.is_null());
        unsafe { arena.free(p) };
        let q = unsafe { arena.allocate(4000) };
        assert_eq!(p, q);
    }

    #[test]
    fn freeing_adjacent_blocks_coalesces_to_one_free_block() {
        let mut arena = new_arena(1 << 16);
        let p1 = unsafe { arena.allocate(16) };
        let p2 = unsafe { arena.allocate(16) };
        assert!(!p1.is_null() && !p2.is_null());

        unsafe {
            arena.free(p1);
            arena.free(p2);
        }

        assert_eq!(arena.free_block_count(), 1);
        assert!(arena.check(true));
    }

    #[test]
    fn reallocate_preserves_existing_bytes() {
        let mut arena = new_arena(1 << 16);
        let p = unsafe { arena.allocate(24) };
        assert!(!p.is_null());
        unsafe {
            for i in 0..24u8 {
                *p.add(i as usize) = i + 1;
            }
            let q = arena.reallocate(p, 1000);
            assert!(!q.is_null());
            assert_ne!(p, q);
            for i in 0..24u8 {
                assert_eq!(*q.add(i as usize), i + 1);
            }
        }
        assert!(arena.check(true));
    }

    #[test]
    fn reallocate_to_zero_frees_and_returns_null() {
        let mut arena = new_arena(4096);
        let p = unsafe { arena.allocate(64) };
        let q = unsafe { arena.reallocate(p, 0) };
        assert!(q.is_null());
        assert!(arena.check(true));
    }

    #[test]
    fn reallocate_null_behaves_like_allocate() {
        let mut arena = new_arena(4096);
        let p = unsafe { arena.reallocate(ptr::null_mut(), 32) };
        assert!(!p.is_null());
        unsafe {
            assert!(block::size_of_block(p) >= 32 + OVERHEAD);
        }
    }

    #[test]
    fn zero_allocate_zero_fills_the_region() {
        let mut arena = new_arena(4096);
        let p = unsafe { arena.zero_allocate(10, 8) };
        assert!(!p.is_null());
        unsafe {
            for i in 0..80 {
                assert_eq!(*p.add(i), 0);
            }
        }
    }

    #[test]
    fn zero_allocate_rejects_multiplication_overflow() {
        let mut arena = new_arena(4096);
        let p = unsafe { arena.zero_allocate(usize::MAX, 2) };
        assert!(p.is_null());
    }

    #[test]
    fn free_of_null_is_a_no_op() {
        let mut arena = new_arena(4096);
        let before = arena.heap_span();
        unsafe { arena.free(ptr::null_mut()) };
        assert_eq!(arena.heap_span(), before);
    }

    #[test]
    fn exhausting_the_provider_then_freeing_recovers() {
        // Small enough that the seed chunk plus one extension exhausts it.
        let mut arena = new_arena(INITIAL_CHUNK_BYTES + 128);
        let p1 = unsafe { arena.allocate(400) };
        assert!(!p1.is_null());

        // Keep allocating until the provider refuses to grow further.
        let mut allocations = Vec::new();
        loop {
            let p = unsafe { arena.allocate(64) };
            if p.is_null() {
                break;
            }
            allocations.push(p);
        }

        unsafe { arena.free(p1) };
        let recovered = unsafe { arena.allocate(64) };
        assert!(!recovered.is_null());

        for p in allocations {
            unsafe { arena.free(p) };
        }
        assert!(arena.check(true));
    }
}
