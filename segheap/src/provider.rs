//! The `sbrk`-style heap growth abstraction and its reference
//! implementation.

/// Abstracts the classic `sbrk`-style heap growth primitive (`mem_sbrk` /
/// `mem_heap_lo` / `mem_heap_hi` in the traditional Unix heap-growth model).
/// Implementations never move memory they have already handed out —
/// `extend` only ever grows the high-water mark.
pub trait HeapProvider {
    /// Grow the backing region by `bytes` and return a pointer to the
    /// start of the newly available bytes, or `None` if the provider
    /// cannot grow any further.
    fn extend(&mut self, bytes: usize) -> Option<*mut u8>;

    /// Lowest address ever handed out by this provider.
    fn heap_low(&self) -> *const u8;

    /// One past the highest address ever handed out by this provider.
    fn heap_high(&self) -> *const u8;
}

/// A [`HeapProvider`] over a caller-supplied `&mut [u8]`: `extend` bumps a
/// high-water mark through the slice and never relocates it. This is the
/// one concrete provider the crate ships; it backs both `no_std` arenas
/// (a `static mut` array, `.bss`-resident, the way `kernel-alloc`'s
/// `static_heap` module backs its free list) and the crate's own `std`
/// test suite (an ordinary heap-allocated buffer).
pub struct FixedRegionProvider<'a> {
    region: &'a mut [u8],
    used: usize,
}

impl<'a> FixedRegionProvider<'a> {
    /// Wrap `region` as the arena's entire backing store.
    ///
    /// # Panics
    /// Panics if `region`'s start address is not 8-byte aligned — every
    /// block and class-table slot the allocator writes assumes that
    /// alignment.
    #[must_use]
    pub fn new(region: &'a mut [u8]) -> Self {
        assert_eq!(
            region.as_ptr() as usize % 8,
            0,
            "FixedRegionProvider region must be 8-byte aligned"
        );
        Self { region, used: 0 }
    }
}

impl HeapProvider for FixedRegionProvider<'_> {
    fn extend(&mut self, bytes: usize) -> Option<*mut u8> {
        let new_used = self.used.checked_add(bytes)?;
        if new_used > self.region.len() {
            log::warn!(
                "FixedRegionProvider: refusing to extend by {bytes} bytes, \
                 only {} of {} remain",
                self.region.len() - self.used,
                self.region.len()
            );
            return None;
        }
        let ptr = unsafe { self.region.as_mut_ptr().add(self.used) };
        self.used = new_used;
        Some(ptr)
    }

    fn heap_low(&self) -> *const u8 {
        self.region.as_ptr()
    }

    fn heap_high(&self) -> *const u8 {
        unsafe { self.region.as_ptr().add(self.used) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_bumps_the_high_water_mark() {
        let mut buf = [0u8; 64];
        let mut provider = FixedRegionProvider::new(&mut buf);
        let p1 = provider.extend(16).expect("should extend");
        let p2 = provider.extend(16).expect("should extend");
        assert_eq!(unsafe { p1.add(16) }, p2);
        assert_eq!(provider.heap_high(), unsafe { provider.heap_low().add(32) });
    }

    #[test]
    fn extend_refuses_past_capacity() {
        let mut buf = [0u8; 16];
        let mut provider = FixedRegionProvider::new(&mut buf);
        assert!(provider.extend(8).is_some());
        assert!(provider.extend(16).is_none());
        assert!(provider.extend(8).is_some());
    }

    #[test]
    #[should_panic(expected = "8-byte aligned")]
    fn new_rejects_misaligned_regions() {
        let mut buf = [0u8; 24];
        // Pick whichever sub-slice start is guaranteed misaligned relative
        // to 8, regardless of where the test runner happened to place `buf`.
        let offset = if buf.as_ptr() as usize % 8 == 0 { 1 } else { 0 };
        let (_, tail) = buf.split_at_mut(offset);
        let _ = FixedRegionProvider::new(tail);
    }
}
