//! Header/footer packing and block-pointer arithmetic.
//!
//! Every block is addressed by its *payload pointer* `bp`: the address the
//! allocator hands back to callers. The 4-byte header sits at `bp - WORD`;
//! the 4-byte footer sits at `bp + size - DOUBLE_WORD`, where `size` is the
//! block's total size including both tags. Packing size and the allocated
//! bit into one 32-bit word relies on every block size being a multiple of
//! 8, which leaves the low three bits free.

use crate::layout::{DOUBLE_WORD, WORD};
use core::ptr;

/// Pack a `size` (a multiple of 8) and an `allocated` flag into one
/// boundary-tag word.
pub(crate) fn pack(size: usize, allocated: bool) -> u32 {
    debug_assert_eq!(size & 0x7, 0, "block size must be a multiple of 8");
    (size as u32) | u32::from(allocated)
}

/// # Safety
/// `p` must be a valid, 4-byte-aligned pointer into the arena.
unsafe fn read_word(p: *mut u8) -> u32 {
    unsafe { ptr::read(p.cast::<u32>()) }
}

/// # Safety
/// `p` must be a valid, writable, 4-byte-aligned pointer into the arena.
unsafe fn write_word(p: *mut u8, value: u32) {
    unsafe { ptr::write(p.cast::<u32>(), value) }
}

/// Address of `bp`'s header.
///
/// # Safety
/// `bp` must be a valid block payload pointer.
pub(crate) unsafe fn header_of(bp: *mut u8) -> *mut u8 {
    unsafe { bp.sub(WORD) }
}

/// Total size of the block at `bp`, header and footer included.
///
/// # Safety
/// `bp`'s header must be initialized.
pub(crate) unsafe fn size_of_block(bp: *mut u8) -> usize {
    (unsafe { read_word(header_of(bp)) } & !0x7) as usize
}

/// Whether the block at `bp` is currently allocated.
///
/// # Safety
/// `bp`'s header must be initialized.
pub(crate) unsafe fn is_allocated(bp: *mut u8) -> bool {
    unsafe { read_word(header_of(bp)) } & 1 != 0
}

/// Write matching header and footer for a block of `size` bytes starting at
/// `bp`, with the given allocated flag. `size` must be at least
/// `2 * DOUBLE_WORD` so there is room for both tags.
///
/// # Safety
/// `[bp - WORD, bp + size - WORD)` must be valid, writable arena memory.
pub(crate) unsafe fn write_header_footer(bp: *mut u8, size: usize, allocated: bool) {
    let tag = pack(size, allocated);
    unsafe {
        write_word(header_of(bp), tag);
        write_word(bp.add(size - DOUBLE_WORD), tag);
    }
}

/// Payload pointer of the block immediately following `bp` in address
/// order.
///
/// # Safety
/// `bp`'s header must be initialized, and the next block must lie within
/// the arena — guaranteed for any in-heap `bp` by the epilogue sentinel.
pub(crate) unsafe fn next_block(bp: *mut u8) -> *mut u8 {
    unsafe { bp.add(size_of_block(bp)) }
}

/// Payload pointer of the block immediately preceding `bp` in address
/// order, found via the previous block's footer at `bp - DOUBLE_WORD`.
///
/// # Safety
/// The previous block's footer must be initialized and within the arena —
/// guaranteed for any in-heap `bp` by the prologue sentinel.
pub(crate) unsafe fn prev_block(bp: *mut u8) -> *mut u8 {
    let prev_size = (unsafe { read_word(bp.sub(DOUBLE_WORD)) } & !0x7) as usize;
    unsafe { bp.sub(prev_size) }
}

/// Raw header word at `bp`, exposed for the consistency checker.
#[cfg(any(test, feature = "check"))]
pub(crate) unsafe fn header_word(bp: *mut u8) -> u32 {
    unsafe { read_word(header_of(bp)) }
}

/// Raw footer word at `bp`, exposed for the consistency checker.
#[cfg(any(test, feature = "check"))]
pub(crate) unsafe fn footer_word(bp: *mut u8) -> u32 {
    unsafe { read_word(bp.add(size_of_block(bp) - DOUBLE_WORD)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::align_up8;

    #[test]
    fn header_and_footer_round_trip_through_a_buffer() {
        let mut buf = [0u8; 64];
        // bp sits 4 bytes in, leaving room for a header before it.
        let bp = unsafe { buf.as_mut_ptr().add(4) };
        unsafe {
            write_header_footer(bp, 32, true);
            assert_eq!(size_of_block(bp), 32);
            assert!(is_allocated(bp));

            write_header_footer(bp, 32, false);
            assert!(!is_allocated(bp));
        }
    }

    #[test]
    fn pack_preserves_size_and_flag() {
        assert_eq!(pack(align_up8(24), true) & !0x7, 24);
        assert_eq!(pack(align_up8(24), true) & 1, 1);
        assert_eq!(pack(align_up8(24), false) & 1, 0);
    }
}
