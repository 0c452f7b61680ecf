//! Split-or-consume placement of a found free block.

use crate::layout::MIN_BLOCK;
use crate::{block, class, free_list};

/// Place a request of `asize` bytes into the free block `bp`, splitting off
/// and re-freeing the remainder when it would be at least `MIN_BLOCK`
/// bytes, consuming the whole block otherwise. Exactly one header/footer
/// pair is written per branch.
///
/// # Safety
/// `bp` must be a free block of at least `asize` bytes, currently linked
/// into the free list for its size class.
pub(crate) unsafe fn place(base: *mut u8, bp: *mut u8, asize: usize) {
    let csize = unsafe { block::size_of_block(bp) };
    unsafe { free_list::remove(class::slot(base, class::class_of(csize)), bp) };

    let remainder_size = csize - asize;
    if remainder_size >= MIN_BLOCK {
        unsafe {
            block::write_header_footer(bp, asize, true);

            let remainder = bp.add(asize);
            block::write_header_footer(remainder, remainder_size, false);
            free_list::insert_at_root(class::slot(base, class::class_of(remainder_size)), remainder);
        }
        log::trace!("place: split into {asize} allocated + {remainder_size} free bytes");
    } else {
        unsafe { block::write_header_footer(bp, csize, true) };
    }
}
