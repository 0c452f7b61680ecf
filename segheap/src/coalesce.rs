//! Immediate-neighbor boundary-tag coalescing.
//!
//! A newly freed (or newly extended) block is merged with whichever of its
//! address-order neighbors are themselves free, using the classic four
//! cases. The prologue and epilogue sentinels are always marked allocated,
//! so a block at either end of the arena simply finds an "allocated"
//! neighbor and no out-of-bounds check is ever needed. The degenerate case
//! — a fresh arena's very first block, with both the prologue and the not
//! yet written epilogue acting as allocated neighbors — falls naturally out
//! of the "both allocated" branch, which inserts through
//! [`free_list::insert_at_root`] and therefore through [`free_list::init`]
//! whenever the target list is still empty.

use crate::{block, class, free_list};

/// Merge `bp` with any free neighbors and insert the resulting block into
/// its size class's free list. Returns the payload pointer of the merged
/// block (which may not be `bp` if the previous block absorbed it).
///
/// # Safety
/// `bp` must be a valid, currently free block with initialized
/// header/footer, flanked by initialized blocks on both sides (guaranteed
/// for any in-arena block by the prologue/epilogue sentinels).
pub(crate) unsafe fn coalesce(base: *mut u8, bp: *mut u8) -> *mut u8 {
    let prev_alloc = unsafe { block::is_allocated(block::prev_block(bp)) };
    let next_alloc = unsafe { block::is_allocated(block::next_block(bp)) };
    let mut size = unsafe { block::size_of_block(bp) };

    match (prev_alloc, next_alloc) {
        (true, true) => {
            log::trace!("coalesce: no merge, both neighbors allocated");
            unsafe {
                let slot = class::slot(base, class::class_of(size));
                free_list::insert_at_root(slot, bp);
            }
            bp
        }
        (true, false) => unsafe {
            let next = block::next_block(bp);
            let next_size = block::size_of_block(next);
            free_list::remove(class::slot(base, class::class_of(next_size)), next);

            size += next_size;
            block::write_header_footer(bp, size, false);
            free_list::insert_at_root(class::slot(base, class::class_of(size)), bp);
            log::trace!("coalesce: merged with next block, new size {size}");
            bp
        },
        (false, true) => unsafe {
            let prev = block::prev_block(bp);
            let prev_size = block::size_of_block(prev);
            free_list::remove(class::slot(base, class::class_of(prev_size)), prev);

            size += prev_size;
            block::write_header_footer(prev, size, false);
            free_list::insert_at_root(class::slot(base, class::class_of(size)), prev);
            log::trace!("coalesce: merged with previous block, new size {size}");
            prev
        },
        (false, false) => unsafe {
            let prev = block::prev_block(bp);
            let next = block::next_block(bp);
            let prev_size = block::size_of_block(prev);
            let next_size = block::size_of_block(next);
            free_list::remove(class::slot(base, class::class_of(prev_size)), prev);
            free_list::remove(class::slot(base, class::class_of(next_size)), next);

            size += prev_size + next_size;
            block::write_header_footer(prev, size, false);
            free_list::insert_at_root(class::slot(base, class::class_of(size)), prev);
            log::trace!("coalesce: merged with both neighbors, new size {size}");
            prev
        },
    }
}
