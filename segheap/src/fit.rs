//! First-fit search over the size-class free lists.

use crate::{block, class, free_list};

/// Find a free block at least `asize` bytes, starting the search at
/// `class_of(asize)` and scanning ascending classes. First fit within each
/// list; no special case for a list holding exactly one block — every
/// candidate is checked the same way.
///
/// Returns null if no class from `class_of(asize)` upward holds a block
/// large enough.
///
/// # Safety
/// `base` must point at a valid, fully initialized class table.
pub(crate) unsafe fn find_fit(base: *mut u8, asize: usize) -> *mut u8 {
    let start = class::class_of(asize);
    for class in start..class::NUM_CLASSES {
        let mut bp = unsafe { free_list::head(class::slot(base, class)) };
        while !bp.is_null() {
            if unsafe { block::size_of_block(bp) } >= asize {
                return bp;
            }
            bp = unsafe { free_list::next(bp) };
        }
    }
    core::ptr::null_mut()
}
