//! Byte-level constants shared across the allocator.

use crate::class;

/// Width of a header/footer word, in bytes.
pub(crate) const WORD: usize = 4;

/// Width of a pointer-sized quantity, in bytes — also the alignment every
/// payload pointer satisfies.
pub(crate) const DOUBLE_WORD: usize = 8;

/// Combined header+footer overhead of a block, in bytes.
pub(crate) const OVERHEAD: usize = 2 * WORD;

/// Minimum payload reserved in every free block for its prev/next links.
pub(crate) const MIN_PAYLOAD: usize = 16;

/// Minimum total block size: header, two link words, footer.
pub(crate) const MIN_BLOCK: usize = OVERHEAD + MIN_PAYLOAD;

/// Width of the class table occupying the front of the arena.
pub(crate) const CLASS_TABLE_BYTES: usize = class::TABLE_BYTES;

/// Chunk size used both to seed the arena on construction and to extend it
/// whenever no free block is large enough to satisfy a request.
pub(crate) const INITIAL_CHUNK_BYTES: usize = 1 << 9;

/// Round `n` up to the nearest multiple of 8.
#[must_use]
pub(crate) const fn align_up8(n: usize) -> usize {
    (n + (DOUBLE_WORD - 1)) & !(DOUBLE_WORD - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up8_rounds_to_the_next_multiple_of_eight() {
        assert_eq!(align_up8(0), 0);
        assert_eq!(align_up8(1), 8);
        assert_eq!(align_up8(8), 8);
        assert_eq!(align_up8(9), 16);
        assert_eq!(align_up8(24), 24);
    }

    #[test]
    fn min_block_is_twenty_four_bytes() {
        assert_eq!(MIN_BLOCK, 24);
    }
}
