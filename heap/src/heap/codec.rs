/*!
 * Compressed Pointer Codec
 * Narrow offset encoding for arena pointers
 */

use super::Heap;
use crate::core::limits::{ALIGNMENT, ALIGNMENT_LOG, HEAP_OFFSET_LOG};
use std::num::NonZeroU32;
use std::ptr::NonNull;

/// An arena pointer packed into an offset word.
///
/// The encoding is `(ptr - heap_base) >> ALIGNMENT_LOG`, which fits in
/// [`HEAP_OFFSET_LOG`] bits. Zero never encodes a valid area pointer
/// (the anchor header occupies offset zero), so the nonzero niche makes
/// `Option<CompressedPtr>` the same width as the word itself; `None`
/// plays the role of the reserved null encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompressedPtr(NonZeroU32);

impl CompressedPtr {
    /// The raw offset word
    pub fn raw(self) -> u32 {
        self.0.get()
    }
}

impl Heap {
    /// Pack an arena pointer into its offset word.
    ///
    /// `ptr` must come from this heap and carry the allocator's
    /// alignment.
    pub fn compress(&self, ptr: NonNull<u8>) -> CompressedPtr {
        debug_assert!(self.is_heap_pointer(ptr.as_ptr()));
        debug_assert_eq!(ptr.as_ptr() as usize % ALIGNMENT, 0);

        let raw = (ptr.as_ptr() as usize - self.arena.base() as usize) >> ALIGNMENT_LOG;
        debug_assert_eq!(raw >> HEAP_OFFSET_LOG, 0);

        CompressedPtr(
            NonZeroU32::new(raw as u32).expect("offset zero is reserved for the null encoding"),
        )
    }

    /// Unpack an offset word produced by [`compress`](Heap::compress)
    pub fn decompress(&self, compressed: CompressedPtr) -> NonNull<u8> {
        let ptr = unsafe {
            self.arena
                .base()
                .add((compressed.raw() as usize) << ALIGNMENT_LOG)
        };
        debug_assert!(self.is_heap_pointer(ptr));
        unsafe { NonNull::new_unchecked(ptr) }
    }

    /// Whether a pointer lies within the usable area.
    ///
    /// Intended for assertion checks only.
    pub fn is_heap_pointer(&self, ptr: *const u8) -> bool {
        self.arena.contains(ptr)
    }
}
