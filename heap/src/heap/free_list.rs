/*!
 * Free-List Engine
 * First-fit allocation, splitting, and two-sided coalescing
 */

use super::arena::{region_end, FreeHeader};
use super::Heap;
use crate::core::hints::{likely, unlikely};
use crate::core::limits::{ALIGNMENT, END_OFFSET};
use crate::core::types::Size;
use std::mem::size_of;
use std::ptr::NonNull;

/// Round a request up to the next multiple of the alignment unit
#[inline(always)]
pub(crate) const fn align_up(size: Size) -> Size {
    size.saturating_add(ALIGNMENT - 1) & !(ALIGNMENT - 1)
}

impl Heap {
    /// Allocate a block, reclaiming on pressure.
    ///
    /// Diverges through the fatal handler if the area is exhausted even
    /// after every reclamation hook has run. A zero-size request returns
    /// a dangling pointer that must not be freed.
    pub fn alloc(&mut self, size: Size) -> NonNull<u8> {
        if unlikely(size == 0) {
            return NonNull::dangling();
        }
        match self.reclaim_and_alloc(size) {
            Some(block) => block,
            None => self.fatal_oom(size),
        }
    }

    /// Allocate a block, reclaiming on pressure.
    ///
    /// Returns `None` when the request cannot be satisfied, or when
    /// `size` is zero.
    pub fn try_alloc(&mut self, size: Size) -> Option<NonNull<u8>> {
        if unlikely(size == 0) {
            return None;
        }
        self.reclaim_and_alloc(size)
    }

    /// Allocate a block that remembers its own size, for callers that
    /// cannot carry it to the matching [`free_stored`](Heap::free_stored).
    pub fn alloc_stored(&mut self, size: Size) -> NonNull<u8> {
        if unlikely(size == 0) {
            return NonNull::dangling();
        }
        let total = size.saturating_add(size_of::<FreeHeader>());
        let block = self.alloc(total);
        unsafe {
            // total fits in u32: the allocation just succeeded, so it is
            // no larger than the area
            block.cast::<FreeHeader>().as_ptr().write(FreeHeader {
                next_offset: 0,
                size: total as u32,
            });
            NonNull::new_unchecked(block.as_ptr().add(size_of::<FreeHeader>()))
        }
    }

    /// Return a block obtained from [`alloc_stored`](Heap::alloc_stored)
    pub fn free_stored(&mut self, ptr: NonNull<u8>) {
        unsafe {
            let header = ptr.as_ptr().sub(size_of::<FreeHeader>()).cast::<FreeHeader>();
            let size = (*header).size as Size;
            self.free(NonNull::new_unchecked(header.cast::<u8>()), size);
        }
    }

    /// Engine allocation: no reclamation, no retries.
    pub(crate) fn alloc_block(&mut self, size: Size) -> Option<NonNull<u8>> {
        let required = align_up(size);
        let mut taken: *mut FreeHeader = std::ptr::null_mut();

        unsafe {
            let anchor = self.arena.anchor();

            // Fast path for single-unit requests: the first region is
            // always big enough to carve one unit from.
            if required == ALIGNMENT && likely((*anchor).next_offset != END_OFFSET) {
                let first = self.arena.header_at((*anchor).next_offset);
                debug_assert!(self.is_heap_pointer(first.cast()));
                taken = first;
                self.allocated_bytes += ALIGNMENT;
                self.stat_alloc_iter();

                if (*first).size as Size == ALIGNMENT {
                    (*anchor).next_offset = (*first).next_offset;
                } else {
                    debug_assert!((*first).size as Size > ALIGNMENT);
                    let remaining = first.cast::<u8>().add(ALIGNMENT).cast::<FreeHeader>();
                    (*remaining).size = (*first).size - ALIGNMENT as u32;
                    (*remaining).next_offset = (*first).next_offset;
                    (*anchor).next_offset = self.arena.offset_in_area(remaining.cast());
                }

                if unlikely(taken == self.skip) {
                    self.skip = if (*anchor).next_offset == END_OFFSET {
                        anchor
                    } else {
                        self.arena.header_at((*anchor).next_offset)
                    };
                }
            } else {
                // General path: first fit in ascending address order
                let mut prev = anchor;
                let mut current_offset = (*anchor).next_offset;
                while current_offset != END_OFFSET {
                    let current = self.arena.header_at(current_offset);
                    debug_assert!(self.is_heap_pointer(current.cast()));
                    self.stat_alloc_iter();
                    let next_offset = (*current).next_offset;

                    if (*current).size as Size >= required {
                        taken = current;
                        self.allocated_bytes += required;

                        if (*current).size as Size > required {
                            let remaining = current.cast::<u8>().add(required).cast::<FreeHeader>();
                            (*remaining).size = (*current).size - required as u32;
                            (*remaining).next_offset = next_offset;
                            (*prev).next_offset = self.arena.offset_in_area(remaining.cast());
                        } else {
                            // Exact fit: splice the region out
                            (*prev).next_offset = next_offset;
                        }

                        self.skip = prev;
                        break;
                    }

                    prev = current;
                    current_offset = next_offset;
                }
            }
        }

        while self.allocated_bytes >= self.limit {
            self.limit += self.desired_limit;
        }

        if unlikely(taken.is_null()) {
            return None;
        }

        debug_assert_eq!(taken as usize % ALIGNMENT, 0);
        self.stat_alloc(size);
        Some(unsafe { NonNull::new_unchecked(taken.cast()) })
    }

    /// Return a block to the free list, coalescing with physically
    /// adjacent neighbours.
    ///
    /// `ptr` and `size` must match an earlier allocation (sizes that
    /// round up to the same aligned size are equivalent). Freeing a
    /// foreign pointer, freeing twice, or passing the wrong size is
    /// undefined; debug builds assert what they can.
    pub fn free(&mut self, ptr: NonNull<u8>, size: Size) {
        debug_assert!(self.is_heap_pointer(ptr.as_ptr()));
        debug_assert!(size > 0);
        debug_assert!(self.limit >= self.allocated_bytes);

        let aligned_size = align_up(size);
        self.stat_free_iter();

        unsafe {
            let anchor = self.arena.anchor();
            let mut block = ptr.as_ptr().cast::<FreeHeader>();

            // Frees cluster in the same neighbourhood, so resume from the
            // last-touched node when it lies below the block.
            let mut prev = if block > self.skip {
                self.stat_skip();
                self.skip
            } else {
                self.stat_nonskip();
                anchor
            };

            let block_offset = self.arena.offset_in_area(block.cast());
            while (*prev).next_offset < block_offset {
                let next = self.arena.header_at((*prev).next_offset);
                debug_assert!(self.is_heap_pointer(next.cast()));
                prev = next;
                self.stat_free_iter();
            }
            let next_offset = (*prev).next_offset;

            if region_end(prev) == block.cast::<u8>() {
                // Merge into the predecessor
                (*prev).size += aligned_size as u32;
                block = prev;
            } else {
                (*block).size = aligned_size as u32;
                (*prev).next_offset = block_offset;
            }

            let mut merged_next = false;
            if next_offset != END_OFFSET {
                let next = self.arena.header_at(next_offset);
                if region_end(block) == next.cast::<u8>() {
                    // Merge the successor in
                    if unlikely(next == self.skip) {
                        self.skip = block;
                    }
                    (*block).size += (*next).size;
                    (*block).next_offset = (*next).next_offset;
                    merged_next = true;
                }
            }
            if !merged_next {
                (*block).next_offset = next_offset;
            }

            self.skip = prev;
        }

        debug_assert!(self.allocated_bytes >= aligned_size);
        self.allocated_bytes -= aligned_size;

        while self.allocated_bytes + self.desired_limit <= self.limit
            && self.limit > self.desired_limit
        {
            self.limit -= self.desired_limit;
        }

        debug_assert!(self.limit >= self.allocated_bytes);
        self.stat_free(size);
    }
}
