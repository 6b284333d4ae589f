/*!
 * Arena Heap
 *
 * Fixed-capacity, single-arena allocator with memory-pressure feedback.
 *
 * ## Allocation
 *
 * A **first-fit free list** threaded through the arena itself:
 * - **Single-unit fast path**: requests of exactly one alignment unit are
 *   carved off the first free region without walking the list
 * - **General path**: first region large enough wins; oversized regions
 *   are split and the remainder re-linked in place
 * - **Coalescing**: freed blocks merge with physically adjacent
 *   neighbours on both sides, so the list never holds two touching nodes
 * - **Skip-ahead hint**: the list node touched most recently shortens the
 *   linear walk that frees in the same neighbourhood would otherwise repeat
 *
 * ## Pressure feedback
 *
 * A soft limit rides above the allocated byte count in fixed steps.
 * Crossing it, or failing an allocation outright, runs the embedder's
 * registered reclamation hooks (typically a garbage collector) at
 * escalating severity before the allocation is retried or given up on.
 *
 * ## Compressed pointers
 *
 * Arena pointers compress to a 32-bit offset word so object fields can
 * store references in far less than a native pointer. The all-zero
 * encoding is reserved: the anchor header occupies offset zero, so no
 * valid area pointer ever compresses to it and `Option<CompressedPtr>`
 * is the nullable form at no extra width.
 *
 * The heap is single-threaded by construction: every operation takes
 * `&mut self`, and the type is deliberately not `Sync`. A multi-threaded
 * embedder must serialize access externally.
 */

mod arena;
mod codec;
mod free_list;
mod pressure;
mod stats;
pub mod traits;
pub mod types;

pub use codec::CompressedPtr;
pub use traits::ReclaimHook;
pub use types::{FreeRegion, HeapConfig, HeapError, PressureLevel, ReclaimHookId};

#[cfg(feature = "stats")]
pub use types::HeapStats;

use crate::core::limits::END_OFFSET;
use crate::core::types::Size;
use arena::{FreeHeader, RawArena};
use log::info;

fn default_fatal(err: HeapError) -> ! {
    panic!("{err}");
}

/// The allocator instance. One per runtime.
pub struct Heap {
    pub(crate) arena: RawArena,
    /// Sum of the aligned sizes of live allocations
    pub(crate) allocated_bytes: Size,
    /// Soft threshold that triggers reclamation hooks when approached
    pub(crate) limit: Size,
    pub(crate) desired_limit: Size,
    /// Recently touched list node; always the anchor or a live node
    pub(crate) skip: *mut FreeHeader,
    pub(crate) hooks: Vec<(ReclaimHookId, Box<dyn ReclaimHook>)>,
    pub(crate) next_hook_id: u64,
    /// Invoked when the infallible allocation path exhausts reclamation
    pub(crate) fatal: fn(HeapError) -> !,
    #[cfg(feature = "stats")]
    pub(crate) stats: HeapStats,
}

impl Heap {
    pub fn new() -> Self {
        Self::with_config(HeapConfig::default())
    }

    /// Create a heap with a custom arena size and soft-limit step
    pub fn with_config(config: HeapConfig) -> Self {
        config.validate();
        let arena = RawArena::new(config.heap_size);
        let anchor = arena.anchor();
        #[cfg(feature = "stats")]
        let area_size = arena.area_size();

        let heap = Self {
            arena,
            allocated_bytes: 0,
            limit: config.desired_limit,
            desired_limit: config.desired_limit,
            skip: anchor,
            hooks: Vec::new(),
            next_hook_id: 0,
            fatal: default_fatal,
            #[cfg(feature = "stats")]
            stats: HeapStats::new(area_size),
        };

        unsafe {
            // One region covering the whole area, pinned by the anchor
            (*anchor).size = 0;
            (*anchor).next_offset = 0;
            let first = heap.arena.header_at(0);
            (*first).size = heap.arena.area_size() as u32;
            (*first).next_offset = END_OFFSET;
        }

        info!(
            "heap initialized: {} byte arena, {} usable, soft-limit step {}",
            config.heap_size,
            heap.arena.area_size(),
            config.desired_limit
        );
        heap
    }

    /// Tear the heap down. Every allocation must have been returned.
    pub fn finalize(self) {
        debug_assert_eq!(
            self.allocated_bytes, 0,
            "heap finalized with live allocations"
        );
        info!("heap finalized");
    }

    /// Sum of the aligned sizes of live allocations
    pub fn allocated_bytes(&self) -> Size {
        self.allocated_bytes
    }

    /// Current soft limit
    pub fn limit(&self) -> Size {
        self.limit
    }

    /// Usable area size in bytes
    pub fn area_size(&self) -> Size {
        self.arena.area_size()
    }

    /// Replace the handler invoked when the infallible allocation path
    /// runs out of memory. The default panics with the error.
    pub fn set_fatal_handler(&mut self, handler: fn(HeapError) -> !) {
        self.fatal = handler;
    }

    /// Snapshot of the free list in address order
    pub fn free_regions(&self) -> Vec<FreeRegion> {
        let mut regions = Vec::new();
        unsafe {
            let mut offset = (*self.arena.anchor()).next_offset;
            while offset != END_OFFSET {
                let header = self.arena.header_at(offset);
                regions.push(FreeRegion {
                    offset,
                    size: (*header).size as Size,
                });
                offset = (*header).next_offset;
            }
        }
        regions
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}
