/*!
 * Heap Limits and Constants
 *
 * Centralized location for the allocator's compile-time parameters.
 *
 * ## Design Philosophy
 * - All values include rationale comments explaining WHY they exist
 * - Performance-critical constants are marked with [PERF]
 */

/// Allocation unit and alignment guarantee (8 bytes)
/// Every block the allocator hands out is a multiple of this size and
/// aligned to it. Free-region headers occupy exactly one unit.
/// [PERF] 8 bytes covers the alignment of every primitive the runtime stores
pub const ALIGNMENT: usize = 8;

/// log2 of [`ALIGNMENT`], used by the compressed pointer codec
pub const ALIGNMENT_LOG: u32 = ALIGNMENT.trailing_zeros();

/// Number of bits a compressed pointer may occupy
/// Bounds the largest supported arena: 2^HEAP_OFFSET_LOG bytes
pub const HEAP_OFFSET_LOG: u32 = 19;

/// Largest arena size representable by the compressed pointer width (512 KiB)
pub const MAX_HEAP_SIZE: usize = 1 << HEAP_OFFSET_LOG;

/// Default arena size (512 KiB)
/// Sized for small embedded runtimes; override through `HeapConfig`
pub const DEFAULT_HEAP_SIZE: usize = MAX_HEAP_SIZE;

/// Default soft-limit step (1/32 of the arena)
/// The reclamation threshold rises and falls in steps of this size,
/// which keeps callback pressure hysteretic near a steady working set
pub const DEFAULT_DESIRED_LIMIT: usize = DEFAULT_HEAP_SIZE / 32;

/// Sentinel offset terminating the free list
/// Never a valid area offset: the area is bounded by [`MAX_HEAP_SIZE`]
pub const END_OFFSET: u32 = u32::MAX;
