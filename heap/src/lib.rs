/*!
 * VM Heap Library
 * Fixed-capacity arena allocator core for embedded language runtimes
 */

pub mod core;
pub mod heap;

pub use heap::{
    CompressedPtr, FreeRegion, Heap, HeapConfig, HeapError, PressureLevel, ReclaimHook,
    ReclaimHookId,
};

#[cfg(feature = "stats")]
pub use heap::HeapStats;
