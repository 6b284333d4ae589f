/*!
 * Core Types
 * Common types used across the allocator
 */

/// Size type for memory operations
pub type Size = usize;

/// Byte offset into the heap area
pub type Offset = u32;
