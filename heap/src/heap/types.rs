/*!
 * Heap Types
 * Common types for the arena allocator
 */

use crate::core::limits::{ALIGNMENT, DEFAULT_DESIRED_LIMIT, DEFAULT_HEAP_SIZE, MAX_HEAP_SIZE};
use crate::core::types::{Offset, Size};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Heap errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeapError {
    #[error("out of memory: requested {requested} bytes ({allocated} allocated / {area_size} usable)")]
    OutOfMemory {
        requested: Size,
        allocated: Size,
        area_size: Size,
    },
}

/// Severity passed to reclamation hooks
///
/// `Low` asks the embedder to give back memory it can part with cheaply;
/// `High` asks for everything it can possibly spare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PressureLevel {
    Low,
    High,
}

impl PressureLevel {
    /// Severities in the order the controller escalates through them
    pub const ESCALATION: [PressureLevel; 2] = [PressureLevel::Low, PressureLevel::High];
}

impl std::fmt::Display for PressureLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            PressureLevel::Low => write!(f, "LOW"),
            PressureLevel::High => write!(f, "HIGH"),
        }
    }
}

/// Arena configuration
///
/// The defaults come from `core::limits`; tests and small embedders
/// shrink the arena through the builder methods.
#[derive(Debug, Clone, Copy)]
pub struct HeapConfig {
    /// Total arena bytes, including the anchor unit
    pub heap_size: Size,
    /// Soft-limit step for the pressure controller
    pub desired_limit: Size,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            heap_size: DEFAULT_HEAP_SIZE,
            desired_limit: DEFAULT_DESIRED_LIMIT,
        }
    }
}

impl HeapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_heap_size(mut self, heap_size: Size) -> Self {
        self.heap_size = heap_size;
        self
    }

    pub fn with_desired_limit(mut self, desired_limit: Size) -> Self {
        self.desired_limit = desired_limit;
        self
    }

    /// A bad configuration is a programmer error with no recovery path,
    /// so validation asserts instead of returning an error.
    pub(crate) fn validate(&self) {
        assert!(
            self.heap_size % ALIGNMENT == 0,
            "heap size {} is not a multiple of the {}-byte alignment",
            self.heap_size,
            ALIGNMENT
        );
        assert!(
            self.heap_size >= 2 * ALIGNMENT,
            "heap size {} leaves no usable area after the anchor unit",
            self.heap_size
        );
        assert!(
            self.heap_size <= MAX_HEAP_SIZE,
            "heap size {} exceeds the {}-byte compressed pointer range",
            self.heap_size,
            MAX_HEAP_SIZE
        );
        assert!(self.desired_limit > 0, "soft-limit step must be nonzero");
    }
}

/// Snapshot of one free region, for observability and invariant checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeRegion {
    /// Byte offset from the start of the usable area
    pub offset: Offset,
    /// Total region size in bytes
    pub size: Size,
}

/// Handle returned by hook registration, used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReclaimHookId(pub(crate) u64);

/// Heap usage statistics
#[cfg(feature = "stats")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeapStats {
    /// Usable area size in bytes
    pub size: Size,
    pub allocated_bytes: Size,
    pub peak_allocated_bytes: Size,
    pub global_peak_allocated_bytes: Size,
    /// Bytes lost to rounding requests up to the alignment
    pub waste_bytes: Size,
    pub peak_waste_bytes: Size,
    pub global_peak_waste_bytes: Size,
    pub alloc_count: u64,
    pub free_count: u64,
    /// Frees that started their list walk from the skip-ahead hint
    pub skip_count: u64,
    /// Frees that fell back to walking from the anchor
    pub nonskip_count: u64,
    pub alloc_iter_count: u64,
    pub free_iter_count: u64,
}

#[cfg(feature = "stats")]
impl HeapStats {
    pub(crate) fn new(size: Size) -> Self {
        Self {
            size,
            allocated_bytes: 0,
            peak_allocated_bytes: 0,
            global_peak_allocated_bytes: 0,
            waste_bytes: 0,
            peak_waste_bytes: 0,
            global_peak_waste_bytes: 0,
            alloc_count: 0,
            free_count: 0,
            skip_count: 0,
            nonskip_count: 0,
            alloc_iter_count: 0,
            free_iter_count: 0,
        }
    }

    /// Fraction of frees that used the skip-ahead hint, 0.0 when none ran
    pub fn skip_ahead_ratio(&self) -> f64 {
        let total = self.skip_count + self.nonskip_count;
        if total == 0 {
            0.0
        } else {
            self.skip_count as f64 / total as f64
        }
    }

    /// Average list nodes visited per allocation, 0.0 before the first one
    pub fn average_alloc_iterations(&self) -> f64 {
        if self.alloc_count == 0 {
            0.0
        } else {
            self.alloc_iter_count as f64 / self.alloc_count as f64
        }
    }

    /// Average list nodes visited per free, 0.0 before the first one
    pub fn average_free_iterations(&self) -> f64 {
        if self.free_count == 0 {
            0.0
        } else {
            self.free_iter_count as f64 / self.free_count as f64
        }
    }
}

#[cfg(feature = "stats")]
impl std::fmt::Display for HeapStats {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "Heap stats:")?;
        writeln!(f, "  Area size = {} bytes", self.size)?;
        writeln!(f, "  Allocated = {} bytes", self.allocated_bytes)?;
        writeln!(f, "  Waste = {} bytes", self.waste_bytes)?;
        writeln!(f, "  Peak allocated = {} bytes", self.peak_allocated_bytes)?;
        writeln!(f, "  Peak waste = {} bytes", self.peak_waste_bytes)?;
        writeln!(f, "  Skip-ahead ratio = {:.4}", self.skip_ahead_ratio())?;
        writeln!(
            f,
            "  Average alloc iteration = {:.4}",
            self.average_alloc_iterations()
        )?;
        writeln!(
            f,
            "  Average free iteration = {:.4}",
            self.average_free_iterations()
        )
    }
}
