/*!
 * Heap Statistics
 * Usage counters behind the `stats` feature
 */

#[cfg(feature = "stats")]
use super::free_list::align_up;
use super::Heap;
use crate::core::types::Size;
#[cfg(feature = "stats")]
use log::info;

#[cfg(feature = "stats")]
use super::types::HeapStats;

#[cfg(feature = "stats")]
impl Heap {
    /// Snapshot of the usage counters
    pub fn stats(&self) -> HeapStats {
        self.stats.clone()
    }

    /// Reset the resettable peaks to the current values. The global
    /// peaks keep their lifetime maxima.
    pub fn reset_peak_stats(&mut self) {
        self.stats.peak_allocated_bytes = self.stats.allocated_bytes;
        self.stats.peak_waste_bytes = self.stats.waste_bytes;
    }

    /// Emit the formatted counters through the logging facade
    pub fn log_stats(&self) {
        info!("{}", self.stats);
    }

    pub(crate) fn stat_alloc(&mut self, size: Size) {
        let aligned_size = align_up(size);
        let waste = aligned_size - size;

        self.stats.allocated_bytes += aligned_size;
        self.stats.waste_bytes += waste;
        self.stats.alloc_count += 1;

        if self.stats.allocated_bytes > self.stats.peak_allocated_bytes {
            self.stats.peak_allocated_bytes = self.stats.allocated_bytes;
        }
        if self.stats.allocated_bytes > self.stats.global_peak_allocated_bytes {
            self.stats.global_peak_allocated_bytes = self.stats.allocated_bytes;
        }

        if self.stats.waste_bytes > self.stats.peak_waste_bytes {
            self.stats.peak_waste_bytes = self.stats.waste_bytes;
        }
        if self.stats.waste_bytes > self.stats.global_peak_waste_bytes {
            self.stats.global_peak_waste_bytes = self.stats.waste_bytes;
        }
    }

    pub(crate) fn stat_free(&mut self, size: Size) {
        let aligned_size = align_up(size);
        let waste = aligned_size - size;

        self.stats.free_count += 1;
        self.stats.allocated_bytes -= aligned_size;
        self.stats.waste_bytes -= waste;
    }

    pub(crate) fn stat_skip(&mut self) {
        self.stats.skip_count += 1;
    }

    pub(crate) fn stat_nonskip(&mut self) {
        self.stats.nonskip_count += 1;
    }

    pub(crate) fn stat_alloc_iter(&mut self) {
        self.stats.alloc_iter_count += 1;
    }

    pub(crate) fn stat_free_iter(&mut self) {
        self.stats.free_iter_count += 1;
    }
}

#[cfg(not(feature = "stats"))]
impl Heap {
    #[inline(always)]
    pub(crate) fn stat_alloc(&mut self, _size: Size) {}

    #[inline(always)]
    pub(crate) fn stat_free(&mut self, _size: Size) {}

    #[inline(always)]
    pub(crate) fn stat_skip(&mut self) {}

    #[inline(always)]
    pub(crate) fn stat_nonskip(&mut self) {}

    #[inline(always)]
    pub(crate) fn stat_alloc_iter(&mut self) {}

    #[inline(always)]
    pub(crate) fn stat_free_iter(&mut self) {}
}
