/*!
 * Stress Tests
 * Randomized allocation churn with a shadow driver checking every invariant
 */

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ptr::NonNull;
use vm_heap::{Heap, HeapConfig};

const SIZES: [usize; 5] = [8, 16, 24, 32, 64];
const OPERATIONS: usize = 4_000;
const DESIRED_LIMIT: usize = 1_024;

fn stress_heap() -> Heap {
    Heap::with_config(
        HeapConfig::new()
            .with_heap_size(16 * 1024)
            .with_desired_limit(DESIRED_LIMIT),
    )
}

/// What the embedder remembers about its live blocks
struct Driver {
    live: Vec<(NonNull<u8>, usize)>,
}

impl Driver {
    fn live_bytes(&self) -> usize {
        self.live.iter().map(|(_, size)| size).sum()
    }
}

fn assert_invariants(heap: &Heap, driver: &Driver) {
    let regions = heap.free_regions();

    let mut free_bytes = 0;
    for pair in regions.windows(2) {
        assert!(pair[0].offset < pair[1].offset, "free list unsorted");
        assert!(
            pair[0].offset as usize + pair[0].size < pair[1].offset as usize,
            "unmerged neighbours: {pair:?}"
        );
    }
    for region in &regions {
        assert!(region.size > 0 && region.size % 8 == 0);
        assert!(region.offset as usize + region.size <= heap.area_size());
        free_bytes += region.size;
    }

    // Conservation: every byte is either free or accounted as allocated
    assert_eq!(free_bytes + heap.allocated_bytes(), heap.area_size());
    assert_eq!(heap.allocated_bytes(), driver.live_bytes());

    // The soft limit stays a step-multiple riding above usage
    assert!(heap.limit() >= heap.allocated_bytes());
    assert_eq!(heap.limit() % DESIRED_LIMIT, 0);

    // Live blocks are in-arena, aligned, and pairwise disjoint
    let mut spans: Vec<(usize, usize)> = driver
        .live
        .iter()
        .map(|(ptr, size)| (ptr.as_ptr() as usize, *size))
        .collect();
    spans.sort_unstable();
    for (addr, _) in &spans {
        assert_eq!(addr % 8, 0);
        assert!(heap.is_heap_pointer(*addr as *const u8));
    }
    for pair in spans.windows(2) {
        assert!(
            pair[0].0 + pair[0].1 <= pair[1].0,
            "overlapping live blocks: {pair:?}"
        );
    }
}

#[test]
fn test_random_churn_preserves_every_invariant() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut rng = StdRng::seed_from_u64(0x2b5_cafe);
    let mut heap = stress_heap();
    let mut driver = Driver { live: Vec::new() };
    let mut failed_allocs = 0u32;

    for _ in 0..OPERATIONS {
        if driver.live.is_empty() || rng.gen_bool(0.55) {
            let size = SIZES[rng.gen_range(0..SIZES.len())];
            match heap.try_alloc(size) {
                Some(block) => {
                    // Round-trip through the codec while we hold a
                    // known-valid arena pointer
                    assert_eq!(heap.decompress(heap.compress(block)), block);
                    driver.live.push((block, size));
                }
                None => failed_allocs += 1,
            }
        } else {
            let index = rng.gen_range(0..driver.live.len());
            let (block, size) = driver.live.swap_remove(index);
            heap.free(block, size);
        }
        assert_invariants(&heap, &driver);
    }

    // The arena is small enough that churn at these sizes must have hit
    // the wall at least once; otherwise the test exercised nothing
    assert!(failed_allocs > 0 || driver.live_bytes() < heap.area_size() / 2);

    for (block, size) in driver.live.drain(..) {
        heap.free(block, size);
    }
    assert_eq!(heap.allocated_bytes(), 0);
    assert_eq!(heap.free_regions().len(), 1);
    heap.finalize();
}

#[test]
fn test_driver_agreement_with_stored_size_blocks() {
    let mut rng = StdRng::seed_from_u64(0xfeed);
    // The stored-size variant allocates through the infallible path, so
    // give the churn plenty of headroom
    let mut heap = Heap::with_config(
        HeapConfig::new()
            .with_heap_size(64 * 1024)
            .with_desired_limit(4 * 1024),
    );
    let mut live: Vec<NonNull<u8>> = Vec::new();
    let mut expected = 0usize;

    for _ in 0..1_000 {
        if live.is_empty() || rng.gen_bool(0.6) {
            let size = SIZES[rng.gen_range(0..SIZES.len())];
            live.push(heap.alloc_stored(size));
            // Stored-size blocks carry one header unit of overhead
            expected += size + 8;
        } else {
            let index = rng.gen_range(0..live.len());
            let block = live.swap_remove(index);
            // The heap remembers the size; the driver does not have to
            let before = heap.allocated_bytes();
            heap.free_stored(block);
            expected -= before - heap.allocated_bytes();
        }
        assert_eq!(heap.allocated_bytes(), expected);
    }

    for block in live.drain(..) {
        heap.free_stored(block);
    }
    heap.finalize();
}
