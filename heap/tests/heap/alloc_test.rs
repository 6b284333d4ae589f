/*!
 * Allocation Tests
 * Alignment, containment, first-fit order, and size-stored blocks
 */

use pretty_assertions::assert_eq;
use vm_heap::{FreeRegion, Heap, HeapConfig};

fn small_heap() -> Heap {
    Heap::with_config(HeapConfig::new().with_heap_size(512).with_desired_limit(128))
}

#[test]
fn test_first_allocation_carves_the_area_start() {
    let mut heap = small_heap();
    let block = heap.alloc(8);

    assert_eq!(heap.allocated_bytes(), 8);
    assert_eq!(heap.compress(block).raw(), 1);
    assert_eq!(
        heap.free_regions(),
        vec![FreeRegion {
            offset: 8,
            size: 496
        }]
    );

    heap.free(block, 8);
    heap.finalize();
}

#[test]
fn test_sequential_allocations_are_adjacent() {
    let mut heap = small_heap();
    let first = heap.alloc(24);
    let second = heap.alloc(8);

    assert_eq!(
        second.as_ptr() as usize,
        first.as_ptr() as usize + 24,
        "second block should start right after the first"
    );
    assert_eq!(heap.allocated_bytes(), 32);

    heap.free(second, 8);
    heap.free(first, 24);
    heap.finalize();
}

#[test]
fn test_returned_pointers_are_aligned() {
    let mut heap = small_heap();
    let mut live = Vec::new();

    for size in [1usize, 7, 8, 9, 15, 16, 17, 63] {
        let block = heap.try_alloc(size).expect("area has room for every size");
        assert_eq!(block.as_ptr() as usize % 8, 0, "request of {size} bytes");
        assert!(heap.is_heap_pointer(block.as_ptr()));
        live.push((block, size));
    }

    for (block, size) in live.into_iter().rev() {
        heap.free(block, size);
    }
    assert_eq!(heap.allocated_bytes(), 0);
    heap.finalize();
}

#[test]
fn test_blocks_are_fully_usable() {
    let mut heap = small_heap();
    let block = heap.alloc(24);

    // Allocated blocks carry no in-band metadata, so the whole block is
    // the caller's to scribble on
    unsafe { std::ptr::write_bytes(block.as_ptr(), 0xAB, 24) };
    let other = heap.alloc(8);
    unsafe {
        for i in 0..24 {
            assert_eq!(*block.as_ptr().add(i), 0xAB);
        }
    }

    heap.free(block, 24);
    heap.free(other, 8);
    heap.finalize();
}

#[test]
fn test_exhaustion_and_recovery() {
    let mut heap = small_heap();
    let unit_count = heap.area_size() / 8;
    assert_eq!(unit_count, 63);

    let mut live = Vec::new();
    for _ in 0..unit_count {
        live.push(heap.try_alloc(8).expect("area not yet exhausted"));
    }
    assert_eq!(heap.allocated_bytes(), heap.area_size());
    assert_eq!(heap.free_regions(), vec![]);
    assert_eq!(heap.try_alloc(8), None);

    for block in live {
        heap.free(block, 8);
    }
    assert_eq!(heap.allocated_bytes(), 0);
    assert_eq!(
        heap.free_regions(),
        vec![FreeRegion {
            offset: 0,
            size: 504
        }]
    );
    heap.finalize();
}

#[test]
fn test_first_fit_prefers_the_lower_hole() {
    let mut heap = small_heap();
    let a = heap.alloc(16);
    let b = heap.alloc(16);
    let c = heap.alloc(16);
    let d = heap.alloc(32);
    let e = heap.alloc(16);

    heap.free(b, 16);
    heap.free(d, 32);
    assert_eq!(heap.free_regions().len(), 3);

    // Both holes fit 16 bytes; first fit takes the lower one even though
    // the higher one is a closer match for neither request
    let reused = heap.alloc(16);
    assert_eq!(reused.as_ptr(), b.as_ptr());
    let reused_high = heap.alloc(32);
    assert_eq!(reused_high.as_ptr(), d.as_ptr());

    for (block, size) in [(a, 16), (c, 16), (e, 16), (reused, 16), (reused_high, 32)] {
        heap.free(block, size);
    }
    heap.finalize();
}

#[test]
fn test_stored_size_blocks_round_trip() {
    let mut heap = small_heap();
    let block = heap.alloc_stored(16);

    // One header unit rides in front of the payload
    assert_eq!(heap.allocated_bytes(), 24);
    unsafe { std::ptr::write_bytes(block.as_ptr(), 0xCD, 16) };

    heap.free_stored(block);
    assert_eq!(heap.allocated_bytes(), 0);
    heap.finalize();
}

#[test]
fn test_free_with_equivalent_unaligned_size() {
    let mut heap = small_heap();
    // 20 and 24 round to the same aligned size, so either is a valid
    // size argument for the free
    let block = heap.alloc(20);
    assert_eq!(heap.allocated_bytes(), 24);
    heap.free(block, 24);
    assert_eq!(heap.allocated_bytes(), 0);
    heap.finalize();
}
