/*!
 * Heap Traits
 * Reclamation abstractions
 */

use super::types::PressureLevel;
use super::Heap;

/// External reclaimer invoked when allocation pressure rises
///
/// The embedder's garbage collector registers one of these; the heap calls
/// it with escalating severity when the soft limit is crossed or an
/// allocation fails. The hook receives the heap itself so it can free
/// blocks from inside the callback.
pub trait ReclaimHook {
    /// Try to give memory back at the requested severity
    fn reclaim(&mut self, heap: &mut Heap, level: PressureLevel);
}

impl<F> ReclaimHook for F
where
    F: FnMut(&mut Heap, PressureLevel),
{
    fn reclaim(&mut self, heap: &mut Heap, level: PressureLevel) {
        self(heap, level)
    }
}
