/*!
 * Pressure Controller
 * Soft-limit tracking and reclamation hook dispatch
 */

use super::types::{HeapError, PressureLevel, ReclaimHookId};
use super::{Heap, ReclaimHook};
use crate::core::types::Size;
use log::{debug, error, info, warn};
use std::ptr::NonNull;

impl Heap {
    /// Register a reclamation hook. Hooks run in registration order.
    pub fn add_reclaim_hook<H: ReclaimHook + 'static>(&mut self, hook: H) -> ReclaimHookId {
        let id = ReclaimHookId(self.next_hook_id);
        self.next_hook_id += 1;
        self.hooks.push((id, Box::new(hook)));
        info!("registered reclamation hook {:?}", id);
        id
    }

    /// Unregister a hook by the id its registration returned.
    ///
    /// Returns whether a hook was removed. A hook cannot unregister
    /// itself from inside a reclamation pass.
    pub fn remove_reclaim_hook(&mut self, id: ReclaimHookId) -> bool {
        let before = self.hooks.len();
        self.hooks.retain(|(hook_id, _)| *hook_id != id);
        let removed = self.hooks.len() != before;
        if removed {
            info!("unregistered reclamation hook {:?}", id);
        }
        removed
    }

    /// Allocation with the full pressure protocol: reclaim when the soft
    /// limit is crossed, and escalate through every severity before
    /// giving up.
    pub(crate) fn reclaim_and_alloc(&mut self, size: Size) -> Option<NonNull<u8>> {
        if cfg!(feature = "reclaim-before-each-alloc") {
            self.run_reclaim_hooks(PressureLevel::High);
        }

        if self.allocated_bytes.saturating_add(size) >= self.limit {
            debug!(
                "soft limit approached ({} allocated + {} requested >= {} limit)",
                self.allocated_bytes, size, self.limit
            );
            self.run_reclaim_hooks(PressureLevel::Low);
        }

        if let Some(block) = self.alloc_block(size) {
            return Some(block);
        }

        for level in PressureLevel::ESCALATION {
            warn!(
                "allocation of {} bytes failed, retrying after {} severity reclamation",
                size, level
            );
            self.run_reclaim_hooks(level);
            if let Some(block) = self.alloc_block(size) {
                return Some(block);
            }
        }

        None
    }

    /// Dispatch every registered hook at the given severity, FIFO.
    ///
    /// The hook list is detached while hooks run so each hook can free
    /// blocks (or register further hooks) through the heap it receives;
    /// a nested reclamation pass from inside a hook is a no-op.
    fn run_reclaim_hooks(&mut self, level: PressureLevel) {
        if self.hooks.is_empty() {
            return;
        }
        debug!(
            "running {} reclamation hook(s) at {} severity",
            self.hooks.len(),
            level
        );
        let mut hooks = std::mem::take(&mut self.hooks);
        for (_, hook) in hooks.iter_mut() {
            hook.reclaim(self, level);
        }
        // Hooks registered during the pass land behind the existing ones
        hooks.append(&mut self.hooks);
        self.hooks = hooks;
    }

    pub(crate) fn fatal_oom(&mut self, requested: Size) -> ! {
        let err = HeapError::OutOfMemory {
            requested,
            allocated: self.allocated_bytes,
            area_size: self.arena.area_size(),
        };
        error!("{err}");
        (self.fatal)(err)
    }
}
