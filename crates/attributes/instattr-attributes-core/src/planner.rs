//! Allocation planning.
//!
//! Buffers only grow: an attribute is reallocated when its capacity in
//! records drops below the requested instance count, and the executor then
//! sizes it to exactly `max(instance_count, 1)` records.

use crate::registry::AttributeRegistry;

impl<R, C> AttributeRegistry<R, C> {
    /// Set `needs_alloc` where capacity is short and report whether any
    /// attribute needs allocation or recomputation this cycle.
    ///
    /// External and `noAlloc` attributes never need work.
    pub(crate) fn plan(&mut self, instance_count: usize) -> bool {
        let mut needs_work = false;
        for entry in self.entries.values_mut() {
            if entry.is_external_buffer() || entry.computation.is_external() {
                continue;
            }
            entry.needs_alloc = entry.buffer().is_none() || entry.capacity_records() < instance_count;
            needs_work |= entry.needs_alloc || entry.needs_update;
        }
        needs_work
    }
}
