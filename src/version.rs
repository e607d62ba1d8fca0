//! Monotonic version counters.
//!
//! One master counter per store plus sparse per-(entity, component)
//! counters, shared into signal accessors. Counters only ever increase;
//! every staleness check is "observed < current", never a value comparison.

use std::cell::{Cell, RefCell};

use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
pub(crate) struct Versions {
    master: Cell<u64>,
    components: RefCell<FxHashMap<(u32, u32), u64>>,
}

impl Versions {
    pub(crate) fn master(&self) -> u64 {
        self.master.get()
    }

    pub(crate) fn bump_master(&self) -> u64 {
        let version = self.master.get() + 1;
        self.master.set(version);
        version
    }

    /// Version of one component on one entity (0 = never written).
    pub(crate) fn component(&self, id: u32, component: u32) -> u64 {
        self.components
            .borrow()
            .get(&(id, component))
            .copied()
            .unwrap_or(0)
    }

    /// Advance the master counter and record the new value for the slot.
    pub(crate) fn bump_component(&self, id: u32, component: u32) -> u64 {
        let version = self.bump_master();
        self.components.borrow_mut().insert((id, component), version);
        version
    }

    pub(crate) fn forget_entity(&self, id: u32) {
        self.components.borrow_mut().retain(|&(e, _), _| e != id);
    }
}
