// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Fixed-capacity structure-of-arrays storage blocks.

/// Occupancy transition reported to the owning group on slot release.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SlotRelease {
    pub was_full: bool,
    pub now_empty: bool,
}

/// Fixed-capacity, single-archetype storage block.
///
/// Holds a nullable entity slot array and, per chunk-aware component, one
/// packed float column of `capacity * dimensions`. Slots are claimed by a
/// first-free linear scan; capacity is bounded so the scan cost is too.
#[derive(Debug)]
pub struct Chunk {
    capacity: usize,
    len: usize,
    entities: Vec<Option<u32>>,
    columns: Vec<Option<Vec<f32>>>,
}

impl Chunk {
    pub(crate) fn new(capacity: usize, components: usize) -> Self {
        Self {
            capacity,
            len: 0,
            entities: vec![None; capacity],
            columns: vec![None; components],
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of resident entities.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    /// Slot array; `None` marks a free slot.
    pub fn entities(&self) -> &[Option<u32>] {
        &self.entities
    }

    /// Claim the first free slot for `id`. Returns `None` when full.
    pub(crate) fn claim(&mut self, id: u32) -> Option<usize> {
        let offset = self.entities.iter().position(|slot| slot.is_none())?;
        self.entities[offset] = Some(id);
        self.len += 1;
        Some(offset)
    }

    /// Clear a slot and report the occupancy transition.
    pub(crate) fn release(&mut self, offset: usize) -> SlotRelease {
        let was_full = self.is_full();
        debug_assert!(self.entities[offset].is_some());
        self.entities[offset] = None;
        self.len -= 1;
        SlotRelease {
            was_full,
            now_empty: self.len == 0,
        }
    }

    /// Allocate the packed column for a component index.
    pub fn init_column(&mut self, component: usize, len: usize) {
        self.columns[component] = Some(vec![0.0; len]);
    }

    /// Packed column for a component index, if initialized.
    pub fn column(&self, component: usize) -> Option<&[f32]> {
        self.columns.get(component).and_then(|c| c.as_deref())
    }

    pub fn column_mut(&mut self, component: usize) -> Option<&mut [f32]> {
        self.columns
            .get_mut(component)
            .and_then(|c| c.as_deref_mut())
    }
}
