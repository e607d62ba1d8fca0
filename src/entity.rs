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

//! Entity records and chunk residency metadata.

use crate::handle::Handle;
use crate::value::Value;

/// Location of a chunk-resident entity: group, chunk within the group, slot
/// offset within the chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityLocation {
    pub group: usize,
    pub chunk: usize,
    pub offset: usize,
}

/// One live or pooled entity slot.
///
/// The slot array `values` holds the sparse per-component value while the
/// entity is not chunk-resident; chunk-aware components move their value into
/// the chunk's packed column on commit and back out on re-float. `hashes`
/// caches the per-component hash codes (0 = absent) that decide archetype
/// membership.
#[derive(Debug)]
pub struct Entity {
    handle: Handle,
    deleted: bool,
    floating: bool,
    values: Vec<Option<Value>>,
    hashes: Vec<u32>,
    location: Option<EntityLocation>,
}

impl Entity {
    pub(crate) fn new(handle: Handle, components: usize) -> Self {
        Self {
            handle,
            deleted: false,
            floating: true,
            values: vec![None; components],
            hashes: vec![0; components],
            location: None,
        }
    }

    /// Reuse this slot for a fresh entity. Storage left over from the
    /// previous incarnation is cleared here, not at destroy time.
    pub(crate) fn reset(&mut self, handle: Handle, components: usize) {
        self.handle = handle;
        self.deleted = false;
        self.floating = true;
        self.values.clear();
        self.values.resize(components, None);
        self.hashes.clear();
        self.hashes.resize(components, 0);
        self.location = None;
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// True while the entity awaits placement by the next commit.
    pub fn is_floating(&self) -> bool {
        self.floating
    }

    /// Chunk residency. After a re-float this still reports the previous
    /// location until the next commit reassigns it; `is_floating` gates
    /// every read through it.
    pub fn location(&self) -> Option<EntityLocation> {
        self.location
    }

    /// Cached hash code for a component index (0 = absent).
    pub fn hash_code(&self, index: usize) -> u32 {
        self.hashes.get(index).copied().unwrap_or(0)
    }

    pub(crate) fn hashes(&self) -> &[u32] {
        &self.hashes
    }

    /// Read the sparse slot for a component index.
    pub fn raw(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(|v| v.as_ref())
    }

    /// Write the sparse slot for a component index.
    pub fn set_raw(&mut self, index: usize, value: Value) {
        self.values[index] = Some(value);
    }

    /// Clear the sparse slot, returning the previous value.
    pub fn take_raw(&mut self, index: usize) -> Option<Value> {
        self.values.get_mut(index).and_then(|v| v.take())
    }

    pub(crate) fn set_hash(&mut self, index: usize, hash: u32) {
        self.hashes[index] = hash;
    }

    pub(crate) fn set_floating(&mut self, floating: bool) {
        self.floating = floating;
    }

    pub(crate) fn set_location(&mut self, location: Option<EntityLocation>) {
        self.location = location;
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.deleted = true;
        self.floating = false;
        self.location = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_clears_storage() {
        let mut entity = Entity::new(Handle::new(4, 0), 2);
        entity.set_raw(0, Value::Float(1.0));
        entity.set_hash(0, 1);
        entity.mark_deleted();

        entity.reset(Handle::new(4, 1), 2);
        assert_eq!(entity.handle().generation, 1);
        assert!(entity.is_floating());
        assert!(!entity.is_deleted());
        assert!(entity.raw(0).is_none());
        assert_eq!(entity.hash_code(0), 0);
    }
}
